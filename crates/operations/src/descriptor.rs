//! Immutable metadata describing a build operation

use std::sync::Arc;

use gantry_events::{BuildOperationRef, BuildOperationType, OperationId};

use crate::state::OperationState;

/// Immutable metadata of a build operation, built by the executor when the
/// operation starts.
#[derive(Clone, Debug)]
pub struct OperationDescriptor {
    id: OperationId,
    parent_id: Option<OperationId>,
    display_name: String,
    progress_display_name: Option<String>,
    operation_type: BuildOperationType,
}

impl OperationDescriptor {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn parent_id(&self) -> Option<OperationId> {
        self.parent_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Short name shown by progress renderers; operations without one do not
    /// open a progress scope.
    pub fn progress_display_name(&self) -> Option<&str> {
        self.progress_display_name.as_deref()
    }

    pub fn operation_type(&self) -> BuildOperationType {
        self.operation_type
    }

    /// Identity triple handed to the progress logger factory.
    pub(crate) fn operation_ref(&self) -> BuildOperationRef {
        BuildOperationRef {
            id: self.id,
            parent_id: self.parent_id,
            operation_type: self.operation_type,
        }
    }
}

/// Builder for an [`OperationDescriptor`].
///
/// The parent id is resolved by the executor from the worker's current
/// operation unless [`DescriptorBuilder::parent`] overrides it.
#[derive(Clone)]
pub struct DescriptorBuilder {
    display_name: String,
    progress_display_name: Option<String>,
    operation_type: BuildOperationType,
    parent: Option<Arc<OperationState>>,
}

impl DescriptorBuilder {
    /// Start describing an operation with the given display name.
    #[must_use]
    pub fn display_name(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            progress_display_name: None,
            operation_type: BuildOperationType::default(),
            parent: None,
        }
    }

    #[must_use]
    pub fn progress_display_name(mut self, progress_display_name: impl Into<String>) -> Self {
        self.progress_display_name = Some(progress_display_name.into());
        self
    }

    #[must_use]
    pub fn operation_type(mut self, operation_type: BuildOperationType) -> Self {
        self.operation_type = operation_type;
        self
    }

    /// Override the parent resolved from the worker's current operation.
    #[must_use]
    pub fn parent(mut self, parent: Arc<OperationState>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub(crate) fn parent_state(&self) -> Option<&Arc<OperationState>> {
        self.parent.as_ref()
    }

    pub(crate) fn build(
        self,
        id: OperationId,
        parent_id: Option<OperationId>,
    ) -> OperationDescriptor {
        OperationDescriptor {
            id,
            parent_id,
            display_name: self.display_name,
            progress_display_name: self.progress_display_name,
            operation_type: self.operation_type,
        }
    }
}
