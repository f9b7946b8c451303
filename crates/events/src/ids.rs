//! Identifier types shared by the executor and the output pipeline
//!
//! Build operations and progress operations live in two parallel identity
//! spaces: log events carry a build operation id, progress events carry a
//! progress operation id, and the output pipeline maintains the mapping
//! between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a build operation, unique within a single process run.
///
/// Positive ids are minted for normal operations, negative ids for synthetic
/// unmanaged-thread parents, and id `0` is reserved for the artificial root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(i64);

impl OperationId {
    /// The artificially created root operation.
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Whether this id names a synthetic unmanaged-thread parent.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a progress operation, minted by the progress logger factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressOperationId(i64);

impl ProgressOperationId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProgressOperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a build operation, used by the output pipeline to decide which
/// operations open an output group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOperationType {
    #[default]
    Uncategorized,
    ConfigureProject,
    Task,
}

impl BuildOperationType {
    /// Whether output produced beneath an operation of this type is buffered
    /// and emitted as one contiguous block when the operation completes.
    #[must_use]
    pub const fn is_grouping(self) -> bool {
        matches!(self, Self::Task | Self::ConfigureProject)
    }
}

/// Identity of the build operation that owns a progress scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOperationRef {
    pub id: OperationId,
    pub parent_id: Option<OperationId>,
    pub operation_type: BuildOperationType,
}
