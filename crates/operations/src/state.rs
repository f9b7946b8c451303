//! Mutable execution state of a build operation

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use gantry_events::OperationId;

use crate::descriptor::OperationDescriptor;

/// Distinguishes operations started through the public API from the synthetic
/// parents fabricated when an unmanaged worker enters the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Normal,
    UnmanagedThread,
}

/// The executor-owned state of one build operation.
///
/// A state is running from just before its start event is dispatched until
/// just after its finish event; children assert their parent is running at
/// both ends of their own lifecycle.
#[derive(Debug)]
pub struct OperationState {
    descriptor: OperationDescriptor,
    start_time: DateTime<Utc>,
    running: AtomicBool,
    kind: OperationKind,
}

impl OperationState {
    pub(crate) fn new(descriptor: OperationDescriptor, start_time: DateTime<Utc>) -> Self {
        Self {
            descriptor,
            start_time,
            running: AtomicBool::new(false),
            kind: OperationKind::Normal,
        }
    }

    pub(crate) fn unmanaged(descriptor: OperationDescriptor, start_time: DateTime<Utc>) -> Self {
        Self {
            descriptor,
            start_time,
            running: AtomicBool::new(false),
            kind: OperationKind::UnmanagedThread,
        }
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> OperationId {
        self.descriptor.id()
    }

    pub fn parent_id(&self) -> Option<OperationId> {
        self.descriptor.parent_id()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}
