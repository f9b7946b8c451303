//! Start/finish notification of build operations

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gantry_errors::Error;

use crate::descriptor::OperationDescriptor;

/// Emitted just after an operation's state becomes running.
#[derive(Clone, Debug)]
pub struct OperationStartEvent {
    start_time: DateTime<Utc>,
}

impl OperationStartEvent {
    pub(crate) fn new(start_time: DateTime<Utc>) -> Self {
        Self { start_time }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

/// Emitted exactly once per started operation, on success and on failure.
#[derive(Clone, Debug)]
pub struct OperationFinishEvent {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    failure: Option<Arc<Error>>,
    result: Option<serde_json::Value>,
}

impl OperationFinishEvent {
    pub(crate) fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        failure: Option<Arc<Error>>,
        result: Option<serde_json::Value>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            failure,
            result,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn failure(&self) -> Option<&Arc<Error>> {
        self.failure.as_ref()
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }
}

/// Pure sink receiving the lifecycle events of every build operation.
///
/// Implementations may be invoked from any worker and must be thread-safe.
pub trait OperationListener: Send + Sync {
    fn started(&self, descriptor: &OperationDescriptor, event: &OperationStartEvent);
    fn finished(&self, descriptor: &OperationDescriptor, event: &OperationFinishEvent);
}

/// Listener that ignores all notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopOperationListener;

impl OperationListener for NoopOperationListener {
    fn started(&self, _descriptor: &OperationDescriptor, _event: &OperationStartEvent) {}
    fn finished(&self, _descriptor: &OperationDescriptor, _event: &OperationFinishEvent) {}
}
