//! Access to the calling worker's current operation id
//!
//! Log producers use this to tag renderable events with the build operation
//! they were emitted under, which is what lets the output pipeline group them
//! beneath the right task.

use gantry_events::OperationId;

use crate::executor::try_current_operation;

/// The id of the operation currently wrapping the calling worker, if any.
#[must_use]
pub fn current_operation_id() -> Option<OperationId> {
    try_current_operation().map(|state| state.id())
}
