#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Hierarchical output grouping for the gantry build core
//!
//! The stream of progress and log events tagged with operation identifiers is
//! reorganized here so that everything produced beneath a grouping operation
//! (a task, or a project being configured) is buffered and emitted as one
//! contiguous block when the group completes, while ungroupable events pass
//! through immediately.

mod grouping;
mod listener;

pub use grouping::GroupingOutputPipeline;
pub use listener::BatchOutputListener;

use gantry_events::{OutputEvent, OutputEventReceiver};

/// Drive a pipeline from an event channel until the channel closes or the
/// end-of-output event has been dispatched.
pub async fn pump(mut receiver: OutputEventReceiver, pipeline: &GroupingOutputPipeline) {
    while let Some(event) = receiver.recv().await {
        let is_end = matches!(event, OutputEvent::End);
        pipeline.on_output(event);
        if is_end {
            break;
        }
    }
}
