#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

//! Wire-level output events for the gantry build core
//!
//! This crate provides the event types flowing from build operations to the
//! output pipeline, the channel aliases used to move them between tasks, the
//! clock seam, and the progress logger subsystem that ties progress scopes to
//! the build operation that owns them. All build output travels through these
//! events - nothing in the core writes to the console directly.

mod clock;
mod ids;
mod level;
mod output;
pub mod progress;

pub use clock::{Clock, SystemClock};
pub use ids::{BuildOperationRef, BuildOperationType, OperationId, ProgressOperationId};
pub use level::LogLevel;
pub use output::{
    LogEvent, LogLevelChangeEvent, OutputEvent, ProgressCompleteEvent, ProgressEvent,
    ProgressStartEvent, StyledSpan, StyledTextEvent, TextStyle,
};

/// Type alias for output event sender
pub type OutputEventSender = tokio::sync::mpsc::UnboundedSender<OutputEvent>;

/// Type alias for output event receiver
pub type OutputEventReceiver = tokio::sync::mpsc::UnboundedReceiver<OutputEvent>;

/// Create a new output event channel
#[must_use]
pub fn channel() -> (OutputEventSender, OutputEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Helper to send events with error handling
pub trait OutputEventSenderExt {
    /// Send an event, ignoring send errors (receiver dropped)
    fn emit(&self, event: OutputEvent);
}

impl OutputEventSenderExt for OutputEventSender {
    fn emit(&self, event: OutputEvent) {
        // Ignore send errors - if the receiver is dropped, we just continue
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_channel() {
        let (tx, mut rx) = channel();

        tx.emit(OutputEvent::Log(LogEvent::new(
            Utc::now(),
            "test",
            LogLevel::Warn,
            "test warning",
        )));

        let event = rx.recv().await.unwrap();
        match event {
            OutputEvent::Log(log) => assert_eq!(log.message, "test warning"),
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when the receiver is dropped
        tx.emit(OutputEvent::End);
    }
}
