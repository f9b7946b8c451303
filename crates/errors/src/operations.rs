//! Build operation executor and queue error types

use thiserror::Error;

use crate::{Error as GantryError, LINE_SEPARATOR};

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationError {
    #[error("no operation is currently running")]
    NoCurrentOperation,

    #[error("an operation ({display_name}) is already running on this worker")]
    OperationAlreadyRunning { display_name: String },

    #[error("cannot start operation ({child}) as parent operation ({parent}) has already completed")]
    ParentNotRunning { child: String, parent: String },

    #[error("parent operation ({parent}) completed before this operation ({child})")]
    ParentCompletedEarly { child: String, parent: String },

    #[error("there was a failure while populating the build operation queue: {message}")]
    QueuePopulation { message: String },

    #[error("{}", multi_failure_message(.causes))]
    MultipleFailures { causes: Vec<GantryError> },

    #[error("the build operation executor has been stopped and accepts no further parallel work")]
    ExecutorStopped,

    #[error("a queued operation could not be joined: {message}")]
    JobPanicked { message: String },
}

impl OperationError {
    /// Wrap a failure raised while populating an operation queue
    pub fn queue_population(cause: &GantryError) -> Self {
        Self::QueuePopulation {
            message: cause.to_string(),
        }
    }
}

/// Join individual failure messages with the platform line separator and the
/// `AND` token on its own line.
fn multi_failure_message(causes: &[GantryError]) -> String {
    let messages: Vec<String> = causes.iter().map(ToString::to_string).collect();
    messages.join(&format!("{LINE_SEPARATOR}AND{LINE_SEPARATOR}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_not_running_embeds_both_display_names() {
        let error = OperationError::ParentNotRunning {
            child: "Compile sources".to_string(),
            parent: "Configure project".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "cannot start operation (Compile sources) as parent operation (Configure project) has already completed"
        );
    }

    #[test]
    fn multiple_failures_joins_messages_with_and() {
        let error = OperationError::MultipleFailures {
            causes: vec![
                GantryError::internal("one"),
                GantryError::internal("two"),
            ],
        };
        assert_eq!(
            error.to_string(),
            format!("internal error: one{LINE_SEPARATOR}AND{LINE_SEPARATOR}internal error: two")
        );
    }

    #[test]
    fn single_cause_message_has_no_separator() {
        let error = OperationError::MultipleFailures {
            causes: vec![GantryError::internal("only")],
        };
        assert_eq!(error.to_string(), "internal error: only");
    }
}
