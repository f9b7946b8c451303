//! The heterogeneous event stream consumed by the output pipeline
//!
//! Progress events are keyed by progress operation id, renderable events by
//! build operation id. Every event kind the pipeline does not understand is
//! forwarded downstream unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BuildOperationRef, BuildOperationType, OperationId, ProgressOperationId};
use crate::level::LogLevel;

/// A single event in the build's output stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputEvent {
    ProgressStart(ProgressStartEvent),
    Progress(ProgressEvent),
    ProgressComplete(ProgressCompleteEvent),
    Log(LogEvent),
    StyledText(StyledTextEvent),
    LogLevelChange(LogLevelChangeEvent),
    Flush,
    End,
}

impl OutputEvent {
    /// The build operation this renderable event belongs to, if any.
    ///
    /// Progress events do not carry one directly; the pipeline resolves them
    /// through its progress-to-operation map instead.
    #[must_use]
    pub fn build_operation_id(&self) -> Option<OperationId> {
        match self {
            Self::ProgressStart(event) => event.build_operation_id,
            Self::Log(event) => event.build_operation_id,
            Self::StyledText(event) => event.build_operation_id,
            _ => None,
        }
    }

    /// Whether this event renders user-visible output (as opposed to
    /// progress bookkeeping).
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        matches!(self, Self::Log(_) | Self::StyledText(_))
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::ProgressStart(event) => Some(event.timestamp),
            Self::Progress(event) => Some(event.timestamp),
            Self::ProgressComplete(event) => Some(event.timestamp),
            Self::Log(event) => Some(event.timestamp),
            Self::StyledText(event) => Some(event.timestamp),
            _ => None,
        }
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::ProgressStart(event) => Some(&event.category),
            Self::Progress(event) => Some(&event.category),
            Self::ProgressComplete(event) => Some(&event.category),
            Self::Log(event) => Some(&event.category),
            Self::StyledText(event) => Some(&event.category),
            _ => None,
        }
    }

    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Self::Log(event) => Some(event.level),
            Self::StyledText(event) => Some(event.level),
            _ => None,
        }
    }
}

/// A progress operation has started.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressStartEvent {
    pub progress_operation_id: ProgressOperationId,
    pub parent_progress_operation_id: Option<ProgressOperationId>,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub description: String,
    pub short_description: Option<String>,
    pub logging_header: Option<String>,
    pub status: String,
    pub build_operation_id: Option<OperationId>,
    pub parent_build_operation_id: Option<OperationId>,
    pub operation_type: BuildOperationType,
}

impl ProgressStartEvent {
    #[must_use]
    pub fn new(
        progress_operation_id: ProgressOperationId,
        timestamp: DateTime<Utc>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            progress_operation_id,
            parent_progress_operation_id: None,
            timestamp,
            category: category.into(),
            description: description.into(),
            short_description: None,
            logging_header: None,
            status: String::new(),
            build_operation_id: None,
            parent_build_operation_id: None,
            operation_type: BuildOperationType::Uncategorized,
        }
    }

    #[must_use]
    pub fn with_parent_progress(mut self, parent: ProgressOperationId) -> Self {
        self.parent_progress_operation_id = Some(parent);
        self
    }

    #[must_use]
    pub fn with_short_description(mut self, short_description: impl Into<String>) -> Self {
        self.short_description = Some(short_description.into());
        self
    }

    #[must_use]
    pub fn with_logging_header(mut self, logging_header: impl Into<String>) -> Self {
        self.logging_header = Some(logging_header.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Attach the identity of the build operation that owns this progress
    /// scope, which is what lets the output pipeline group its output.
    #[must_use]
    pub fn with_build_operation(mut self, operation: BuildOperationRef) -> Self {
        self.build_operation_id = Some(operation.id);
        self.parent_build_operation_id = operation.parent_id;
        self.operation_type = operation.operation_type;
        self
    }
}

/// A progress operation reported a status change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub progress_operation_id: ProgressOperationId,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub status: String,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(
        progress_operation_id: ProgressOperationId,
        timestamp: DateTime<Utc>,
        category: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            progress_operation_id,
            timestamp,
            category: category.into(),
            status: status.into(),
        }
    }
}

/// A progress operation has completed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressCompleteEvent {
    pub progress_operation_id: ProgressOperationId,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub description: String,
    pub status: String,
}

impl ProgressCompleteEvent {
    #[must_use]
    pub fn new(
        progress_operation_id: ProgressOperationId,
        timestamp: DateTime<Utc>,
        category: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            progress_operation_id,
            timestamp,
            category: category.into(),
            description: description.into(),
            status: status.into(),
        }
    }
}

/// A plain log line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub level: LogLevel,
    pub message: String,
    /// Rendered failure the line was logged with, if any.
    pub failure: Option<String>,
    pub build_operation_id: Option<OperationId>,
}

impl LogEvent {
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        category: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            category: category.into(),
            level,
            message: message.into(),
            failure: None,
            build_operation_id: None,
        }
    }

    #[must_use]
    pub fn with_failure(mut self, failure: impl Into<String>) -> Self {
        self.failure = Some(failure.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation_id: OperationId) -> Self {
        self.build_operation_id = Some(operation_id);
        self
    }
}

/// A log line composed of styled spans, rendered by console frontends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StyledTextEvent {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub level: LogLevel,
    pub spans: Vec<StyledSpan>,
    pub build_operation_id: Option<OperationId>,
}

impl StyledTextEvent {
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        category: impl Into<String>,
        level: LogLevel,
        spans: Vec<StyledSpan>,
    ) -> Self {
        Self {
            timestamp,
            category: category.into(),
            level,
            spans,
            build_operation_id: None,
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation_id: OperationId) -> Self {
        self.build_operation_id = Some(operation_id);
        self
    }
}

/// One styled run of text within a [`StyledTextEvent`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StyledSpan {
    pub style: TextStyle,
    pub text: String,
}

impl StyledSpan {
    #[must_use]
    pub fn new(style: TextStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// Styles a console frontend may map to colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Normal,
    Header,
    Description,
    Failure,
    Success,
    Info,
}

/// The maximum log level changed mid-build.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogLevelChangeEvent {
    pub new_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(message: &str) -> LogEvent {
        LogEvent::new(Utc::now(), "test", LogLevel::Warn, message)
    }

    #[test]
    fn renderable_kinds() {
        assert!(OutputEvent::Log(log("a")).is_renderable());
        assert!(OutputEvent::StyledText(StyledTextEvent::new(
            Utc::now(),
            "test",
            LogLevel::Lifecycle,
            vec![StyledSpan::new(TextStyle::Normal, "a")],
        ))
        .is_renderable());
        assert!(!OutputEvent::End.is_renderable());
        assert!(!OutputEvent::Progress(ProgressEvent::new(
            ProgressOperationId::new(1),
            Utc::now(),
            "test",
            "working",
        ))
        .is_renderable());
    }

    #[test]
    fn build_operation_id_accessor() {
        let event = OutputEvent::Log(log("tagged").with_operation(OperationId::new(12)));
        assert_eq!(event.build_operation_id(), Some(OperationId::new(12)));
        assert_eq!(OutputEvent::Flush.build_operation_id(), None);
    }

    #[test]
    fn serde_round_trip() {
        let start = ProgressStartEvent::new(
            ProgressOperationId::new(3),
            Utc::now(),
            "gantry.test",
            "Execute :foo",
        )
        .with_build_operation(BuildOperationRef {
            id: OperationId::new(10),
            parent_id: Some(OperationId::new(2)),
            operation_type: BuildOperationType::Task,
        });

        let json = serde_json::to_string(&OutputEvent::ProgressStart(start)).unwrap();
        let decoded: OutputEvent = serde_json::from_str(&json).unwrap();
        match decoded {
            OutputEvent::ProgressStart(event) => {
                assert_eq!(event.build_operation_id, Some(OperationId::new(10)));
                assert_eq!(event.operation_type, BuildOperationType::Task);
                assert_eq!(event.description, "Execute :foo");
            }
            _ => panic!("wrong event kind"),
        }
    }

    #[test]
    fn end_event_round_trips() {
        let json = serde_json::to_string(&OutputEvent::End).unwrap();
        let decoded: OutputEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(decoded, OutputEvent::End));
    }
}
