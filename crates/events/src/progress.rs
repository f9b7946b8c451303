//! Progress logger scopes
//!
//! A [`ProgressLogger`] brackets a unit of long-running work with start and
//! complete events. The factory mints progress operation ids (a separate
//! identity space from build operation ids) and every logger carries the
//! identity of the build operation that owns it, which is what the output
//! pipeline later uses to group output beneath tasks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::clock::Clock;
use crate::ids::{BuildOperationRef, ProgressOperationId};
use crate::output::{OutputEvent, ProgressCompleteEvent, ProgressEvent, ProgressStartEvent};
use crate::{OutputEventSender, OutputEventSenderExt};

/// Sink for the events emitted by progress loggers.
///
/// Implementations may be invoked from any worker and must be thread-safe.
pub trait ProgressListener: Send + Sync {
    fn started(&self, event: ProgressStartEvent);
    fn progress(&self, event: ProgressEvent);
    fn completed(&self, event: ProgressCompleteEvent);
}

impl ProgressListener for OutputEventSender {
    fn started(&self, event: ProgressStartEvent) {
        self.emit(OutputEvent::ProgressStart(event));
    }

    fn progress(&self, event: ProgressEvent) {
        self.emit(OutputEvent::Progress(event));
    }

    fn completed(&self, event: ProgressCompleteEvent) {
        self.emit(OutputEvent::ProgressComplete(event));
    }
}

/// Listener that discards all progress events, for executors running without
/// an attached output pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgressListener;

impl ProgressListener for NullProgressListener {
    fn started(&self, _event: ProgressStartEvent) {}
    fn progress(&self, _event: ProgressEvent) {}
    fn completed(&self, _event: ProgressCompleteEvent) {}
}

/// Creates progress loggers backed by a shared listener and clock.
#[derive(Clone)]
pub struct ProgressLoggerFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    listener: Arc<dyn ProgressListener>,
    clock: Arc<dyn Clock>,
    next_id: AtomicI64,
}

impl ProgressLoggerFactory {
    #[must_use]
    pub fn new(listener: Arc<dyn ProgressListener>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                listener,
                clock,
                next_id: AtomicI64::new(1),
            }),
        }
    }

    /// Create a logger for a new progress operation.
    ///
    /// `operation` ties the progress scope to the build operation it reports
    /// for; loggers created for work outside any build operation pass `None`.
    #[must_use]
    pub fn new_operation(
        &self,
        category: impl Into<String>,
        operation: Option<BuildOperationRef>,
    ) -> ProgressLogger {
        let id = ProgressOperationId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        ProgressLogger {
            inner: Arc::clone(&self.inner),
            progress_operation_id: id,
            parent_progress_operation_id: None,
            category: category.into(),
            description: String::new(),
            short_description: None,
            logging_header: None,
            operation,
            state: LoggerState::Idle,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LoggerState {
    Idle,
    Started,
    Completed,
}

/// One progress scope: started at most once, completed at most once.
///
/// Lifecycle misuse is tolerated with a warning rather than an error; a
/// progress logger is a sink and must never fail the operation it reports on.
pub struct ProgressLogger {
    inner: Arc<FactoryInner>,
    progress_operation_id: ProgressOperationId,
    parent_progress_operation_id: Option<ProgressOperationId>,
    category: String,
    description: String,
    short_description: Option<String>,
    logging_header: Option<String>,
    operation: Option<BuildOperationRef>,
    state: LoggerState,
}

impl ProgressLogger {
    #[must_use]
    pub fn progress_operation_id(&self) -> ProgressOperationId {
        self.progress_operation_id
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_short_description(&mut self, short_description: impl Into<String>) {
        self.short_description = Some(short_description.into());
    }

    pub fn set_logging_header(&mut self, logging_header: impl Into<String>) {
        self.logging_header = Some(logging_header.into());
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ProgressOperationId) -> Self {
        self.parent_progress_operation_id = Some(parent);
        self
    }

    /// Emit the start event for this scope.
    pub fn started(&mut self) {
        if self.state != LoggerState::Idle {
            warn!(
                progress_operation_id = %self.progress_operation_id,
                "progress logger started more than once; ignoring"
            );
            return;
        }
        self.state = LoggerState::Started;

        let mut event = ProgressStartEvent::new(
            self.progress_operation_id,
            self.inner.clock.now(),
            self.category.clone(),
            self.description.clone(),
        );
        event.parent_progress_operation_id = self.parent_progress_operation_id;
        event.short_description = self.short_description.clone();
        event.logging_header = self.logging_header.clone();
        if let Some(operation) = self.operation {
            event = event.with_build_operation(operation);
        }
        self.inner.listener.started(event);
    }

    /// Report a status change within a started scope.
    pub fn progress(&self, status: impl Into<String>) {
        if self.state != LoggerState::Started {
            warn!(
                progress_operation_id = %self.progress_operation_id,
                "progress reported outside a started scope; ignoring"
            );
            return;
        }
        self.inner.listener.progress(ProgressEvent::new(
            self.progress_operation_id,
            self.inner.clock.now(),
            self.category.clone(),
            status,
        ));
    }

    /// Emit the complete event for this scope.
    pub fn completed(&mut self) {
        if self.state != LoggerState::Started {
            warn!(
                progress_operation_id = %self.progress_operation_id,
                "progress logger completed without being started; ignoring"
            );
            return;
        }
        self.state = LoggerState::Completed;
        self.inner.listener.completed(ProgressCompleteEvent::new(
            self.progress_operation_id,
            self.inner.clock.now(),
            self.category.clone(),
            self.description.clone(),
            String::new(),
        ));
    }
}
