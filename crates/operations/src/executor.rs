//! The build operation executor
//!
//! The executor runs operations on the calling worker or across the bounded
//! pool, maintains the per-worker current-operation slot, fabricates a
//! synthetic parent when an unmanaged worker enters, and notifies the
//! listener of every start and finish.
//!
//! The current-operation slot is a task-local scope: each execution envelope
//! scopes the slot to the new operation for exactly the duration of the body,
//! so the save/restore discipline holds on every exit path by construction.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use gantry_errors::{Error, OperationError};
use gantry_events::progress::{ProgressLogger, ProgressLoggerFactory};
use gantry_events::{Clock, OperationId, SystemClock};
use tracing::{debug, warn};

use crate::context::OperationContext;
use crate::descriptor::{DescriptorBuilder, OperationDescriptor};
use crate::listener::{OperationFinishEvent, OperationListener, OperationStartEvent};
use crate::operation::{BuildOperation, CallableOperation, RunnableOperation};
use crate::pool::{self, WorkerPool};
use crate::queue::OperationQueue;
use crate::state::{OperationKind, OperationState};
use crate::worker::{CallableOperationWorker, OperationWorker, RunnableOperationWorker};

/// Category stamped on the progress events the executor emits.
const PROGRESS_CATEGORY: &str = "gantry.operations.executor";

tokio::task_local! {
    /// The operation lexically wrapping the work executing on this worker.
    static CURRENT_OPERATION: Arc<OperationState>;
}

/// The operation currently wrapping the calling worker, if any.
pub(crate) fn try_current_operation() -> Option<Arc<OperationState>> {
    CURRENT_OPERATION.try_with(Arc::clone).ok()
}

/// Runs build operations and reports their lifecycle to a listener.
///
/// Cheap to clone; all clones share the id counters, the pool, and the
/// listener.
#[derive(Clone)]
pub struct OperationExecutor {
    inner: Arc<ExecutorInner>,
}

impl OperationExecutor {
    #[must_use]
    pub fn new(
        listener: Arc<dyn OperationListener>,
        progress: ProgressLoggerFactory,
        max_workers: usize,
    ) -> Self {
        Self::with_clock(listener, progress, max_workers, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        listener: Arc<dyn OperationListener>,
        progress: ProgressLoggerFactory,
        max_workers: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                listener,
                clock,
                progress,
                pool: WorkerPool::new(max_workers),
                next_id: AtomicI64::new(1),
                next_unmanaged_id: AtomicI64::new(-1),
            }),
        }
    }

    /// The state currently wrapping the calling worker.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error if no operation is currently running.
    pub fn current_operation(&self) -> Result<Arc<OperationState>, Error> {
        try_current_operation().ok_or_else(|| OperationError::NoCurrentOperation.into())
    }

    /// Execute a void operation synchronously on the calling worker.
    ///
    /// # Errors
    ///
    /// Returns the failure raised by the operation body, or an invalid-state
    /// error when the operation hierarchy is violated. Bookkeeping (finish
    /// event, slot restore) always completes before the failure propagates.
    pub async fn run<O: RunnableOperation>(&self, operation: O) -> Result<(), Error> {
        let builder = operation.description();
        self.execute_at_entry(&operation, builder, &RunnableOperationWorker)
            .await
    }

    /// Execute an operation synchronously on the calling worker, returning
    /// the value produced by its body.
    ///
    /// # Errors
    ///
    /// Returns the failure raised by the operation body, or an invalid-state
    /// error when the operation hierarchy is violated.
    pub async fn call<O: CallableOperation>(&self, operation: O) -> Result<O::Output, Error> {
        let builder = operation.description();
        let worker = CallableOperationWorker::<O::Output>::new();
        self.execute_at_entry(&operation, builder, &worker).await?;
        worker
            .take_value()
            .ok_or_else(|| Error::internal("callable operation completed without a value"))
    }

    /// Run a batch of operations across the worker pool.
    ///
    /// The `schedule` closure populates the queue; the call returns once
    /// every enqueued job has completed or been dropped by cancellation.
    /// Each job runs under the caller's current operation, captured once at
    /// call time, as its default parent.
    ///
    /// # Errors
    ///
    /// Returns the single failure if exactly one job failed, or a
    /// multi-cause failure joining all failure messages when several did.
    /// A failure raised by `schedule` itself cancels the queue and is
    /// reported as a queue-population failure. Fails immediately when the
    /// executor has been stopped.
    pub async fn run_all<O, F>(&self, schedule: F) -> Result<(), Error>
    where
        O: RunnableOperation + 'static,
        F: FnOnce(&OperationQueue<O>) -> Result<(), Error>,
    {
        self.run_all_with_worker(RunnableOperationWorker, schedule)
            .await
    }

    /// Like [`run_all`](Self::run_all), with a caller-supplied worker
    /// strategy invoking each operation body.
    ///
    /// # Errors
    ///
    /// See [`run_all`](Self::run_all).
    pub async fn run_all_with_worker<O, W, F>(&self, worker: W, schedule: F) -> Result<(), Error>
    where
        O: BuildOperation + 'static,
        W: OperationWorker<O> + 'static,
        F: FnOnce(&OperationQueue<O>) -> Result<(), Error>,
    {
        if self.inner.pool.is_stopped() {
            return Err(OperationError::ExecutorStopped.into());
        }
        let worker: Arc<dyn OperationWorker<O>> = Arc::new(worker);
        match self.resolve_entry_parent(false) {
            EntryParent::Inherited(parent) => {
                Arc::clone(&self.inner)
                    .execute_in_parallel(worker, parent, schedule)
                    .await
            }
            EntryParent::Unmanaged(state) => {
                let batch = Arc::clone(&self.inner).execute_in_parallel(
                    worker,
                    Some(Arc::clone(&state)),
                    schedule,
                );
                let result = CURRENT_OPERATION.scope(Arc::clone(&state), batch).await;
                self.inner.finish_unmanaged(&state);
                result
            }
        }
    }

    /// Run a future under an artificially created running root operation
    /// with id `0`, for tools that need to pretend a build is ongoing.
    ///
    /// No listener events are emitted for the root.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error when the calling worker already has a
    /// current operation.
    pub async fn run_with_artificial_root<F>(
        &self,
        display_name: impl Into<String>,
        future: F,
    ) -> Result<F::Output, Error>
    where
        F: std::future::Future,
    {
        if let Some(current) = try_current_operation() {
            return Err(OperationError::OperationAlreadyRunning {
                display_name: current.descriptor().display_name().to_string(),
            }
            .into());
        }
        let descriptor =
            DescriptorBuilder::display_name(display_name).build(OperationId::ROOT, None);
        let state = Arc::new(OperationState::new(descriptor, self.inner.clock.now()));
        state.set_running(true);
        let output = CURRENT_OPERATION.scope(Arc::clone(&state), future).await;
        state.set_running(false);
        Ok(output)
    }

    /// The pool bounding this executor's parallel batches.
    pub fn pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Stop the worker pool: no new parallel batches are accepted, while
    /// in-flight work runs to completion.
    pub fn stop(&self) {
        self.inner.pool.stop();
    }

    async fn execute_at_entry<O, W>(
        &self,
        operation: &O,
        builder: DescriptorBuilder,
        worker: &W,
    ) -> Result<(), Error>
    where
        O: BuildOperation,
        W: OperationWorker<O> + ?Sized,
    {
        match self.resolve_entry_parent(builder.parent_state().is_some()) {
            EntryParent::Inherited(parent) => {
                self.inner.execute(operation, builder, worker, parent).await
            }
            EntryParent::Unmanaged(state) => {
                let execute =
                    self.inner
                        .execute(operation, builder, worker, Some(Arc::clone(&state)));
                let result = CURRENT_OPERATION.scope(Arc::clone(&state), execute).await;
                self.inner.finish_unmanaged(&state);
                result
            }
        }
    }

    /// Capture the caller's current operation, fabricating a synthetic
    /// unmanaged-thread parent when an unmanaged worker enters with no
    /// current operation (and nothing else provides a parent).
    fn resolve_entry_parent(&self, has_explicit_parent: bool) -> EntryParent {
        match try_current_operation() {
            Some(current) => EntryParent::Inherited(Some(current)),
            None if !has_explicit_parent && !pool::is_managed_worker() => {
                EntryParent::Unmanaged(self.inner.start_unmanaged_operation())
            }
            None => EntryParent::Inherited(None),
        }
    }
}

enum EntryParent {
    /// The parent (possibly none) the envelope inherits as its default.
    Inherited(Option<Arc<OperationState>>),
    /// A freshly fabricated unmanaged-thread parent whose finish is deferred
    /// until the entry point returns.
    Unmanaged(Arc<OperationState>),
}

pub(crate) struct ExecutorInner {
    listener: Arc<dyn OperationListener>,
    clock: Arc<dyn Clock>,
    progress: ProgressLoggerFactory,
    pool: WorkerPool,
    next_id: AtomicI64,
    next_unmanaged_id: AtomicI64,
}

impl ExecutorInner {
    /// The shared execution envelope: resolve the parent, mint the id, swap
    /// the current-operation slot, notify the listener on both ends, and
    /// propagate the body's failure after bookkeeping.
    pub(crate) async fn execute<O, W>(
        &self,
        operation: &O,
        builder: DescriptorBuilder,
        worker: &W,
        default_parent: Option<Arc<OperationState>>,
    ) -> Result<(), Error>
    where
        O: BuildOperation,
        W: OperationWorker<O> + ?Sized,
    {
        let parent = builder.parent_state().cloned().or(default_parent);
        let id = OperationId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let descriptor = builder.build(id, parent.as_ref().map(|state| state.id()));

        assert_parent_running(&descriptor, parent.as_deref(), ParentCheck::AtStart)?;

        let state = Arc::new(OperationState::new(descriptor, self.clock.now()));
        state.set_running(true);
        let envelope = self.run_envelope(operation, worker, &state, parent.as_deref());
        let result = CURRENT_OPERATION.scope(Arc::clone(&state), envelope).await;
        state.set_running(false);
        result
    }

    async fn run_envelope<O, W>(
        &self,
        operation: &O,
        worker: &W,
        state: &Arc<OperationState>,
        parent: Option<&OperationState>,
    ) -> Result<(), Error>
    where
        O: BuildOperation,
        W: OperationWorker<O> + ?Sized,
    {
        let descriptor = state.descriptor();
        self.listener
            .started(descriptor, &OperationStartEvent::new(state.start_time()));

        let mut context = OperationContext::new();
        let mut progress = self.maybe_start_progress_logging(descriptor);
        debug!(
            operation = %descriptor.display_name(),
            id = %descriptor.id(),
            worker = worker.display_name(),
            "build operation started"
        );

        let body = worker.execute(operation, &mut context).await;
        if let Some(logger) = progress.as_mut() {
            logger.completed();
        }

        let outcome = body
            .and_then(|()| assert_parent_running(descriptor, parent, ParentCheck::AfterBody));
        let failure = match outcome {
            Ok(()) => None,
            Err(error) => {
                context.failed(error.clone());
                Some(error)
            }
        };

        let end_time = self.clock.now();
        self.listener.finished(
            descriptor,
            &OperationFinishEvent::new(
                state.start_time(),
                end_time,
                context.failure().cloned(),
                context.result().cloned(),
            ),
        );

        match failure {
            Some(error) => Err(error),
            None => {
                debug!(
                    operation = %descriptor.display_name(),
                    id = %descriptor.id(),
                    "build operation completed"
                );
                Ok(())
            }
        }
    }

    pub(crate) async fn execute_in_parallel<O, F>(
        self: Arc<Self>,
        worker: Arc<dyn OperationWorker<O>>,
        default_parent: Option<Arc<OperationState>>,
        schedule: F,
    ) -> Result<(), Error>
    where
        O: BuildOperation + 'static,
        F: FnOnce(&OperationQueue<O>) -> Result<(), Error>,
    {
        let semaphore = self.pool.semaphore();
        let queue = OperationQueue::new(Arc::clone(&self), worker, default_parent, semaphore);

        let mut failures: Vec<Error> = Vec::new();
        if let Err(error) = schedule(&queue) {
            failures.push(OperationError::queue_population(&error).into());
            queue.cancel();
        }

        if let Err(error) = queue.wait_for_completion().await {
            match error {
                Error::Operations(OperationError::MultipleFailures { causes }) => {
                    failures.extend(causes);
                }
                other => failures.push(other),
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.swap_remove(0)),
            _ => Err(OperationError::MultipleFailures { causes: failures }.into()),
        }
    }

    fn maybe_start_progress_logging(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Option<ProgressLogger> {
        let short_description = descriptor.progress_display_name()?;
        let mut logger = self
            .progress
            .new_operation(PROGRESS_CATEGORY, Some(descriptor.operation_ref()));
        logger.set_description(descriptor.display_name());
        logger.set_short_description(short_description);
        logger.started();
        Some(logger)
    }

    fn start_unmanaged_operation(&self) -> Arc<OperationState> {
        let id = OperationId::new(self.next_unmanaged_id.fetch_sub(1, Ordering::SeqCst));
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        warn!(
            thread = thread_name,
            "no operation is currently running in unmanaged thread"
        );
        let display_name = format!("Unmanaged thread operation #{id} ({thread_name})");
        let descriptor = DescriptorBuilder::display_name(display_name).build(id, None);
        let state = Arc::new(OperationState::unmanaged(descriptor, self.clock.now()));
        state.set_running(true);
        self.listener.started(
            state.descriptor(),
            &OperationStartEvent::new(state.start_time()),
        );
        state
    }

    /// Close the synthetic parent once the worker returns to the entry point
    /// with no further nested operation.
    fn finish_unmanaged(&self, state: &Arc<OperationState>) {
        debug_assert_eq!(state.kind(), OperationKind::UnmanagedThread);
        self.listener.finished(
            state.descriptor(),
            &OperationFinishEvent::new(state.start_time(), self.clock.now(), None, None),
        );
        state.set_running(false);
    }
}

#[derive(Clone, Copy)]
enum ParentCheck {
    AtStart,
    AfterBody,
}

fn assert_parent_running(
    child: &OperationDescriptor,
    parent: Option<&OperationState>,
    check: ParentCheck,
) -> Result<(), Error> {
    match parent {
        Some(parent) if !parent.is_running() => {
            let child = child.display_name().to_string();
            let parent = parent.descriptor().display_name().to_string();
            Err(match check {
                ParentCheck::AtStart => OperationError::ParentNotRunning { child, parent },
                ParentCheck::AfterBody => OperationError::ParentCompletedEarly { child, parent },
            }
            .into())
        }
        _ => Ok(()),
    }
}
