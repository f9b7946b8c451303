//! Bounded parallel dispatch of build operations
//!
//! A queue is created per `run_all` batch, bound to the executor's pool.
//! Enqueued operations become eligible for execution immediately; each job
//! takes a pool permit before it starts, so at most `max_workers` jobs run
//! concurrently. Cancellation is cooperative: jobs that have not yet taken a
//! permit are dropped, in-flight jobs run to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gantry_errors::{Error, OperationError};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::executor::ExecutorInner;
use crate::operation::BuildOperation;
use crate::pool;
use crate::state::OperationState;
use crate::worker::OperationWorker;

/// Queue populated by the `schedule` closure of a `run_all` batch.
pub struct OperationQueue<O: BuildOperation + 'static> {
    executor: Arc<ExecutorInner>,
    worker: Arc<dyn OperationWorker<O>>,
    default_parent: Option<Arc<OperationState>>,
    semaphore: Arc<Semaphore>,
    cancelled: Arc<AtomicBool>,
    failures: Arc<Mutex<Vec<Error>>>,
    jobs: Mutex<Vec<JoinHandle<()>>>,
    completed: AtomicBool,
}

impl<O: BuildOperation + 'static> OperationQueue<O> {
    pub(crate) fn new(
        executor: Arc<ExecutorInner>,
        worker: Arc<dyn OperationWorker<O>>,
        default_parent: Option<Arc<OperationState>>,
        semaphore: Arc<Semaphore>,
    ) -> Self {
        Self {
            executor,
            worker,
            default_parent,
            semaphore,
            cancelled: Arc::new(AtomicBool::new(false)),
            failures: Arc::new(Mutex::new(Vec::new())),
            jobs: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
        }
    }

    /// Make an operation eligible for pool execution. Non-blocking.
    pub fn enqueue(&self, operation: O) {
        if self.completed.load(Ordering::SeqCst) {
            warn!("operation enqueued after queue completion; dropping");
            return;
        }

        let executor = Arc::clone(&self.executor);
        let worker = Arc::clone(&self.worker);
        let default_parent = self.default_parent.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let cancelled = Arc::clone(&self.cancelled);
        let failures = Arc::clone(&self.failures);

        let handle = tokio::spawn(pool::scope_managed(async move {
            // One permit per job bounds the batch to the pool size.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            // Jobs cancelled before a pool worker picked them up are dropped.
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            let builder = operation.description();
            if let Err(error) = executor
                .execute(&operation, builder, worker.as_ref(), default_parent)
                .await
            {
                failures.lock().push(error);
            }
        }));
        self.jobs.lock().push(handle);
    }

    /// Drop all jobs that have not yet started; in-flight jobs continue.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Block until every enqueued job has completed or been dropped.
    ///
    /// # Errors
    ///
    /// Raises a multi-cause failure carrying every job failure collected
    /// while the batch ran.
    pub async fn wait_for_completion(&self) -> Result<(), Error> {
        self.completed.store(true, Ordering::SeqCst);

        loop {
            let handle = self.jobs.lock().pop();
            let Some(handle) = handle else { break };
            if let Err(join_error) = handle.await {
                self.failures.lock().push(
                    OperationError::JobPanicked {
                        message: join_error.to_string(),
                    }
                    .into(),
                );
            }
        }

        let causes = std::mem::take(&mut *self.failures.lock());
        if causes.is_empty() {
            Ok(())
        } else {
            Err(OperationError::MultipleFailures { causes }.into())
        }
    }
}
