//! The bounded worker pool and the managed-worker predicate

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

tokio::task_local! {
    /// Marker present on workers managed by this executor: pool jobs, and
    /// callers that entered through [`as_managed`].
    static MANAGED_WORKER: ();
}

/// Run a future as a managed worker.
///
/// The build's own entry points wrap their work in this so that operations
/// they start are never given a synthetic unmanaged-thread parent. Pool
/// workers are marked automatically.
pub async fn as_managed<F: Future>(future: F) -> F::Output {
    MANAGED_WORKER.scope((), future).await
}

/// Whether the calling worker was created (or adopted) by this executor.
pub(crate) fn is_managed_worker() -> bool {
    MANAGED_WORKER.try_with(|_| ()).is_ok()
}

/// Mark a pool job's future as running on a managed worker.
pub(crate) fn scope_managed<F: Future>(future: F) -> impl Future<Output = F::Output> {
    MANAGED_WORKER.scope((), future)
}

/// Fixed-size pool bounding the parallelism of `run_all` batches.
///
/// Stopping the pool rejects new batches; jobs of in-flight batches keep
/// their permits and run to completion.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    stopped: AtomicBool,
}

impl WorkerPool {
    #[must_use]
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(max_workers)),
                max_workers,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.inner.max_workers
    }

    pub(crate) fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.inner.semaphore)
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}
