//! Worker strategies invoking operation bodies

use async_trait::async_trait;
use gantry_errors::Error;
use parking_lot::Mutex;

use crate::context::OperationContext;
use crate::operation::{BuildOperation, CallableOperation, RunnableOperation};

/// Strategy invoking the body of a build operation.
///
/// The executor supplies workers for runnable and callable operations;
/// user-supplied adapters plug in through [`OperationExecutor::run_all_with_worker`].
///
/// [`OperationExecutor::run_all_with_worker`]: crate::OperationExecutor::run_all_with_worker
#[async_trait]
pub trait OperationWorker<O: BuildOperation>: Send + Sync {
    fn display_name(&self) -> &str;

    async fn execute(&self, operation: &O, context: &mut OperationContext) -> Result<(), Error>;
}

/// Worker for operations run for their side effects.
pub(crate) struct RunnableOperationWorker;

#[async_trait]
impl<O: RunnableOperation> OperationWorker<O> for RunnableOperationWorker {
    fn display_name(&self) -> &str {
        "runnable build operation"
    }

    async fn execute(&self, operation: &O, context: &mut OperationContext) -> Result<(), Error> {
        operation.run(context).await
    }
}

/// Worker for operations run for a value; the value is parked here until the
/// envelope completes and `call` retrieves it.
pub(crate) struct CallableOperationWorker<T> {
    value: Mutex<Option<T>>,
}

impl<T> CallableOperationWorker<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    pub(crate) fn take_value(&self) -> Option<T> {
        self.value.lock().take()
    }
}

#[async_trait]
impl<O: CallableOperation> OperationWorker<O> for CallableOperationWorker<O::Output> {
    fn display_name(&self) -> &str {
        "callable build operation"
    }

    async fn execute(&self, operation: &O, context: &mut OperationContext) -> Result<(), Error> {
        let value = operation.call(context).await?;
        *self.value.lock() = Some(value);
        Ok(())
    }
}
