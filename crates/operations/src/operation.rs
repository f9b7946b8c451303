//! The operation traits user code implements

use async_trait::async_trait;
use gantry_errors::Error;

use crate::context::OperationContext;
use crate::descriptor::DescriptorBuilder;

/// A unit of build work with a description.
pub trait BuildOperation: Send + Sync {
    /// Describe this operation. Called once, when the operation starts.
    fn description(&self) -> DescriptorBuilder;
}

/// An operation executed for its side effects.
#[async_trait]
pub trait RunnableOperation: BuildOperation {
    async fn run(&self, context: &mut OperationContext) -> Result<(), Error>;
}

/// An operation executed for a value.
///
/// The value is returned from [`OperationExecutor::call`] in addition to any
/// result payload recorded on the context.
///
/// [`OperationExecutor::call`]: crate::OperationExecutor::call
#[async_trait]
pub trait CallableOperation: BuildOperation {
    type Output: Send;

    async fn call(&self, context: &mut OperationContext) -> Result<Self::Output, Error>;
}
