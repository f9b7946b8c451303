#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

//! Build operation execution for the gantry build core
//!
//! Every unit of build work runs as a *build operation*: it gets a unique id,
//! a parent link resolved from the worker's current operation, a start/finish
//! lifecycle reported to a listener, and a context carrying its result or
//! failure. Operations run on the calling worker (`run`, `call`) or across a
//! bounded pool (`run_all`), with the parent lineage preserved when work
//! migrates onto pool workers.

mod context;
mod descriptor;
mod executor;
mod listener;
mod operation;
mod pool;
mod queue;
pub mod registry;
mod state;
mod worker;

pub use context::OperationContext;
pub use descriptor::{DescriptorBuilder, OperationDescriptor};
pub use executor::OperationExecutor;
pub use listener::{
    NoopOperationListener, OperationFinishEvent, OperationListener, OperationStartEvent,
};
pub use operation::{BuildOperation, CallableOperation, RunnableOperation};
pub use pool::{as_managed, WorkerPool};
pub use queue::OperationQueue;
pub use state::{OperationKind, OperationState};
pub use worker::OperationWorker;
