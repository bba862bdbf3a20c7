//! Task abstraction
//!
//! A task is the runnable unit wrapping one command. Concrete tasks are
//! produced by a [`TaskFactory`](crate::lu::TaskFactory) and executed by
//! [`TaskManager`](crate::task_manager::TaskManager) workers; the task set
//! only cares about the command's nexus and attribute.

use crate::command::Command;
use crate::error::TaskResult;
use crate::transport::TargetTransportPort;
use std::sync::Arc;

/// Lifecycle state of a task within a task set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Admitted, waiting for its attribute's start condition
    Pending,
    /// Selected by a worker and executing
    Running,
    /// Execution finished (successfully or with a reported fault)
    Done,
    /// Cancelled before or during execution
    Aborted,
}

/// A runnable unit wrapping one command
pub trait Task: Send + Sync {
    /// The command this task executes
    fn command(&self) -> &Command;

    /// The transport port used to report a fault the task body could not
    /// report itself. Tasks without one (e.g. test fixtures) return `None`.
    fn transport_port(&self) -> Option<Arc<dyn TargetTransportPort>> {
        None
    }

    /// Execute the command to completion
    ///
    /// May block on data transfer through the transport port. An `Err`
    /// return is caught by the worker loop, reported as CHECK CONDITION,
    /// and never terminates the worker.
    fn run(&self) -> TaskResult<()>;

    /// Request cancellation of a running task
    ///
    /// Returns `true` if the task accepted the abort. The task body is
    /// expected to notice and unwind its data transfers.
    fn abort(&self) -> bool;

    /// Whether execution has finished
    fn is_done(&self) -> bool;
}

/// Outcome of a task management function (SAM-2 Section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskServiceResponse {
    FunctionComplete,
    FunctionRejected,
}
