//! SAM-2 task set management for SCSI targets
//!
//! This library provides the command-ordering engine of a SCSI target: task
//! sets that admit commands under capacity and duplicate-tag control, worker
//! pools that execute them under the SCSI Architecture Model (SAM-2)
//! task-attribute rules (SIMPLE, ORDERED, HEAD_OF_QUEUE, ACA), and a router
//! that directs commands to registered logical units. The transport layer
//! that produces commands and the storage backend that executes them sit
//! behind the `TargetTransportPort` and `TaskFactory` traits.
//!
//! # Example
//!
//! ```no_run
//! use scsi_task_queue::{
//!     Command, QueuedLogicalUnit, Task, TaskFactory, TaskResult, TaskRouter,
//!     TargetTransportPort,
//! };
//! use std::sync::Arc;
//!
//! struct MyTask {
//!     command: Command,
//!     port: Arc<dyn TargetTransportPort>,
//! }
//!
//! impl Task for MyTask {
//!     fn command(&self) -> &Command {
//!         &self.command
//!     }
//!
//!     fn run(&self) -> TaskResult<()> {
//!         // execute the CDB against storage, transfer data through the port
//!         Ok(())
//!     }
//!
//!     fn abort(&self) -> bool {
//!         false
//!     }
//!
//!     fn is_done(&self) -> bool {
//!         true
//!     }
//! }
//!
//! struct MyFactory;
//!
//! impl TaskFactory for MyFactory {
//!     fn create_task(
//!         &self,
//!         port: Arc<dyn TargetTransportPort>,
//!         command: Command,
//!     ) -> TaskResult<Arc<dyn Task>> {
//!         Ok(Arc::new(MyTask { command, port }))
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let router = TaskRouter::new();
//! let lu = QueuedLogicalUnit::new(32, 4, Box::new(MyFactory))?;
//! router.register_logical_unit(0, Arc::new(lu))?;
//! // the transport layer now calls router.enqueue(port, command)
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod lu;
pub mod nexus;
pub mod router;
pub mod sense;
mod sync;
pub mod task;
pub mod task_manager;
pub mod task_set;
pub mod transport;

pub use command::{Command, TaskAttribute};
pub use error::{TaskError, TaskResult};
pub use lu::{LogicalUnit, QueuedLogicalUnit, TaskFactory};
pub use nexus::Nexus;
pub use router::TaskRouter;
pub use sense::{Kcq, SenseData, Status};
pub use task::{Task, TaskServiceResponse, TaskState};
pub use task_manager::TaskManager;
pub use task_set::{OfferOutcome, RejectReason, ScheduledTask, TaskSet};
pub use transport::TargetTransportPort;

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
