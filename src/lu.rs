//! Logical unit integration
//!
//! A logical unit owns the task set and worker pool for its queue and turns
//! accepted commands into runnable tasks through a [`TaskFactory`]. What a
//! task actually does to storage is up to the factory's tasks; this module
//! only wires admission control and execution together.

use crate::command::Command;
use crate::error::TaskResult;
use crate::nexus::Nexus;
use crate::sense::{SenseData, Status};
use crate::task::{Task, TaskServiceResponse};
use crate::task_manager::TaskManager;
use crate::task_set::{OfferOutcome, TaskSet};
use crate::transport::TargetTransportPort;
use std::sync::Arc;

/// Builds runnable tasks from accepted commands
pub trait TaskFactory: Send + Sync {
    /// Create the task executing `command`, transferring data through `port`
    ///
    /// Errors when the command cannot be turned into a task (e.g. an
    /// unsupported CDB); the logical unit reports those as CHECK CONDITION.
    fn create_task(
        &self,
        port: Arc<dyn TargetTransportPort>,
        command: Command,
    ) -> TaskResult<Arc<dyn Task>>;
}

/// A logical unit as seen by the task router
pub trait LogicalUnit: Send + Sync {
    /// Accept a command for execution
    ///
    /// Any admission failure is reported synchronously through `port`;
    /// the caller takes no further action either way.
    fn enqueue(&self, port: Arc<dyn TargetTransportPort>, command: Command);

    /// Abort the single task named by an I_T_L_Q nexus
    fn abort_task(&self, nexus: &Nexus) -> TaskServiceResponse;

    /// Abort every task the nexus' initiator has in this unit's task set
    fn abort_task_set(&self, nexus: &Nexus) -> TaskServiceResponse;

    /// Cancel every task in this unit's task set, regardless of initiator
    fn clear_task_set(&self, nexus: &Nexus) -> TaskServiceResponse;

    /// Reset the unit: clear the task set and start over
    fn reset(&self) -> TaskServiceResponse;
}

/// A logical unit backed by one task set and one worker pool
pub struct QueuedLogicalUnit {
    task_set: Arc<TaskSet>,
    manager: TaskManager,
    factory: Box<dyn TaskFactory>,
}

impl QueuedLogicalUnit {
    /// Create the unit and start its workers
    pub fn new(
        queue_depth: usize,
        worker_count: usize,
        factory: Box<dyn TaskFactory>,
    ) -> TaskResult<Self> {
        let task_set = Arc::new(TaskSet::new(queue_depth));
        let manager = TaskManager::new(worker_count, Arc::clone(&task_set));
        manager.start()?;
        Ok(QueuedLogicalUnit {
            task_set,
            manager,
            factory,
        })
    }

    pub fn task_set(&self) -> &Arc<TaskSet> {
        &self.task_set
    }

    /// Stop the workers, draining the task currently running on each
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}

impl LogicalUnit for QueuedLogicalUnit {
    fn enqueue(&self, port: Arc<dyn TargetTransportPort>, command: Command) {
        let nexus = command.nexus().clone();
        let crn = command.command_reference_number();

        let task = match self.factory.create_task(Arc::clone(&port), command) {
            Ok(task) => task,
            Err(e) => {
                log::warn!("cannot build task for {}: {}", nexus, e);
                let sense = SenseData::invalid_command().to_bytes();
                port.write_response(&nexus, crn, Status::CheckCondition, Some(&sense));
                return;
            }
        };

        match self.task_set.offer(task) {
            OfferOutcome::Admitted => {}
            OfferOutcome::Rejected(reason) => {
                let sense = reason.sense_data().map(|s| s.to_bytes());
                port.write_response(&nexus, crn, reason.status(), sense.as_deref());
            }
        }
    }

    fn abort_task(&self, nexus: &Nexus) -> TaskServiceResponse {
        match self.task_set.remove(nexus) {
            Ok(_) => TaskServiceResponse::FunctionComplete,
            Err(e) => {
                log::warn!("abort task failed for {}: {}", nexus, e);
                TaskServiceResponse::FunctionRejected
            }
        }
    }

    fn abort_task_set(&self, nexus: &Nexus) -> TaskServiceResponse {
        let aborted = self.task_set.abort(nexus);
        log::info!("aborted {} tasks for {}", aborted, nexus);
        TaskServiceResponse::FunctionComplete
    }

    fn clear_task_set(&self, _nexus: &Nexus) -> TaskServiceResponse {
        let cleared = self.task_set.clear();
        log::info!("cleared {} tasks", cleared);
        TaskServiceResponse::FunctionComplete
    }

    fn reset(&self) -> TaskServiceResponse {
        self.task_set.clear();
        TaskServiceResponse::FunctionComplete
    }
}
