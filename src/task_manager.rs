//! Task execution
//!
//! A task manager drives one task set with a fixed pool of worker threads.
//! Each worker repeatedly pulls the next eligible task, runs it, and reports
//! completion back to the set so blocked peers re-evaluate eligibility. A
//! task failure is reported through the task's transport port and never
//! takes the worker down with it.

use crate::error::{TaskError, TaskResult};
use crate::sense::{SenseData, Status};
use crate::task_set::{ScheduledTask, TaskSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// A fixed pool of workers executing tasks from one task set
pub struct TaskManager {
    task_set: Arc<TaskSet>,
    worker_count: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskManager {
    /// Create a manager with `worker_count` workers; call
    /// [`start`](Self::start) to spawn them.
    pub fn new(worker_count: usize, task_set: Arc<TaskSet>) -> Self {
        TaskManager {
            task_set,
            worker_count,
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn task_set(&self) -> &Arc<TaskSet> {
        &self.task_set
    }

    /// Spawn the worker threads
    pub fn start(&self) -> TaskResult<()> {
        let mut workers = self.lock_workers();
        if !workers.is_empty() {
            return Err(TaskError::Task("task manager already started".to_string()));
        }

        for i in 0..self.worker_count {
            let task_set = Arc::clone(&self.task_set);
            let handle = thread::Builder::new()
                .name(format!("task-worker-{i}"))
                .spawn(move || Self::worker_loop(task_set))?;
            workers.push(handle);
        }
        log::info!("task manager started with {} workers", self.worker_count);
        Ok(())
    }

    /// A single synchronous pass of the worker loop
    ///
    /// Blocks for the next eligible task, executes it, and reports
    /// completion. Returns `false` once the set is shut down. Lets a test
    /// harness or caller-managed thread drive execution without the pool.
    pub fn run_once(&self) -> bool {
        match self.task_set.next_eligible() {
            Some(scheduled) => {
                Self::execute(&scheduled);
                self.task_set.complete(scheduled);
                true
            }
            None => false,
        }
    }

    /// Stop the workers and wait for them to exit
    ///
    /// Workers finish the task they are running; pending tasks stay
    /// undispatched and new offers are refused.
    pub fn shutdown(&self) {
        self.task_set.shutdown();
        let mut workers = self.lock_workers();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
        log::info!("task manager shut down");
    }

    fn worker_loop(task_set: Arc<TaskSet>) {
        while let Some(scheduled) = task_set.next_eligible() {
            Self::execute(&scheduled);
            task_set.complete(scheduled);
        }
        log::debug!("worker exiting");
    }

    fn execute(scheduled: &ScheduledTask) {
        let task = scheduled.task();
        let result = match catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(result) => result,
            Err(_) => Err(TaskError::Task(format!(
                "task panicked: {}",
                task.command()
            ))),
        };

        if let Err(e) = result {
            log::warn!("task failed: {}: {}", task.command(), e);
            if let Some(port) = task.transport_port() {
                let command = task.command();
                let sense = SenseData::internal_target_failure().to_bytes();
                port.write_response(
                    command.nexus(),
                    command.command_reference_number(),
                    Status::CheckCondition,
                    Some(&sense),
                );
            }
        }
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
