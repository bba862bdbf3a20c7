//! SAM-2 task set
//!
//! A task set is the bounded, order-preserving admission queue for one
//! logical unit. It owns the task-attribute ordering algorithm (SAM-2
//! Section 7.5) plus duplicate-tag and capacity admission control. Every
//! admission, eligibility, and completion decision is made under a single
//! lock, so the ordering rules are atomic with respect to concurrent
//! offers and completions from other workers.
//!
//! Ordering rules:
//! - HEAD_OF_QUEUE tasks are eligible immediately, never block anything,
//!   and are never blocked by anything.
//! - An ORDERED task is eligible once every older task, of any attribute,
//!   has finished; every younger SIMPLE or ORDERED task waits for it.
//! - A SIMPLE task is eligible once every older ORDERED or HEAD_OF_QUEUE
//!   task has finished; concurrent SIMPLE tasks are mutually unordered.
//!
//! Ties go to the lowest sequence number, except that HEAD_OF_QUEUE tasks
//! are dispatched ahead of any eligible SIMPLE or ORDERED task.

use crate::command::TaskAttribute;
use crate::error::{TaskError, TaskResult};
use crate::nexus::Nexus;
use crate::sense::{SenseData, Status};
use crate::sync::Monitor;
use crate::task::{Task, TaskState};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Why an offer was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The set already holds `capacity` outstanding tasks
    TaskSetFull,
    /// A task with the same `(initiator, tag)` pair is still outstanding
    OverlappedCommand,
    /// The set is shutting down and admits no new tasks
    ShuttingDown,
}

impl RejectReason {
    /// The status byte to report for this rejection
    pub fn status(&self) -> Status {
        match self {
            RejectReason::TaskSetFull => Status::TaskSetFull,
            RejectReason::OverlappedCommand => Status::CheckCondition,
            RejectReason::ShuttingDown => Status::Busy,
        }
    }

    /// The sense data accompanying the status, if any
    pub fn sense_data(&self) -> Option<SenseData> {
        match self {
            RejectReason::OverlappedCommand => Some(SenseData::overlapped_commands_attempted()),
            RejectReason::TaskSetFull | RejectReason::ShuttingDown => None,
        }
    }
}

/// Result of [`TaskSet::offer`]
#[must_use = "a rejected command must be reported through the transport port"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Admitted,
    Rejected(RejectReason),
}

/// A task selected for execution
///
/// Returned by [`TaskSet::next_eligible`] and handed back to
/// [`TaskSet::complete`] once execution finished. Consuming the handle on
/// completion makes double-completion unrepresentable.
pub struct ScheduledTask {
    sequence: u64,
    task: Arc<dyn Task>,
}

impl ScheduledTask {
    /// Sequence number assigned at admission
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }
}

/// Duplicate-detection key: one outstanding task per initiator and tag.
/// The untagged case (`None`) is treated as just another tag value.
type TagKey = (String, Option<u64>);

struct Entry {
    task: Arc<dyn Task>,
    attribute: TaskAttribute,
    state: TaskState,
}

struct SetState {
    capacity: usize,
    next_sequence: u64,
    /// Outstanding tasks in admission order. Finished and aborted tasks are
    /// purged eagerly: absence is what successors' eligibility checks
    /// observe, so nothing stale can reorder a later decision.
    entries: BTreeMap<u64, Entry>,
    tags: HashMap<TagKey, u64>,
    shutdown: bool,
}

/// A SAM-2 task set for one logical unit
pub struct TaskSet {
    monitor: Monitor<SetState>,
}

impl TaskSet {
    /// Create a task set admitting at most `capacity` outstanding tasks
    pub fn new(capacity: usize) -> Self {
        TaskSet {
            monitor: Monitor::new(SetState {
                capacity,
                next_sequence: 0,
                entries: BTreeMap::new(),
                tags: HashMap::new(),
                shutdown: false,
            }),
        }
    }

    /// Attempt to admit a task
    ///
    /// Admission is fully serialized. A full set or a duplicate
    /// `(initiator, tag)` pair rejects the task without mutating any state;
    /// rejection never blocks. The caller reports the rejection through the
    /// transport port using [`RejectReason::status`] and
    /// [`RejectReason::sense_data`].
    pub fn offer(&self, task: Arc<dyn Task>) -> OfferOutcome {
        let mut state = self.monitor.lock();

        if state.shutdown {
            log::warn!("task set shutting down, rejecting: {}", task.command());
            return OfferOutcome::Rejected(RejectReason::ShuttingDown);
        }

        if state.entries.len() >= state.capacity {
            log::warn!("task set full, rejecting: {}", task.command());
            return OfferOutcome::Rejected(RejectReason::TaskSetFull);
        }

        let nexus = task.command().nexus();
        let key = (nexus.initiator_name().to_string(), nexus.task_tag());
        if state.tags.contains_key(&key) {
            log::warn!("overlapped command, rejecting: {}", task.command());
            return OfferOutcome::Rejected(RejectReason::OverlappedCommand);
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        log::debug!("admitted {} with sequence {}", task.command(), sequence);

        let attribute = task.command().attribute();
        state.tags.insert(key, sequence);
        state.entries.insert(
            sequence,
            Entry {
                task,
                attribute,
                state: TaskState::Pending,
            },
        );

        drop(state);
        self.monitor.notify_all();
        OfferOutcome::Admitted
    }

    /// Select the next task eligible to start, blocking until one exists
    ///
    /// Marks the selected task RUNNING before returning it. Returns `None`
    /// once the set is shut down; pending tasks are not dispatched after
    /// shutdown.
    pub fn next_eligible(&self) -> Option<ScheduledTask> {
        let mut state = self.monitor.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(scheduled) = Self::select(&mut state) {
                return Some(scheduled);
            }
            log::debug!("no eligible task; worker waiting");
            state = self
                .monitor
                .wait_while(state, |s| !s.shutdown && Self::find_eligible(s).is_none());
        }
    }

    /// Non-blocking variant of [`next_eligible`](Self::next_eligible)
    pub fn try_next_eligible(&self) -> Option<ScheduledTask> {
        let mut state = self.monitor.lock();
        if state.shutdown {
            return None;
        }
        Self::select(&mut state)
    }

    /// Record that a selected task finished executing
    ///
    /// Purges the task and wakes every blocked worker so eligibility is
    /// re-evaluated; completing a barrier task can unblock several
    /// successors at once.
    pub fn complete(&self, scheduled: ScheduledTask) {
        let mut state = self.monitor.lock();
        match state.entries.remove(&scheduled.sequence) {
            Some(entry) => {
                debug_assert_eq!(
                    entry.state,
                    TaskState::Running,
                    "completed a task that was never selected"
                );
                let nexus = entry.task.command().nexus();
                let key = (nexus.initiator_name().to_string(), nexus.task_tag());
                state.tags.remove(&key);
                log::debug!("task finished: {}", entry.task.command());
            }
            // Already removed by abort or clear while it was running
            None => log::debug!(
                "completion for task no longer in set (sequence {})",
                scheduled.sequence
            ),
        }
        drop(state);
        self.monitor.notify_all();
    }

    /// Cancel the single task identified by an I_T_L_Q nexus
    ///
    /// Returns whether the task accepted the abort. Errors if the nexus is
    /// untagged or no matching task is outstanding.
    pub fn remove(&self, nexus: &Nexus) -> TaskResult<bool> {
        if nexus.task_tag().is_none() {
            return Err(TaskError::InvalidNexus(
                "task removal requires an I_T_L_Q nexus".to_string(),
            ));
        }

        let key = (nexus.initiator_name().to_string(), nexus.task_tag());
        let mut state = self.monitor.lock();
        let sequence = match state.tags.remove(&key) {
            Some(sequence) => sequence,
            None => {
                return Err(TaskError::Task(format!("no outstanding task for {nexus}")));
            }
        };
        let entry = state.entries.remove(&sequence);
        drop(state);
        self.monitor.notify_all();

        match entry {
            Some(entry) => {
                log::debug!("removed task: {}", entry.task.command());
                Ok(entry.task.abort())
            }
            None => Ok(false),
        }
    }

    /// Cancel every outstanding task submitted by the nexus' initiator
    ///
    /// Returns the number of tasks cancelled. Running tasks are marked
    /// aborted and purged immediately, which unblocks successors exactly as
    /// completion would.
    pub fn abort(&self, nexus: &Nexus) -> usize {
        let mut state = self.monitor.lock();
        let sequences: Vec<u64> = state
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.task.command().nexus().initiator_name() == nexus.initiator_name()
            })
            .map(|(&sequence, _)| sequence)
            .collect();

        let mut removed = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            if let Some(mut entry) = state.entries.remove(&sequence) {
                let key = {
                    let n = entry.task.command().nexus();
                    (n.initiator_name().to_string(), n.task_tag())
                };
                state.tags.remove(&key);
                entry.state = TaskState::Aborted;
                removed.push(entry);
            }
        }
        drop(state);
        self.monitor.notify_all();

        for entry in &removed {
            entry.task.abort();
            log::debug!("aborted task: {}", entry.task.command());
        }
        removed.len()
    }

    /// Cancel every outstanding task in the set
    pub fn clear(&self) -> usize {
        let mut state = self.monitor.lock();
        let entries = std::mem::take(&mut state.entries);
        state.tags.clear();
        drop(state);
        self.monitor.notify_all();

        let count = entries.len();
        for (_, entry) in entries {
            entry.task.abort();
            log::debug!("cleared task: {}", entry.task.command());
        }
        count
    }

    /// Stop dispatching tasks and refuse further admissions
    ///
    /// Tasks already running are left to finish; blocked workers wake and
    /// observe the shutdown.
    pub fn shutdown(&self) {
        let mut state = self.monitor.lock();
        state.shutdown = true;
        drop(state);
        self.monitor.notify_all();
        log::info!("task set shut down");
    }

    /// Number of outstanding (pending or running) tasks
    pub fn len(&self) -> usize {
        self.monitor.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining_capacity(&self) -> usize {
        let state = self.monitor.lock();
        state.capacity.saturating_sub(state.entries.len())
    }

    fn select(state: &mut SetState) -> Option<ScheduledTask> {
        let sequence = Self::find_eligible(state)?;
        let attribute = state.entries.get(&sequence)?.attribute;
        if attribute == TaskAttribute::Ordered {
            // Barrier invariant: an ORDERED task may only start once nothing
            // older remains outstanding. Misordering here would be silent
            // data corruption downstream, so fail loudly instead.
            assert!(
                state.entries.range(..sequence).next().is_none(),
                "ordered task enabled with outstanding predecessors"
            );
        }
        let entry = state.entries.get_mut(&sequence)?;
        entry.state = TaskState::Running;
        log::debug!("enabling command: {}", entry.task.command());
        Some(ScheduledTask {
            sequence,
            task: Arc::clone(&entry.task),
        })
    }

    /// The lowest-sequence pending task whose start condition holds,
    /// with HEAD_OF_QUEUE (and ACA) tasks taking precedence over any
    /// eligible SIMPLE or ORDERED task.
    fn find_eligible(state: &SetState) -> Option<u64> {
        for (&sequence, entry) in &state.entries {
            if entry.state == TaskState::Pending
                && matches!(
                    entry.attribute,
                    TaskAttribute::HeadOfQueue | TaskAttribute::Aca
                )
            {
                return Some(sequence);
            }
        }

        for (&sequence, entry) in &state.entries {
            if entry.state != TaskState::Pending {
                continue;
            }
            let eligible = match entry.attribute {
                // Handled by the precedence pass above
                TaskAttribute::HeadOfQueue | TaskAttribute::Aca => continue,
                TaskAttribute::Ordered => state.entries.range(..sequence).next().is_none(),
                TaskAttribute::Simple => state.entries.range(..sequence).all(|(_, older)| {
                    matches!(older.attribute, TaskAttribute::Simple)
                }),
            };
            if eligible {
                return Some(sequence);
            }
        }
        None
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
