//! Execution-ordering tests for the task set and task manager
//!
//! These tests exercise the SAM-2 task-attribute rules under real thread
//! parallelism. The static scenarios admit a whole task set up front and
//! verify every task started under its attribute's start condition; the
//! dynamic scenarios replay the SAM-2 Section 7.7 reference timelines
//! (figures 34-36) with multi-second delays and assert the expected
//! completion order at each step.
//!
//! Each test task records, at the moment its body starts, whether the rest
//! of the set was in a state its attribute permits:
//! - SIMPLE: every older ORDERED/HEAD_OF_QUEUE task finished; no younger
//!   ORDERED task finished.
//! - ORDERED: every older task finished; no younger SIMPLE/ORDERED task
//!   finished.
//! - HEAD_OF_QUEUE: no younger SIMPLE/ORDERED task finished. Relative order
//!   among HEAD_OF_QUEUE tasks is deliberately unconstrained.

use once_cell::sync::Lazy;
use scsi_task_queue::{
    Command, Nexus, Task, TaskAttribute, TaskManager, TaskResult, TaskSet,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

static LOGGER: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

// 10 workers always allows simultaneous execution for these scenarios
const MANAGER_WORKER_COUNT: usize = 10;

// Queue depth large enough that no scenario hits the capacity limit
const SET_QUEUE_DEPTH: usize = 10;

/// Every task of a scenario, in insertion order
#[derive(Default)]
struct Journal {
    tasks: Mutex<Vec<Arc<TestTask>>>,
}

impl Journal {
    fn new() -> Arc<Self> {
        Arc::new(Journal::default())
    }

    fn tasks(&self) -> Vec<Arc<TestTask>> {
        self.tasks.lock().unwrap().clone()
    }
}

struct TestTask {
    attribute: TaskAttribute,
    command: Command,
    delay: Duration,
    index: usize,
    journal: Arc<Journal>,
    done: AtomicBool,
    fault: Mutex<Option<String>>,
}

impl TestTask {
    fn new(
        journal: &Arc<Journal>,
        attribute: TaskAttribute,
        delay_ms: u64,
    ) -> Arc<Self> {
        let mut tasks = journal.tasks.lock().unwrap();
        let index = tasks.len();
        let nexus = Nexus::new("iqn.initiator", "iqn.target", 0).with_task_tag(index as u64);
        let task = Arc::new(TestTask {
            attribute,
            command: Command::new(nexus, vec![0x00], attribute, index as u32, 0),
            delay: Duration::from_millis(delay_ms),
            index,
            journal: Arc::clone(journal),
            done: AtomicBool::new(false),
            fault: Mutex::new(None),
        });
        tasks.push(Arc::clone(&task));
        task
    }

    fn is_proper(&self) -> bool {
        self.fault.lock().unwrap().is_none()
    }

    fn reason(&self) -> String {
        self.fault
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "proper".to_string())
    }

    /// Record any start-condition violation visible at the moment the task
    /// body begins. Only conditions the scheduler deterministically
    /// guarantees are checked; racy observations would make the scenarios
    /// flaky without proving anything.
    fn check_proper_start(&self) {
        let tasks = self.journal.tasks.lock().unwrap();
        let mut fault = None;

        for (i, other) in tasks.iter().enumerate() {
            if i == self.index {
                continue;
            }
            let earlier = i < self.index;
            match self.attribute {
                TaskAttribute::Simple => {
                    if earlier
                        && matches!(
                            other.attribute,
                            TaskAttribute::Ordered | TaskAttribute::HeadOfQueue
                        )
                        && !other.is_done()
                    {
                        fault = Some(format!("older barrier task {i} not finished"));
                    } else if !earlier && other.attribute == TaskAttribute::Ordered && other.is_done()
                    {
                        fault = Some(format!("younger ordered task {i} finished preemptively"));
                    }
                }
                TaskAttribute::Ordered => {
                    if earlier && !other.is_done() {
                        fault = Some(format!("older task {i} not finished"));
                    } else if !earlier
                        && matches!(
                            other.attribute,
                            TaskAttribute::Simple | TaskAttribute::Ordered
                        )
                        && other.is_done()
                    {
                        fault = Some(format!("younger task {i} finished preemptively"));
                    }
                }
                TaskAttribute::HeadOfQueue | TaskAttribute::Aca => {
                    if !earlier
                        && matches!(
                            other.attribute,
                            TaskAttribute::Simple | TaskAttribute::Ordered
                        )
                        && other.is_done()
                    {
                        fault = Some(format!("younger task {i} finished preemptively"));
                    }
                }
            }
        }

        if let Some(reason) = fault {
            log::error!("task {} started improperly: {}", self.index, reason);
            *self.fault.lock().unwrap() = Some(reason);
        }
    }
}

impl Task for TestTask {
    fn command(&self) -> &Command {
        &self.command
    }

    fn run(&self) -> TaskResult<()> {
        assert!(!self.is_done(), "task executed twice");
        self.check_proper_start();
        thread::sleep(self.delay);
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn abort(&self) -> bool {
        false
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

fn wait_until_done(task: &Arc<TestTask>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !task.is_done() {
        assert!(
            Instant::now() < deadline,
            "task {} did not finish within {:?}",
            task.index,
            timeout
        );
        thread::sleep(Duration::from_millis(10));
    }
}

/// Offer the whole journal to a fresh set, run it to completion, and verify
/// every task both finished and started properly.
fn execute_task_set(journal: &Arc<Journal>) {
    Lazy::force(&LOGGER);

    let set = Arc::new(TaskSet::new(SET_QUEUE_DEPTH));
    let manager = TaskManager::new(MANAGER_WORKER_COUNT, Arc::clone(&set));

    for task in journal.tasks() {
        let _ = set.offer(task as Arc<dyn Task>);
    }

    manager.start().unwrap();

    for task in journal.tasks() {
        wait_until_done(&task, Duration::from_secs(30));
    }

    manager.shutdown();

    for task in journal.tasks() {
        assert!(
            task.is_proper(),
            "task {} executed improperly: {}",
            task.index,
            task.reason()
        );
    }
}

// ============================================================================
// Static insertion scenarios
// ============================================================================

#[test]
fn test_static_insertion_hso() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_hsso() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_hoos() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_hhss() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_sossohh() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 100);
    TestTask::new(&journal, TaskAttribute::Simple, 50);
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_osoohh() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 0);
    TestTask::new(&journal, TaskAttribute::HeadOfQueue, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_sosso() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::Simple, 10);
    TestTask::new(&journal, TaskAttribute::Ordered, 50);
    TestTask::new(&journal, TaskAttribute::Simple, 100);
    TestTask::new(&journal, TaskAttribute::Simple, 150);
    TestTask::new(&journal, TaskAttribute::Ordered, 200);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_osso() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::Ordered, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 100);

    execute_task_set(&journal);
}

#[test]
fn test_static_insertion_sso() {
    let journal = Journal::new();
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Simple, 0);
    TestTask::new(&journal, TaskAttribute::Ordered, 100);

    execute_task_set(&journal);
}

// ============================================================================
// Dynamic insertion scenarios (SAM-2 Section 7.7 reference timelines)
// ============================================================================

/// SAM-2 7.7.2 figure 34
///
/// ```text
/// 0     offer(H1) run(H1)      4000ms
///       offer(S2)              4000ms
/// 100   offer(H3) run(H3)      500ms
///       offer(S4)              100ms
/// 600   done(H3)
/// 4000  done(H1), run(S2), run(S4)
/// 4100  done(S4)
/// 8000  done(S2)
/// ```
#[test]
fn test_dynamic_insertion_h1_s2_h3_s4_figure_34() {
    Lazy::force(&LOGGER);

    let journal = Journal::new();
    let h1 = TestTask::new(&journal, TaskAttribute::HeadOfQueue, 4000);
    let s2 = TestTask::new(&journal, TaskAttribute::Simple, 4000);
    let h3 = TestTask::new(&journal, TaskAttribute::HeadOfQueue, 500);
    let s4 = TestTask::new(&journal, TaskAttribute::Simple, 100);

    let set = Arc::new(TaskSet::new(SET_QUEUE_DEPTH));
    let manager = TaskManager::new(MANAGER_WORKER_COUNT, Arc::clone(&set));
    manager.start().unwrap();

    // Time: 0
    let _ = set.offer(Arc::clone(&h1) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&s2) as Arc<dyn Task>);

    thread::sleep(Duration::from_millis(100));

    // Time: 100
    assert!(!h1.is_done(), "H1 finished too quickly");
    assert!(!s2.is_done(), "S2 finished too quickly");

    let _ = set.offer(Arc::clone(&h3) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&s4) as Arc<dyn Task>);

    wait_until_done(&h3, Duration::from_secs(5));

    // Time: 600
    assert!(!h1.is_done(), "H1 finished too quickly");
    assert!(!s2.is_done(), "S2 finished too quickly");
    assert!(h3.is_proper(), "H3 finished improperly: {}", h3.reason());
    assert!(!s4.is_done(), "S4 finished too quickly");

    wait_until_done(&h1, Duration::from_secs(10));

    // Time: 4000
    assert!(h1.is_proper(), "H1 finished improperly: {}", h1.reason());
    assert!(!s2.is_done(), "S2 finished too quickly");

    wait_until_done(&s4, Duration::from_secs(5));

    // Time: 4100
    assert!(!s2.is_done(), "S2 finished too quickly");
    assert!(s4.is_proper(), "S4 finished improperly: {}", s4.reason());

    wait_until_done(&s2, Duration::from_secs(10));

    assert!(s2.is_proper(), "S2 finished improperly: {}", s2.reason());

    manager.shutdown();
}

/// SAM-2 7.7.2 figure 35
///
/// ```text
/// 0     offer(H1) run(H1)      2000ms
///       offer(S2)              1000ms
/// 100   offer(H3) run(H3)      4000ms
///       offer(S4)              100ms
/// 2000  done(H1), run(S2)
/// 3000  done(S2)
/// 4100  done(H3), run(S4)
/// 4200  done(S4)
/// ```
///
/// S2 runs while H3, inserted after it, is still executing: a younger
/// HEAD_OF_QUEUE task never blocks an older SIMPLE task. S4, inserted after
/// H3, must wait for it.
#[test]
fn test_dynamic_insertion_h1_s2_h3_s4_figure_35() {
    Lazy::force(&LOGGER);

    let journal = Journal::new();
    let h1 = TestTask::new(&journal, TaskAttribute::HeadOfQueue, 2000);
    let s2 = TestTask::new(&journal, TaskAttribute::Simple, 1000);
    let h3 = TestTask::new(&journal, TaskAttribute::HeadOfQueue, 4000);
    let s4 = TestTask::new(&journal, TaskAttribute::Simple, 100);

    let set = Arc::new(TaskSet::new(SET_QUEUE_DEPTH));
    let manager = TaskManager::new(MANAGER_WORKER_COUNT, Arc::clone(&set));
    manager.start().unwrap();

    // Time: 0
    let _ = set.offer(Arc::clone(&h1) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&s2) as Arc<dyn Task>);

    thread::sleep(Duration::from_millis(100));

    // Time: 100
    assert!(!h1.is_done(), "H1 finished too quickly");
    assert!(!s2.is_done(), "S2 finished too quickly");

    let _ = set.offer(Arc::clone(&h3) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&s4) as Arc<dyn Task>);

    wait_until_done(&h1, Duration::from_secs(10));

    // Time: 2000
    assert!(h1.is_proper(), "H1 finished improperly: {}", h1.reason());
    assert!(!s2.is_done(), "S2 finished too quickly");
    assert!(!h3.is_done(), "H3 finished too quickly");
    assert!(!s4.is_done(), "S4 finished too quickly");

    wait_until_done(&s2, Duration::from_secs(5));

    // Time: 3000
    assert!(s2.is_proper(), "S2 finished improperly: {}", s2.reason());
    assert!(!h3.is_done(), "H3 finished too quickly");
    assert!(!s4.is_done(), "S4 finished too quickly");

    wait_until_done(&h3, Duration::from_secs(5));

    // Time: 4100
    assert!(h3.is_proper(), "H3 finished improperly: {}", h3.reason());
    assert!(!s4.is_done(), "S4 finished too quickly");

    wait_until_done(&s4, Duration::from_secs(5));

    assert!(s4.is_proper(), "S4 finished improperly: {}", s4.reason());

    manager.shutdown();
}

/// SAM-2 7.7.3 figure 36
///
/// ```text
/// 0     offer(S1) run(S1)      1000ms
///       offer(O2)              1000ms
/// 100   offer(S3)              1000ms
///       offer(S4)              500ms
///       offer(O5)              500ms
/// 1000  done(S1), run(O2)
/// 2000  done(O2), run(S3), run(S4)
/// 2500  done(S4)
/// 3000  done(S3), run(O5)
/// 3500  done(O5)
/// ```
#[test]
fn test_dynamic_insertion_s1_o2_s3_s4_o5_figure_36() {
    Lazy::force(&LOGGER);

    let journal = Journal::new();
    let s1 = TestTask::new(&journal, TaskAttribute::Simple, 1000);
    let o2 = TestTask::new(&journal, TaskAttribute::Ordered, 1000);
    let s3 = TestTask::new(&journal, TaskAttribute::Simple, 1000);
    let s4 = TestTask::new(&journal, TaskAttribute::Simple, 500);
    let o5 = TestTask::new(&journal, TaskAttribute::Ordered, 500);

    let set = Arc::new(TaskSet::new(SET_QUEUE_DEPTH));
    let manager = TaskManager::new(MANAGER_WORKER_COUNT, Arc::clone(&set));
    manager.start().unwrap();

    // Time: 0
    let _ = set.offer(Arc::clone(&s1) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&o2) as Arc<dyn Task>);

    thread::sleep(Duration::from_millis(100));

    // Time: 100
    assert!(!s1.is_done(), "S1 finished too quickly");
    assert!(!o2.is_done(), "O2 finished too quickly");

    let _ = set.offer(Arc::clone(&s3) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&s4) as Arc<dyn Task>);
    let _ = set.offer(Arc::clone(&o5) as Arc<dyn Task>);

    wait_until_done(&s1, Duration::from_secs(5));

    // Time: 1000
    assert!(s1.is_proper(), "S1 finished improperly: {}", s1.reason());
    assert!(!o2.is_done(), "O2 finished too quickly");
    assert!(!s3.is_done(), "S3 finished too quickly");
    assert!(!s4.is_done(), "S4 finished too quickly");
    assert!(!o5.is_done(), "O5 finished too quickly");

    wait_until_done(&o2, Duration::from_secs(5));

    // Time: 2000
    assert!(o2.is_proper(), "O2 finished improperly: {}", o2.reason());
    assert!(!s3.is_done(), "S3 finished too quickly");
    assert!(!s4.is_done(), "S4 finished too quickly");
    assert!(!o5.is_done(), "O5 finished too quickly");

    wait_until_done(&s4, Duration::from_secs(5));

    // Time: 2500
    assert!(!s3.is_done(), "S3 finished too quickly");
    assert!(s4.is_proper(), "S4 finished improperly: {}", s4.reason());
    assert!(!o5.is_done(), "O5 finished too quickly");

    wait_until_done(&s3, Duration::from_secs(5));

    // Time: 3000
    assert!(s3.is_proper(), "S3 finished improperly: {}", s3.reason());
    assert!(!o5.is_done(), "O5 finished too quickly");

    wait_until_done(&o5, Duration::from_secs(5));

    assert!(o5.is_proper(), "O5 finished improperly: {}", o5.reason());

    manager.shutdown();
}
