//! Mixed-attribute workload example
//!
//! This example wires a router, a logical unit, and a task factory together
//! and submits a small workload of SIMPLE, ORDERED, and HEAD_OF_QUEUE
//! commands, printing the order in which they start and finish.

use scsi_task_queue::{
    Command, LogicalUnit, Nexus, QueuedLogicalUnit, Status, Task, TaskAttribute, TaskFactory,
    TaskResult, TaskRouter, TargetTransportPort,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Transport port that prints responses instead of sending PDUs
struct ConsolePort;

impl TargetTransportPort for ConsolePort {
    fn write_response(
        &self,
        nexus: &Nexus,
        command_reference_number: u32,
        status: Status,
        _sense_data: Option<&[u8]>,
    ) {
        println!("response for {nexus} (crn {command_reference_number}): {status:?}");
    }

    fn read_data(&self, _nexus: &Nexus, _buf: &mut [u8]) -> TaskResult<usize> {
        Ok(0)
    }

    fn write_data(&self, _nexus: &Nexus, data: &[u8]) -> TaskResult<usize> {
        Ok(data.len())
    }

    fn terminate_data_transfer(&self, _nexus: &Nexus) {}
}

/// Task that simulates a storage operation with a short sleep
struct SleepTask {
    command: Command,
    port: Arc<dyn TargetTransportPort>,
    done: AtomicBool,
}

impl Task for SleepTask {
    fn command(&self) -> &Command {
        &self.command
    }

    fn transport_port(&self) -> Option<Arc<dyn TargetTransportPort>> {
        Some(Arc::clone(&self.port))
    }

    fn run(&self) -> TaskResult<()> {
        println!(
            "starting {:?} command, crn {}",
            self.command.attribute(),
            self.command.command_reference_number()
        );
        thread::sleep(Duration::from_millis(200));
        self.done.store(true, Ordering::SeqCst);
        self.port.write_response(
            self.command.nexus(),
            self.command.command_reference_number(),
            Status::Good,
            None,
        );
        Ok(())
    }

    fn abort(&self) -> bool {
        false
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

struct SleepTaskFactory;

impl TaskFactory for SleepTaskFactory {
    fn create_task(
        &self,
        port: Arc<dyn TargetTransportPort>,
        command: Command,
    ) -> TaskResult<Arc<dyn Task>> {
        Ok(Arc::new(SleepTask {
            command,
            port,
            done: AtomicBool::new(false),
        }))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let router = TaskRouter::new();
    let lu = QueuedLogicalUnit::new(32, 4, Box::new(SleepTaskFactory))?;
    let lu = Arc::new(lu);
    router.register_logical_unit(0, Arc::clone(&lu) as Arc<dyn LogicalUnit>)?;

    let port: Arc<dyn TargetTransportPort> = Arc::new(ConsolePort);
    let nexus = Nexus::new("iqn.2025-12.local:initiator", "iqn.2025-12.local:target", 0);

    let workload = [
        TaskAttribute::Simple,
        TaskAttribute::Simple,
        TaskAttribute::Ordered,
        TaskAttribute::Simple,
        TaskAttribute::HeadOfQueue,
        TaskAttribute::Simple,
    ];

    for (i, attribute) in workload.into_iter().enumerate() {
        let tagged = nexus.with_task_tag(i as u64);
        let command = Command::new(tagged, vec![0x00], attribute, i as u32, 0);
        router.enqueue(Arc::clone(&port), command);
    }

    // Let the workload drain, then stop the workers
    thread::sleep(Duration::from_secs(2));
    lu.shutdown();

    Ok(())
}
