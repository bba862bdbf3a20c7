//! Command routing
//!
//! The task router maps a command's logical unit number to a registered
//! logical unit, or reports the addressing error itself. It holds no
//! ordering state; construct one at startup and hand it to the transport
//! layer by reference.

use crate::command::Command;
use crate::error::{TaskError, TaskResult};
use crate::lu::LogicalUnit;
use crate::sense::{SenseData, Status};
use crate::transport::TargetTransportPort;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Routes incoming commands to registered logical units
pub struct TaskRouter {
    logical_units: RwLock<HashMap<u64, Arc<dyn LogicalUnit>>>,
}

impl Default for TaskRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRouter {
    pub fn new() -> Self {
        TaskRouter {
            logical_units: RwLock::new(HashMap::new()),
        }
    }

    /// Bind a logical unit number; fails if the number is already bound
    pub fn register_logical_unit(
        &self,
        lun: u64,
        logical_unit: Arc<dyn LogicalUnit>,
    ) -> TaskResult<()> {
        let mut map = self
            .logical_units
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&lun) {
            return Err(TaskError::Routing(format!(
                "logical unit number {lun} already registered"
            )));
        }
        map.insert(lun, logical_unit);
        log::info!("registered logical unit {lun}");
        Ok(())
    }

    /// Unbind a logical unit number, returning the unit if one was bound
    pub fn remove_logical_unit(&self, lun: u64) -> Option<Arc<dyn LogicalUnit>> {
        let removed = self
            .logical_units
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&lun);
        if removed.is_some() {
            log::info!("removed logical unit {lun}");
        }
        removed
    }

    /// Route a command to its logical unit
    ///
    /// A command addressed to an unbound logical unit number is answered
    /// synchronously with CHECK CONDITION and LOGICAL UNIT NOT SUPPORTED
    /// sense data; no task set is touched.
    pub fn enqueue(&self, port: Arc<dyn TargetTransportPort>, command: Command) {
        let lun = command.nexus().logical_unit_number();
        let logical_unit = {
            let map = self
                .logical_units
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            map.get(&lun).cloned()
        };

        match logical_unit {
            Some(logical_unit) => {
                log::debug!("routing {} to logical unit {}", command, lun);
                logical_unit.enqueue(port, command);
            }
            None => {
                log::warn!("command for unsupported logical unit {}: {}", lun, command);
                let sense = SenseData::logical_unit_not_supported().to_bytes();
                port.write_response(
                    command.nexus(),
                    command.command_reference_number(),
                    Status::CheckCondition,
                    Some(&sense),
                );
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
