//! SCSI command representation
//!
//! A command pairs a nexus with a CDB and the SAM-2 task attribute that
//! governs its ordering within a task set. The CDB itself is opaque to the
//! scheduler; only the attribute and the nexus matter here.

use crate::nexus::Nexus;
use std::fmt;

/// SAM-2 task attributes (SAM-2 Section 7.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAttribute {
    /// No ordering constraint against other SIMPLE tasks
    Simple,
    /// Full barrier: waits for all older tasks, blocks all younger ones
    Ordered,
    /// Dispatched immediately, ahead of any waiting SIMPLE or ORDERED task
    HeadOfQueue,
    /// Associated with an auto contingent allegiance condition
    Aca,
}

/// A SCSI command accepted from the transport layer
///
/// Immutable once constructed; owned by exactly one task.
#[derive(Debug, Clone)]
pub struct Command {
    nexus: Nexus,
    cdb: Vec<u8>,
    attribute: TaskAttribute,
    command_reference_number: u32,
    data_length: u32,
}

impl Command {
    pub fn new(
        nexus: Nexus,
        cdb: Vec<u8>,
        attribute: TaskAttribute,
        command_reference_number: u32,
        data_length: u32,
    ) -> Self {
        Command {
            nexus,
            cdb,
            attribute,
            command_reference_number,
            data_length,
        }
    }

    pub fn nexus(&self) -> &Nexus {
        &self.nexus
    }

    pub fn cdb(&self) -> &[u8] {
        &self.cdb
    }

    pub fn attribute(&self) -> TaskAttribute {
        self.attribute
    }

    pub fn command_reference_number(&self) -> u32 {
        self.command_reference_number
    }

    pub fn data_length(&self) -> u32 {
        self.data_length
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command({}, {:?}, crn={})",
            self.nexus, self.attribute, self.command_reference_number
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
