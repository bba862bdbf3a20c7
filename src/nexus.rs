//! Nexus identification
//!
//! A nexus names the relationship between an initiator port, a target port,
//! and a logical unit, optionally extended with a task tag (SAM-2 Section
//! 4.9). Untagged commands carry no task tag and address the I_T_L nexus
//! directly.

use std::fmt;

/// An I_T_L or I_T_L_Q nexus identification
///
/// Immutable; equality is structural and used for duplicate detection and
/// task cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nexus {
    initiator_name: String,
    target_name: String,
    logical_unit_number: u64,
    task_tag: Option<u64>,
}

impl Nexus {
    /// Construct an I_T_L nexus identification (untagged)
    pub fn new(initiator_name: &str, target_name: &str, logical_unit_number: u64) -> Self {
        Nexus {
            initiator_name: initiator_name.to_string(),
            target_name: target_name.to_string(),
            logical_unit_number,
            task_tag: None,
        }
    }

    /// Derive an I_T_L_Q nexus from this nexus and a task tag
    pub fn with_task_tag(&self, task_tag: u64) -> Self {
        Nexus {
            task_tag: Some(task_tag),
            ..self.clone()
        }
    }

    /// Drop the task tag, leaving the I_T_L nexus
    pub fn untagged(&self) -> Self {
        Nexus {
            task_tag: None,
            ..self.clone()
        }
    }

    pub fn initiator_name(&self) -> &str {
        &self.initiator_name
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn logical_unit_number(&self) -> u64 {
        self.logical_unit_number
    }

    /// The task tag; `None` for untagged (I_T_L) nexus identifications
    pub fn task_tag(&self) -> Option<u64> {
        self.task_tag
    }
}

impl fmt::Display for Nexus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.task_tag {
            Some(tag) => write!(
                f,
                "{}->{}:lun{}:tag{}",
                self.initiator_name, self.target_name, self.logical_unit_number, tag
            ),
            None => write!(
                f,
                "{}->{}:lun{}",
                self.initiator_name, self.target_name, self.logical_unit_number
            ),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
