//! SCSI status codes and sense data handling
//!
//! This module defines the status and sense vocabulary the scheduler reports
//! through the target transport port, per the SCSI Primary Commands (SPC)
//! fixed-format sense data layout.

use crate::error::{TaskError, TaskResult};
use byteorder::{BigEndian, ByteOrder};

/// SCSI status codes (SAM-2 Section 5.3)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Good = 0x00,
    CheckCondition = 0x02,
    ConditionMet = 0x04,
    Busy = 0x08,
    ReservationConflict = 0x18,
    TaskSetFull = 0x28,
    AcaActive = 0x30,
    TaskAborted = 0x40,
}

impl Status {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x00 => Some(Status::Good),
            0x02 => Some(Status::CheckCondition),
            0x04 => Some(Status::ConditionMet),
            0x08 => Some(Status::Busy),
            0x18 => Some(Status::ReservationConflict),
            0x28 => Some(Status::TaskSetFull),
            0x30 => Some(Status::AcaActive),
            0x40 => Some(Status::TaskAborted),
            _ => None,
        }
    }
}

/// SCSI sense key codes
pub mod sense_key {
    pub const NO_SENSE: u8 = 0x00;
    pub const NOT_READY: u8 = 0x02;
    pub const HARDWARE_ERROR: u8 = 0x04;
    pub const ILLEGAL_REQUEST: u8 = 0x05;
    pub const UNIT_ATTENTION: u8 = 0x06;
    pub const ABORTED_COMMAND: u8 = 0x0B;
}

/// Additional Sense Code (ASC) values
pub mod asc {
    pub const NO_ADDITIONAL_SENSE: u8 = 0x00;
    pub const INVALID_COMMAND_OPERATION_CODE: u8 = 0x20;
    pub const LOGICAL_UNIT_NOT_SUPPORTED: u8 = 0x25;
    pub const INTERNAL_TARGET_FAILURE: u8 = 0x44;
    pub const OVERLAPPED_COMMANDS_ATTEMPTED: u8 = 0x4E;
}

/// Key/Code/Qualifier classification of a sense condition
///
/// Covers the conditions this scheduler can report. The full SPC table is much
/// larger; commands executed by a logical unit carry their own sense data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kcq {
    NoSense,
    InvalidCommandOperationCode,
    LogicalUnitNotSupported,
    InternalTargetFailure,
    OverlappedCommandsAttempted,
}

impl Kcq {
    /// Sense key / ASC / ASCQ triple for this condition
    pub fn fields(&self) -> (u8, u8, u8) {
        match self {
            Kcq::NoSense => (sense_key::NO_SENSE, asc::NO_ADDITIONAL_SENSE, 0x00),
            Kcq::InvalidCommandOperationCode => {
                (sense_key::ILLEGAL_REQUEST, asc::INVALID_COMMAND_OPERATION_CODE, 0x00)
            }
            Kcq::LogicalUnitNotSupported => {
                (sense_key::ILLEGAL_REQUEST, asc::LOGICAL_UNIT_NOT_SUPPORTED, 0x00)
            }
            Kcq::InternalTargetFailure => {
                (sense_key::HARDWARE_ERROR, asc::INTERNAL_TARGET_FAILURE, 0x00)
            }
            Kcq::OverlappedCommandsAttempted => {
                (sense_key::ABORTED_COMMAND, asc::OVERLAPPED_COMMANDS_ATTEMPTED, 0x00)
            }
        }
    }

    pub fn from_fields(key: u8, asc_code: u8, ascq: u8) -> Option<Self> {
        match (key & 0x0F, asc_code, ascq) {
            (sense_key::NO_SENSE, asc::NO_ADDITIONAL_SENSE, 0x00) => Some(Kcq::NoSense),
            (sense_key::ILLEGAL_REQUEST, asc::INVALID_COMMAND_OPERATION_CODE, 0x00) => {
                Some(Kcq::InvalidCommandOperationCode)
            }
            (sense_key::ILLEGAL_REQUEST, asc::LOGICAL_UNIT_NOT_SUPPORTED, 0x00) => {
                Some(Kcq::LogicalUnitNotSupported)
            }
            (sense_key::HARDWARE_ERROR, asc::INTERNAL_TARGET_FAILURE, 0x00) => {
                Some(Kcq::InternalTargetFailure)
            }
            (sense_key::ABORTED_COMMAND, asc::OVERLAPPED_COMMANDS_ATTEMPTED, 0x00) => {
                Some(Kcq::OverlappedCommandsAttempted)
            }
            _ => None,
        }
    }
}

/// SCSI sense data (fixed format)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenseData {
    pub sense_key: u8,
    pub asc: u8,
    pub ascq: u8,
    pub information: u32,
}

impl SenseData {
    pub fn new(sense_key: u8, asc: u8, ascq: u8) -> Self {
        SenseData {
            sense_key,
            asc,
            ascq,
            information: 0,
        }
    }

    pub fn from_kcq(kcq: Kcq) -> Self {
        let (key, asc, ascq) = kcq.fields();
        SenseData::new(key, asc, ascq)
    }

    pub fn with_info(mut self, info: u32) -> Self {
        self.information = info;
        self
    }

    /// Classify this sense data, if it matches a known KCQ
    pub fn kcq(&self) -> Option<Kcq> {
        Kcq::from_fields(self.sense_key, self.asc, self.ascq)
    }

    /// Serialize to fixed format sense data (18 bytes)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; 18];

        // Response code: 0x70 = current error, fixed format
        data[0] = 0x70;

        // Sense key
        data[2] = self.sense_key & 0x0F;

        // Information (4 bytes, big-endian)
        BigEndian::write_u32(&mut data[3..7], self.information);

        // Additional sense length
        data[7] = 10; // Remaining bytes after this field

        // ASC and ASCQ
        data[12] = self.asc;
        data[13] = self.ascq;

        data
    }

    /// Parse fixed format sense data
    pub fn from_bytes(data: &[u8]) -> TaskResult<Self> {
        if data.len() < 14 {
            return Err(TaskError::InvalidSense(format!(
                "sense data too short: {} bytes",
                data.len()
            )));
        }

        // 0x70 = current error, 0x71 = deferred error
        let response_code = data[0] & 0x7F;
        if response_code != 0x70 && response_code != 0x71 {
            return Err(TaskError::InvalidSense(format!(
                "unsupported response code 0x{:02X}",
                data[0]
            )));
        }

        Ok(SenseData {
            sense_key: data[2] & 0x0F,
            asc: data[12],
            ascq: data[13],
            information: BigEndian::read_u32(&data[3..7]),
        })
    }

    /// Sense data for an overlapped command condition (duplicate task tag)
    pub fn overlapped_commands_attempted() -> Self {
        SenseData::from_kcq(Kcq::OverlappedCommandsAttempted)
    }

    /// Sense data for a command addressed to an unsupported logical unit
    pub fn logical_unit_not_supported() -> Self {
        SenseData::from_kcq(Kcq::LogicalUnitNotSupported)
    }

    /// Sense data for a task that failed inside the target
    pub fn internal_target_failure() -> Self {
        SenseData::from_kcq(Kcq::InternalTargetFailure)
    }

    /// Sense data for an unparseable or unsupported CDB
    pub fn invalid_command() -> Self {
        SenseData::from_kcq(Kcq::InvalidCommandOperationCode)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
