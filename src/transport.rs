//! Target transport port interface
//!
//! The transport layer (iSCSI connection handling, PDU (de)serialization)
//! sits behind this trait. The scheduler calls `write_response` directly for
//! admission-time errors; task bodies use the data transfer methods while
//! executing.

use crate::error::TaskResult;
use crate::nexus::Nexus;
use crate::sense::Status;

/// Interface to the transport layer serving one or more initiators
pub trait TargetTransportPort: Send + Sync {
    /// Report command completion or rejection to the initiator
    ///
    /// `sense_data` carries encoded fixed-format sense bytes for
    /// CHECK CONDITION responses and is `None` otherwise.
    fn write_response(
        &self,
        nexus: &Nexus,
        command_reference_number: u32,
        status: Status,
        sense_data: Option<&[u8]>,
    );

    /// Transfer data from the initiator into `buf` (write commands)
    fn read_data(&self, nexus: &Nexus, buf: &mut [u8]) -> TaskResult<usize>;

    /// Transfer data to the initiator (read commands)
    fn write_data(&self, nexus: &Nexus, data: &[u8]) -> TaskResult<usize>;

    /// Cancel any data transfer in progress for the given nexus
    fn terminate_data_transfer(&self, nexus: &Nexus);
}
