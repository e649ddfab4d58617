//! `DataAvailable` handling
//!
//! A producer announced a message. The kernel requests it on the spot;
//! a user task gets the announcement parked in its mailbox until it reads.

use noc_hal::HAL;
use tracing::{trace, warn};

use super::{schedule_hint, MessageEngine};
use crate::error::{MsgError, Outcome};
use crate::packet::{HandshakePacket, Service};
use crate::services::KernelServices;

impl<H: HAL> MessageEngine<H> {
    /// Handle a `DataAvailable` handshake.
    ///
    /// # Returns
    /// - `Handled` when the announcement was parked, answered or forwarded
    /// - `RescheduleRequired` when it woke a reader and the PE was idle
    /// - `Error(InvalidTask)` when the receiver is unknown here
    /// - `Error(OutOfMemory)` when it could not be recorded
    pub fn handle_data_available<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        pkt: &HandshakePacket,
    ) -> Outcome {
        self.stats.data_available += 1;
        self.data_available(kernel, pkt).into()
    }

    fn data_available<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        pkt: &HandshakePacket,
    ) -> Result<Outcome, MsgError> {
        if pkt.receiver.is_kernel() {
            self.send_handshake(
                Service::MessageRequest,
                self.local,
                pkt.source,
                pkt.sender,
                pkt.receiver,
            )?;
            return Ok(Outcome::Handled);
        }

        let Some(task) = kernel.resolve(pkt.receiver) else {
            return self.forward_handshake(kernel, pkt, pkt.receiver);
        };

        self.refresh_location(kernel, task, pkt.sender, pkt.source);

        let mailbox = kernel.mailbox_mut(task).ok_or(MsgError::InvalidTask)?;
        if let Err(e) = mailbox.data_available.push_back(pkt.sender, pkt.source) {
            self.stats.dropped_handshakes += 1;
            warn!(sender = ?pkt.sender, receiver = ?pkt.receiver, "data-available notice dropped");
            return Err(e);
        }
        trace!(sender = ?pkt.sender, receiver = ?pkt.receiver, "data-available notice parked");

        if kernel.is_waiting_data_available(task) {
            kernel.release_wait(task);
            return Ok(schedule_hint(kernel));
        }
        Ok(Outcome::Handled)
    }
}
