//! `MessageRequest` handling
//!
//! A consumer asks for a message. Three producers are possible:
//! - the kernel, serving from its kernel buffers
//! - a local task whose output pipe matches the request
//! - a local task with nothing for this consumer yet (request is parked)
//!
//! A request whose source is this PE means the consumer migrated here while
//! the request was in flight; the payload is then copied locally instead of
//! crossing the NoC.

use noc_hal::HAL;
use tracing::{debug, trace, warn};

use super::{schedule_hint, MessageEngine};
use crate::error::{MsgError, Outcome};
use crate::packet::HandshakePacket;
use crate::services::KernelServices;
use crate::types::{Consumer, TaskHandle};

impl<H: HAL> MessageEngine<H> {
    /// Handle a `MessageRequest` handshake.
    ///
    /// # Returns
    /// - `Handled` when the request was parked, served or forwarded
    /// - `RescheduleRequired` when serving it woke a task and the PE was idle
    /// - `MigrationPending` when a locally served consumer must migrate
    /// - `Error(NoData)` when the kernel has nothing for the requester
    /// - `Error(InvalidTask)` when the producer is unknown here
    pub fn handle_message_request<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        pkt: &HandshakePacket,
    ) -> Outcome {
        self.stats.message_requests += 1;
        self.message_request(kernel, pkt).into()
    }

    fn message_request<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        pkt: &HandshakePacket,
    ) -> Result<Outcome, MsgError> {
        if pkt.sender.is_kernel() {
            return self.serve_kernel_request(kernel, pkt);
        }

        let Some(producer) = kernel.resolve(pkt.sender) else {
            return self.forward_handshake(kernel, pkt, pkt.sender);
        };

        self.refresh_location(kernel, producer, pkt.receiver, pkt.source);

        let consumer = Consumer::for_request(pkt.receiver, pkt.source);
        let ready = kernel
            .output_pipe(producer)
            .is_some_and(|pipe| pipe.consumer() == consumer);

        if !ready {
            let mailbox = kernel.mailbox_mut(producer).ok_or(MsgError::InvalidTask)?;
            if let Err(e) = mailbox.message_requests.push_back(pkt.receiver, pkt.source) {
                self.stats.dropped_handshakes += 1;
                warn!(sender = ?pkt.sender, receiver = ?pkt.receiver, "message request dropped");
                return Err(e);
            }
            trace!(sender = ?pkt.sender, receiver = ?pkt.receiver, "message request parked");
            return Ok(Outcome::Handled);
        }

        if pkt.source == self.local {
            self.serve_local_request(kernel, producer, pkt)
        } else {
            self.serve_remote_request(kernel, producer, pkt)
        }
    }

    /// Answer a request for a message the kernel produced.
    fn serve_kernel_request<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        pkt: &HandshakePacket,
    ) -> Result<Outcome, MsgError> {
        let Some(buffer) = kernel.find_kernel_buffer(pkt.receiver) else {
            warn!(receiver = ?pkt.receiver, "no kernel message for requester");
            return Err(MsgError::NoData);
        };

        let sent = self.send_delivery(
            &buffer.payload,
            self.local,
            pkt.source,
            pkt.sender,
            pkt.receiver,
        );
        kernel.remove_kernel_buffer(pkt.receiver);

        if kernel.halt_pending() && kernel.try_halt() {
            debug!("deferred halt completed");
            kernel.clear_halt();
        }

        sent.map(|()| Outcome::Handled)
    }

    /// The consumer sits on this PE: copy the payload across.
    fn serve_local_request<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        producer: TaskHandle,
        pkt: &HandshakePacket,
    ) -> Result<Outcome, MsgError> {
        let consumer = kernel.resolve(pkt.receiver).ok_or(MsgError::InvalidTask)?;
        if kernel.input_pipe_mut(consumer).is_none() {
            warn!(receiver = ?pkt.receiver, "local consumer has no receive window");
            return Err(MsgError::InvalidTask);
        }

        let pipe = kernel.take_output_pipe(producer).ok_or(MsgError::InvalidTask)?;
        debug!(sender = ?pkt.sender, receiver = ?pkt.receiver, "request served by local copy");
        self.deliver_locally(kernel, consumer, pipe.payload())
    }

    /// The consumer sits elsewhere: send the delivery over the NoC.
    fn serve_remote_request<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        producer: TaskHandle,
        pkt: &HandshakePacket,
    ) -> Result<Outcome, MsgError> {
        let pipe = kernel.output_pipe(producer).ok_or(MsgError::InvalidTask)?;
        self.send_delivery(
            pipe.payload(),
            self.local,
            pkt.source,
            pkt.sender,
            pkt.receiver,
        )?;
        kernel.take_output_pipe(producer);

        if !kernel.is_waiting_request(producer) {
            return Ok(Outcome::Handled);
        }

        kernel.release_wait(producer);
        if kernel.has_called_exit(producer) {
            debug!(task = ?pkt.sender, "producer finished its last send");
            kernel.terminate(producer);
        }
        Ok(schedule_hint(kernel))
    }
}
