//! Producer and consumer entry points
//!
//! These run on behalf of a local task's write or read system call and
//! start the handshake from the local side.

use alloc::vec::Vec;

use noc_hal::HAL;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::MessageEngine;
use crate::error::{MsgError, Outcome};
use crate::packet::Service;
use crate::pipe::OutputPipe;
use crate::services::KernelServices;
use crate::types::{Consumer, TaskId};

/// What a read did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadStatus {
    /// A request went to the producer; the reader waits for the delivery
    Requested,
    /// The producer has not announced anything; the reader waits for it
    AwaitingDataAvailable,
}

impl<H: HAL> MessageEngine<H> {
    /// Send `payload` from `producer` to `consumer`.
    ///
    /// A request the consumer already parked is answered at once. Otherwise
    /// the message waits in the producer's output pipe and the consumer is
    /// told it is there.
    pub fn write_message<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        producer: TaskId,
        consumer: TaskId,
        payload: Vec<u8>,
    ) -> Result<Outcome, MsgError> {
        let task = kernel.resolve(producer).ok_or(MsgError::InvalidTask)?;

        let request = kernel
            .mailbox_mut(task)
            .ok_or(MsgError::InvalidTask)?
            .message_requests
            .find(consumer)
            .copied();
        if let Some(request) = request {
            let outcome = if request.address == self.local {
                let reader = kernel.resolve(consumer).ok_or(MsgError::InvalidTask)?;
                debug!(?producer, ?consumer, "parked request served by local copy");
                self.deliver_locally(kernel, reader, &payload)?
            } else {
                self.send_delivery(&payload, self.local, request.address, producer, consumer)?;
                Outcome::Handled
            };
            // The request stays parked until it has been served.
            if let Some(mailbox) = kernel.mailbox_mut(task) {
                mailbox.message_requests.take(consumer);
            }
            return Ok(outcome);
        }

        if kernel.output_pipe(task).is_some() {
            return Err(MsgError::PipeBusy);
        }

        let address = kernel
            .location_cache_mut(task)
            .and_then(|cache| cache.lookup(consumer))
            .ok_or(MsgError::InvalidTask)?;
        self.send_handshake(Service::DataAvailable, self.local, address, producer, consumer)?;
        kernel.set_output_pipe(task, OutputPipe::new(Consumer::Task(consumer), payload));
        trace!(?producer, ?consumer, target = address.0, "message announced");
        Ok(Outcome::Handled)
    }

    /// Start a read of the next message from `producer` into `consumer`.
    pub fn read_message<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        consumer: TaskId,
        producer: TaskId,
    ) -> Result<ReadStatus, MsgError> {
        let task = kernel.resolve(consumer).ok_or(MsgError::InvalidTask)?;
        let mailbox = kernel.mailbox_mut(task).ok_or(MsgError::InvalidTask)?;
        let Some(notice) = mailbox.data_available.find(producer).copied() else {
            trace!(?consumer, ?producer, "nothing announced yet");
            return Ok(ReadStatus::AwaitingDataAvailable);
        };

        self.send_handshake(Service::MessageRequest, self.local, notice.address, producer, consumer)?;
        if let Some(mailbox) = kernel.mailbox_mut(task) {
            mailbox.data_available.take(producer);
        }
        Ok(ReadStatus::Requested)
    }
}
