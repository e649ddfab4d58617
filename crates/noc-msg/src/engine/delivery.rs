//! `MessageDelivery` handling
//!
//! The payload that follows a delivery header is still in the DMNI when the
//! handler runs. Every path below consumes exactly the padded frame so the
//! next header starts on a packet boundary.

use alloc::vec::Vec;

use noc_hal::HAL;
use tracing::{trace, warn};

use super::MessageEngine;
use crate::error::{MsgError, Outcome};
use crate::packet::{DeliveryPacket, WORD_SIZE};
use crate::services::{KernelServices, TelemetrySink};
use crate::telemetry::{MonitorKind, SecurityRecord, TelemetryRecord, VolumeRecord};

impl<H: HAL> MessageEngine<H> {
    /// Handle a `MessageDelivery` packet and consume its payload.
    ///
    /// # Returns
    /// - `Handled` or `RescheduleRequired` once the reader is released
    /// - `MigrationPending` when the released reader must migrate
    /// - the RPC dispatcher's status for kernel-addressed deliveries
    /// - `Error(InvalidTask)` when nobody here is waiting for it
    pub fn handle_message_delivery<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        dlv: &DeliveryPacket,
    ) -> Outcome {
        self.stats.deliveries += 1;
        self.message_delivery(kernel, dlv).into()
    }

    fn message_delivery<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        dlv: &DeliveryPacket,
    ) -> Result<Outcome, MsgError> {
        let hdr = &dlv.header;
        if hdr.receiver.is_kernel() {
            return self.deliver_to_kernel(kernel, dlv);
        }

        let frame = self.frame_len(dlv)?;
        let task = match kernel.resolve(hdr.receiver) {
            Some(task) if kernel.input_pipe_mut(task).is_some() => task,
            _ => {
                warn!(receiver = ?hdr.receiver, size = dlv.payload_size, "delivery has no reader, payload dropped");
                self.hal.discard(frame);
                return Err(MsgError::InvalidTask);
            }
        };

        self.refresh_location(kernel, task, hdr.sender, hdr.source);

        let declared = dlv.payload_size as usize;
        let pipe = kernel.input_pipe_mut(task).ok_or(MsgError::InvalidTask)?;
        let received = pipe.receive(&self.hal, declared);
        if received < frame {
            self.hal.discard(frame - received);
        }
        if received < declared {
            self.stats.truncated_deliveries += 1;
            warn!(
                sender = ?hdr.sender,
                receiver = ?hdr.receiver,
                declared,
                received,
                "delivery larger than receive window"
            );
        }
        trace!(sender = ?hdr.sender, receiver = ?hdr.receiver, received, "delivery stored");

        self.report_delivery(kernel, dlv);
        Ok(self.release_receiver(kernel, task))
    }

    /// Read the whole frame into a kernel buffer and run it as an RPC.
    fn deliver_to_kernel<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        dlv: &DeliveryPacket,
    ) -> Result<Outcome, MsgError> {
        let frame = self.frame_len(dlv)?;
        let mut message = Vec::new();
        if message.try_reserve_exact(frame).is_err() {
            warn!(size = dlv.payload_size, "no memory for kernel message, payload dropped");
            self.hal.discard(frame);
            return Err(MsgError::OutOfMemory);
        }
        message.resize(frame, 0);

        let received = self.hal.receive(&mut message);
        let declared = (dlv.payload_size as usize).min(received);
        let status = kernel.dispatch_rpc(&message[..declared]);
        trace!(sender = ?dlv.header.sender, status, "kernel message dispatched");
        Outcome::from_code(status).into_result()
    }

    /// Padded payload length, or drop the declared bytes if it overflows.
    fn frame_len(&self, dlv: &DeliveryPacket) -> Result<usize, MsgError> {
        dlv.frame_len(self.config.payload_align).inspect_err(|_| {
            warn!(size = dlv.payload_size, "delivery frame length overflows, payload dropped");
            self.hal.discard(dlv.payload_size as usize);
        })
    }

    /// Send security and volume samples to the registered observers.
    ///
    /// Traffic of the management application is never reported.
    fn report_delivery<K: TelemetrySink>(&self, kernel: &mut K, dlv: &DeliveryPacket) {
        if !self.config.telemetry {
            return;
        }

        let hdr = &dlv.header;
        let excluded = self.config.kernel_app;
        let sender_app = hdr.sender.app();
        let receiver_app = hdr.receiver.app();
        if receiver_app == excluded {
            return;
        }

        let hops = hdr.source.hops_to(self.local);
        let words = (dlv.payload_size as usize + DeliveryPacket::WIRE_LEN) / WORD_SIZE;
        let size = u16::try_from(words).unwrap_or(u16::MAX);

        if sender_app != excluded {
            if let Some(observer) = self.observers.observer(MonitorKind::Security) {
                let record = TelemetryRecord::Security(SecurityRecord {
                    producer: hdr.sender,
                    consumer: hdr.receiver,
                    app: sender_app,
                    timestamp: dlv.timestamp,
                    latency: self.hal.arrival_timestamp().wrapping_sub(dlv.timestamp),
                    hops,
                    size,
                });
                kernel.emit_record(observer, &record);
            }
        }

        if let Some(observer) = self.observers.observer(MonitorKind::Volume) {
            kernel.emit_record(observer, &TelemetryRecord::Volume(VolumeRecord { hops, size }));
        }
    }
}
