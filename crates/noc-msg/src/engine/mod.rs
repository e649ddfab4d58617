//! The message engine
//!
//! This module contains the engine state and the paths shared by every
//! handler:
//! - Sending handshakes (queued) and deliveries (synchronous)
//! - Draining the outbound queue into the DMNI
//! - Reading and dispatching inbound headers
//! - Location-cache refresh and task release
//!
//! The packet handlers themselves live in `data_av`, `request` and
//! `delivery`; the producer/consumer entry points in `exchange`.

mod data_av;
mod delivery;
mod exchange;
mod forward;
mod request;

pub use exchange::ReadStatus;

use alloc::vec::Vec;

use noc_hal::HAL;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::error::{MsgError, Outcome};
use crate::outbound::OutboundQueue;
use crate::packet::{align_up, DeliveryPacket, HandshakePacket, Packet, Service};
use crate::services::{KernelServices, Migration, Scheduler, TaskTable};
use crate::telemetry::{MonitorKind, ObserverTable};
use crate::types::{PeAddress, TaskHandle, TaskId};

/// Counters kept by the engine
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// `DataAvailable` packets handled
    pub data_available: u64,
    /// `MessageRequest` packets handled
    pub message_requests: u64,
    /// `MessageDelivery` packets handled
    pub deliveries: u64,
    /// Handshakes re-emitted towards a migrated task
    pub forwarded: u64,
    /// Location-cache entries that changed
    pub location_refreshes: u64,
    /// Deliveries whose payload did not fit the receive window
    pub truncated_deliveries: u64,
    /// Handshakes dropped for lack of memory
    pub dropped_handshakes: u64,
}

/// Per-PE message engine.
///
/// Owns the outbound queue and the observer table; everything else is
/// reached through the [`KernelServices`] passed into each call.
pub struct MessageEngine<H: HAL> {
    /// Hardware of this PE
    hal: H,
    /// Boot-time settings
    config: EngineConfig,
    /// Router address of this PE
    local: PeAddress,
    /// Handshakes waiting for the DMNI
    outbound: OutboundQueue,
    /// Nearest observer per monitor kind
    observers: ObserverTable,
    /// Counters
    stats: EngineStats,
}

impl<H: HAL> MessageEngine<H> {
    /// Create the engine for the PE behind `hal`.
    pub fn new(hal: H, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let local = PeAddress(hal.local_address());
        Ok(Self {
            hal,
            config,
            local,
            outbound: OutboundQueue::new(),
            observers: ObserverTable::new(local),
            stats: EngineStats::default(),
        })
    }

    /// Get reference to the HAL
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Boot-time settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Router address of this PE
    pub fn local_address(&self) -> PeAddress {
        self.local
    }

    /// Engine counters
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Handshakes waiting for the DMNI
    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    /// Selected observers
    pub fn observers(&self) -> &ObserverTable {
        &self.observers
    }

    /// Register an announced observer (nearest wins, ties keep the first).
    pub fn set_observer(&mut self, kind: MonitorKind, task: TaskId, address: PeAddress) -> bool {
        let selected = self.observers.set_observer(kind, task, address);
        if selected {
            debug!(?kind, ?task, address = address.0, "observer selected");
        }
        selected
    }

    // ========================================================================
    // Send path
    // ========================================================================

    /// Queue a handshake for the DMNI.
    pub fn send_handshake(
        &mut self,
        service: Service,
        source: PeAddress,
        target: PeAddress,
        sender: TaskId,
        receiver: TaskId,
    ) -> Result<(), MsgError> {
        let packet = HandshakePacket::new(service, source, target, sender, receiver);
        trace!(?service, ?sender, ?receiver, target = target.0, "handshake queued");
        self.outbound.push(&self.hal, packet)
    }

    /// Transmit a delivery and its payload.
    ///
    /// The send timestamp is taken only after the DMNI send channel is free
    /// so that it reflects departure rather than enqueue time.
    pub fn send_delivery(
        &mut self,
        payload: &[u8],
        source: PeAddress,
        target: PeAddress,
        sender: TaskId,
        receiver: TaskId,
    ) -> Result<(), MsgError> {
        let size = u32::try_from(payload.len()).map_err(|_| MsgError::InvalidPacket)?;
        let frame =
            align_up(payload.len(), self.config.payload_align).ok_or(MsgError::InvalidPacket)?;
        let mut padded = Vec::new();
        if frame != payload.len() {
            padded
                .try_reserve_exact(frame)
                .map_err(|_| MsgError::OutOfMemory)?;
            padded.extend_from_slice(payload);
            padded.resize(frame, 0);
        }
        let body = if padded.is_empty() { payload } else { &padded };

        self.hal.wait_transmit_idle();
        let packet = DeliveryPacket::new(
            source,
            target,
            sender,
            receiver,
            size,
            self.hal.now_ticks(),
        );
        trace!(?sender, ?receiver, size = payload.len(), target = target.0, "delivery sent");
        self.hal.transmit(&packet.encode(), body)?;
        Ok(())
    }

    /// Hand the oldest queued handshake to the caller (the DMNI driver).
    pub fn pop_outbound(&mut self) -> Option<HandshakePacket> {
        self.outbound.pop(&self.hal)
    }

    /// Transmit every queued handshake.
    ///
    /// Returns how many were sent. A packet the DMNI refuses goes back to
    /// the head of the queue.
    pub fn pump_outbound(&mut self) -> Result<usize, MsgError> {
        let mut sent = 0;
        while let Some(packet) = self.outbound.pop(&self.hal) {
            if let Err(e) = self.hal.transmit(&packet.encode(), &[]) {
                self.outbound.requeue(&self.hal, packet)?;
                return Err(e.into());
            }
            sent += 1;
        }
        Ok(sent)
    }

    // ========================================================================
    // Inbound path
    // ========================================================================

    /// Read one header from the DMNI and handle the packet.
    ///
    /// Returns `None` when no complete header is waiting.
    pub fn service_inbound<K: KernelServices>(&mut self, kernel: &mut K) -> Option<Outcome> {
        if self.hal.inbound_len() < HandshakePacket::WIRE_LEN {
            return None;
        }
        let mut head = [0u8; HandshakePacket::WIRE_LEN];
        self.hal.receive(&mut head);

        let packet = HandshakePacket::decode(&head).and_then(|header| {
            if header.service != Service::MessageDelivery {
                return Ok(Packet::Handshake(header));
            }
            let mut ext = [0u8; DeliveryPacket::EXT_LEN];
            if self.hal.receive(&mut ext) < DeliveryPacket::EXT_LEN {
                return Err(MsgError::InvalidPacket);
            }
            DeliveryPacket::from_parts(header, &ext).map(Packet::Delivery)
        });

        Some(match packet {
            Ok(packet) => self.handle_packet(kernel, packet),
            Err(e) => {
                warn!(service = head[5], "undecodable header dropped");
                Outcome::Error(e)
            }
        })
    }

    /// Route a decoded packet to its handler.
    pub fn handle_packet<K: KernelServices>(&mut self, kernel: &mut K, packet: Packet) -> Outcome {
        match packet {
            Packet::Handshake(pkt) => match pkt.service {
                Service::DataAvailable => self.handle_data_available(kernel, &pkt),
                Service::MessageRequest => self.handle_message_request(kernel, &pkt),
                Service::MessageDelivery => Outcome::Error(MsgError::InvalidPacket),
            },
            Packet::Delivery(dlv) => self.handle_message_delivery(kernel, &dlv),
        }
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Learn where a sibling of `task` lives from the traffic it sent.
    fn refresh_location<K: TaskTable>(
        &mut self,
        kernel: &mut K,
        task: TaskHandle,
        peer: TaskId,
        source: PeAddress,
    ) {
        let Some(cache) = kernel.location_cache_mut(task) else {
            return;
        };
        if cache.refresh(peer, source) {
            self.stats.location_refreshes += 1;
            debug!(?peer, address = source.0, "peer location updated");
        }
    }

    /// Wake a task whose message just landed.
    fn release_receiver<K: TaskTable + Scheduler + Migration>(
        &mut self,
        kernel: &mut K,
        task: TaskHandle,
    ) -> Outcome {
        kernel.release_wait(task);
        if kernel.needs_migration(task) {
            debug!(?task, "released task leaves for migration");
            kernel.migrate(task);
            return Outcome::MigrationPending;
        }
        schedule_hint(kernel)
    }

    /// Copy a payload straight into a local consumer's receive window.
    fn deliver_locally<K: KernelServices>(
        &mut self,
        kernel: &mut K,
        consumer: TaskHandle,
        payload: &[u8],
    ) -> Result<Outcome, MsgError> {
        let pipe = kernel.input_pipe_mut(consumer).ok_or(MsgError::InvalidTask)?;
        let stored = pipe.transfer(payload);
        if stored < payload.len() {
            self.stats.truncated_deliveries += 1;
            warn!(declared = payload.len(), stored, "local transfer truncated");
        }
        Ok(self.release_receiver(kernel, consumer))
    }
}

/// `RescheduleRequired` when only the idle task is running
fn schedule_hint<K: Scheduler>(kernel: &K) -> Outcome {
    if kernel.is_idle() {
        Outcome::RescheduleRequired
    } else {
        Outcome::Handled
    }
}
