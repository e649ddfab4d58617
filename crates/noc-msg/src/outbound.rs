//! Outbound pending queue
//!
//! Handshakes are not transmitted inline: they are queued here and the DMNI
//! driver drains the queue from its interrupt handler. The DMNI "outbound
//! pending" bit mirrors the queue state and is updated in the same call as
//! every push and pop, so the driver never sees an empty bit over a
//! non-empty queue.

use alloc::collections::VecDeque;

use noc_hal::HAL;

use crate::error::MsgError;
use crate::packet::HandshakePacket;

/// FIFO of handshakes waiting for the network interface
#[derive(Debug, Default)]
pub struct OutboundQueue {
    packets: VecDeque<HandshakePacket>,
}

impl OutboundQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            packets: VecDeque::new(),
        }
    }

    /// Queue a packet and raise the pending bit.
    pub fn push<H: HAL>(&mut self, hal: &H, packet: HandshakePacket) -> Result<(), MsgError> {
        self.packets
            .try_reserve(1)
            .map_err(|_| MsgError::OutOfMemory)?;
        self.packets.push_back(packet);
        hal.set_outbound_pending(true);
        Ok(())
    }

    /// Put a packet back at the head after a failed transmit.
    pub fn requeue<H: HAL>(&mut self, hal: &H, packet: HandshakePacket) -> Result<(), MsgError> {
        self.packets
            .try_reserve(1)
            .map_err(|_| MsgError::OutOfMemory)?;
        self.packets.push_front(packet);
        hal.set_outbound_pending(true);
        Ok(())
    }

    /// Take the oldest packet; clears the pending bit once the queue is empty.
    pub fn pop<H: HAL>(&mut self, hal: &H) -> Option<HandshakePacket> {
        let packet = self.packets.pop_front();
        if self.packets.is_empty() {
            hal.set_outbound_pending(false);
        }
        packet
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Number of waiting packets
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Oldest waiting packet
    pub fn front(&self) -> Option<&HandshakePacket> {
        self.packets.front()
    }
}
