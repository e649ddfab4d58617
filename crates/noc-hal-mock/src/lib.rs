//! Mock HAL implementation for testing the NoC message engine
//!
//! This provides a mock implementation of the HAL trait that can be used
//! to unit test the engine without an RTL simulator or FPGA board. The
//! receive channel is a byte queue the test fills, transmitted packets are
//! captured for inspection, and the pending-IRQ bit records every edge.

#![no_std]
extern crate alloc;

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use noc_hal::{HalError, HAL};

/// A packet captured on the transmit path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Encoded header bytes
    pub header: Vec<u8>,
    /// Payload bytes (already word-aligned by the sender)
    pub payload: Vec<u8>,
}

impl Frame {
    /// Header followed by payload, as it would appear on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.clone();
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

/// Mock HAL for unit testing
///
/// Provides a simulated DMNI, RTC and interrupt register for testing
/// engine logic without a real platform.
pub struct MockHal {
    /// Router address of the simulated PE
    address: u32,
    /// Simulated RTC
    time: Cell<u32>,
    /// Arrival stamp reported for the packet being received
    arrival: Cell<u32>,
    /// Bytes waiting in the receive channel
    inbound: RefCell<VecDeque<u8>>,
    /// Packets handed to `transmit`
    transmitted: RefCell<Vec<Frame>>,
    /// Remaining polls during which the send channel reports busy
    busy_polls: Cell<u32>,
    /// When set, `transmit` fails with `LinkDown`
    link_down: Cell<bool>,
    /// Total bytes dropped through `discard`
    discarded: Cell<usize>,
    /// Outbound-pending interrupt bit
    irq_pending: Cell<bool>,
    /// Number of 0 -> 1 transitions of the interrupt bit
    irq_raised: Cell<u32>,
    /// Number of 1 -> 0 transitions of the interrupt bit
    irq_cleared: Cell<u32>,
}

impl MockHal {
    /// Create a new mock HAL for the PE at `address`
    pub fn new(address: u32) -> Self {
        Self {
            address,
            time: Cell::new(0),
            arrival: Cell::new(0),
            inbound: RefCell::new(VecDeque::new()),
            transmitted: RefCell::new(Vec::new()),
            busy_polls: Cell::new(0),
            link_down: Cell::new(false),
            discarded: Cell::new(0),
            irq_pending: Cell::new(false),
            irq_raised: Cell::new(0),
            irq_cleared: Cell::new(0),
        }
    }

    /// Create a mock HAL with a specific starting tick
    pub fn with_time(address: u32, ticks: u32) -> Self {
        let hal = Self::new(address);
        hal.time.set(ticks);
        hal
    }

    /// Advance the simulated RTC
    pub fn advance_time(&self, ticks: u32) {
        self.time.set(self.time.get().wrapping_add(ticks));
    }

    /// Set the simulated RTC to a specific value
    pub fn set_time(&self, ticks: u32) {
        self.time.set(ticks);
    }

    /// Set the arrival stamp reported for the next inbound packet
    pub fn set_arrival_timestamp(&self, ticks: u32) {
        self.arrival.set(ticks);
    }

    /// Append raw bytes to the receive channel
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.inbound.borrow_mut().extend(bytes.iter().copied());
    }

    /// Make the send channel report busy for the next `polls` checks.
    ///
    /// Each busy poll advances the RTC by one tick, so a timestamp taken
    /// after `wait_transmit_idle` is observably later than one taken before.
    pub fn set_transmit_busy(&self, polls: u32) {
        self.busy_polls.set(polls);
    }

    /// Make every subsequent `transmit` fail
    pub fn set_link_down(&self, down: bool) {
        self.link_down.set(down);
    }

    /// All packets transmitted so far
    pub fn transmitted(&self) -> Vec<Frame> {
        self.transmitted.borrow().clone()
    }

    /// Remove and return all packets transmitted so far
    pub fn take_transmitted(&self) -> Vec<Frame> {
        core::mem::take(&mut *self.transmitted.borrow_mut())
    }

    /// Number of packets transmitted so far
    pub fn transmit_count(&self) -> usize {
        self.transmitted.borrow().len()
    }

    /// Total bytes dropped through `discard`
    pub fn discarded_bytes(&self) -> usize {
        self.discarded.get()
    }

    /// Number of 0 -> 1 edges seen on the pending bit
    pub fn irq_raise_count(&self) -> u32 {
        self.irq_raised.get()
    }

    /// Number of 1 -> 0 edges seen on the pending bit
    pub fn irq_clear_count(&self) -> u32 {
        self.irq_cleared.get()
    }
}

impl HAL for MockHal {
    fn local_address(&self) -> u32 {
        self.address
    }

    fn transmit(&self, header: &[u8], payload: &[u8]) -> Result<(), HalError> {
        if self.link_down.get() {
            return Err(HalError::LinkDown);
        }
        self.transmitted.borrow_mut().push(Frame {
            header: header.to_vec(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn transmit_busy(&self) -> bool {
        let polls = self.busy_polls.get();
        if polls == 0 {
            return false;
        }
        self.busy_polls.set(polls - 1);
        self.advance_time(1);
        true
    }

    fn inbound_len(&self) -> usize {
        self.inbound.borrow().len()
    }

    fn receive(&self, buf: &mut [u8]) -> usize {
        let mut inbound = self.inbound.borrow_mut();
        let count = buf.len().min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..count)) {
            *slot = byte;
        }
        count
    }

    fn discard(&self, len: usize) {
        let mut inbound = self.inbound.borrow_mut();
        let count = len.min(inbound.len());
        inbound.drain(..count);
        self.discarded.set(self.discarded.get() + count);
    }

    fn arrival_timestamp(&self) -> u32 {
        self.arrival.get()
    }

    fn now_ticks(&self) -> u32 {
        self.time.get()
    }

    fn set_outbound_pending(&self, pending: bool) {
        match (self.irq_pending.get(), pending) {
            (false, true) => self.irq_raised.set(self.irq_raised.get() + 1),
            (true, false) => self.irq_cleared.set(self.irq_cleared.get() + 1),
            _ => {}
        }
        self.irq_pending.set(pending);
    }

    fn outbound_pending(&self) -> bool {
        self.irq_pending.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_drains_in_order() {
        let hal = MockHal::new(0x0101);
        hal.push_inbound(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(hal.receive(&mut buf), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(hal.inbound_len(), 2);
    }

    #[test]
    fn test_receive_short_when_channel_runs_dry() {
        let hal = MockHal::new(0x0101);
        hal.push_inbound(&[9, 9]);

        let mut buf = [0u8; 8];
        assert_eq!(hal.receive(&mut buf), 2);
        assert_eq!(hal.inbound_len(), 0);
    }

    #[test]
    fn test_discard_counts_bytes() {
        let hal = MockHal::new(0x0101);
        hal.push_inbound(&[0u8; 10]);
        hal.discard(6);
        assert_eq!(hal.discarded_bytes(), 6);
        assert_eq!(hal.inbound_len(), 4);
    }

    #[test]
    fn test_busy_polls_advance_time() {
        let hal = MockHal::with_time(0x0000, 100);
        hal.set_transmit_busy(3);
        hal.wait_transmit_idle();
        assert_eq!(hal.now_ticks(), 103);
    }

    #[test]
    fn test_irq_edges_counted_once() {
        let hal = MockHal::new(0x0000);
        hal.set_outbound_pending(true);
        hal.set_outbound_pending(true);
        hal.set_outbound_pending(false);
        hal.set_outbound_pending(false);
        assert_eq!(hal.irq_raise_count(), 1);
        assert_eq!(hal.irq_clear_count(), 1);
    }

    #[test]
    fn test_link_down_rejects_transmit() {
        let hal = MockHal::new(0x0000);
        hal.set_link_down(true);
        assert_eq!(hal.transmit(&[0u8; 16], &[]), Err(HalError::LinkDown));
        assert_eq!(hal.transmit_count(), 0);
    }
}
