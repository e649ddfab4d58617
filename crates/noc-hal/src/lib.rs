//! Hardware Abstraction Layer trait for a NoC processing element
//!
//! This crate defines the HAL trait that lets the message engine run on
//! different platforms (RTL simulation, FPGA prototype, host-side tests) by
//! abstracting the PE's memory-mapped hardware.
//!
//! # Hardware Covered
//!
//! - **DMNI**: the direct-memory network interface that moves packets
//!   between local memory and the router
//! - **RTC**: the free-running tick counter used for message timestamps
//! - **IRQ pending register**: the bit that tells the DMNI driver it still
//!   has queued packets to drain

#![no_std]

use thiserror::Error;

/// Hardware Abstraction Layer trait
///
/// Implementations provide platform-specific functionality for:
/// - Packet transmission and reception through the DMNI
/// - Time measurement
/// - The outbound-pending interrupt signal
///
/// All methods take `&self`: the underlying registers are memory-mapped and
/// a PE runs a single thread of control, so implementations use interior
/// mutability the same way the hardware does.
pub trait HAL {
    // === Identity ===

    /// Router address of this PE (`(x << 8) | y` in the low 16 bits)
    fn local_address(&self) -> u32;

    // === Transmit ===

    /// Hand a packet to the DMNI.
    ///
    /// # Arguments
    /// * `header` - Encoded fixed-size packet header
    /// * `payload` - Word-aligned payload, empty for handshakes
    ///
    /// # Returns
    /// * `Ok(())` - Packet accepted by the network interface
    /// * `Err(HalError::LinkDown)` - The router refused the packet
    fn transmit(&self, header: &[u8], payload: &[u8]) -> Result<(), HalError>;

    /// Whether a previous transmission is still being pushed into the router
    fn transmit_busy(&self) -> bool;

    /// Block until the DMNI send channel is free.
    fn wait_transmit_idle(&self) {
        while self.transmit_busy() {
            core::hint::spin_loop();
        }
    }

    // === Receive ===

    /// Number of bytes waiting in the DMNI receive channel
    fn inbound_len(&self) -> usize;

    /// Copy bytes from the receive channel into `buf`.
    ///
    /// Returns the number of bytes copied, which is smaller than `buf.len()`
    /// only when the channel runs dry.
    fn receive(&self, buf: &mut [u8]) -> usize;

    /// Drop `len` bytes from the receive channel without storing them.
    fn discard(&self, len: usize);

    /// Tick at which the packet currently being received entered the router
    fn arrival_timestamp(&self) -> u32;

    // === Time ===

    /// Current RTC tick (wraps at `u32::MAX`)
    fn now_ticks(&self) -> u32;

    // === Interrupts ===

    /// Set or clear the DMNI "outbound pending" interrupt bit
    fn set_outbound_pending(&self, pending: bool);

    /// Current state of the "outbound pending" interrupt bit
    fn outbound_pending(&self) -> bool;
}

/// HAL errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HalError {
    /// Router did not accept the packet
    #[error("network link refused the packet")]
    LinkDown,
}

/// Split a router address into its `(x, y)` mesh coordinates
pub fn mesh_coordinates(address: u32) -> (u8, u8) {
    (((address >> 8) & 0xFF) as u8, (address & 0xFF) as u8)
}

/// Manhattan distance between two router addresses
pub fn hop_distance(a: u32, b: u32) -> u16 {
    let (ax, ay) = mesh_coordinates(a);
    let (bx, by) = mesh_coordinates(b);
    (ax.abs_diff(bx) as u16) + (ay.abs_diff(by) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_coordinates_ignore_flag_bits() {
        assert_eq!(mesh_coordinates(0x8000_0203), (2, 3));
        assert_eq!(mesh_coordinates(0x0000_0000), (0, 0));
    }

    #[test]
    fn test_hop_distance_is_symmetric() {
        assert_eq!(hop_distance(0x0000, 0x0203), 5);
        assert_eq!(hop_distance(0x0203, 0x0000), 5);
        assert_eq!(hop_distance(0x0101, 0x0101), 0);
    }
}
