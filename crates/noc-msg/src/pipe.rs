//! Message pipes
//!
//! The task table owns the pipes; the engine only moves bytes through them.

use alloc::vec;
use alloc::vec::Vec;

use noc_hal::HAL;

use crate::types::{Consumer, TaskId};

/// A produced message waiting for its consumer's request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPipe {
    consumer: Consumer,
    payload: Vec<u8>,
}

impl OutputPipe {
    /// Wrap a produced payload
    pub fn new(consumer: Consumer, payload: Vec<u8>) -> Self {
        Self { consumer, payload }
    }

    /// Who the message is for
    pub fn consumer(&self) -> Consumer {
        self.consumer
    }

    /// Message bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// A task's receive window
///
/// The window is allocated up front by the task table; receiving never
/// allocates. Bytes beyond the window capacity are not stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputPipe {
    window: Vec<u8>,
    filled: usize,
}

impl InputPipe {
    /// Create a receive window of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            window: vec![0; capacity],
            filled: 0,
        }
    }

    /// Window size in bytes
    pub fn capacity(&self) -> usize {
        self.window.len()
    }

    /// Bytes stored by the last transfer or receive
    pub fn data(&self) -> &[u8] {
        &self.window[..self.filled]
    }

    /// Copy a locally produced payload into the window.
    ///
    /// Returns the number of bytes stored.
    pub fn transfer(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.window.len());
        self.window[..count].copy_from_slice(&src[..count]);
        self.filled = count;
        count
    }

    /// Pull up to `declared` bytes of the in-flight payload from the DMNI.
    ///
    /// Returns the number of bytes actually read; the caller owns draining
    /// whatever is left of the frame.
    pub fn receive<H: HAL>(&mut self, hal: &H, declared: usize) -> usize {
        let want = declared.min(self.window.len());
        self.filled = hal.receive(&mut self.window[..want]);
        self.filled
    }
}

/// A message produced by the kernel for a task that has not requested it yet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelBuffer {
    /// Task the message is for
    pub consumer: TaskId,
    /// Message bytes
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use noc_hal_mock::MockHal;

    #[test]
    fn test_transfer_truncates_to_window() {
        let mut pipe = InputPipe::new(4);
        assert_eq!(pipe.transfer(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(pipe.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_receive_reads_declared_bytes() {
        let hal = MockHal::new(0);
        hal.push_inbound(&[7, 8, 9, 0]);
        let mut pipe = InputPipe::new(16);
        assert_eq!(pipe.receive(&hal, 3), 3);
        assert_eq!(pipe.data(), &[7, 8, 9]);
        assert_eq!(hal.inbound_len(), 1);
    }

    #[test]
    fn test_receive_stops_at_capacity() {
        let hal = MockHal::new(0);
        hal.push_inbound(&[1u8; 100]);
        let mut pipe = InputPipe::new(40);
        assert_eq!(pipe.receive(&hal, 100), 40);
        assert_eq!(hal.inbound_len(), 60);
    }
}
