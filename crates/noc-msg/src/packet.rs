//! Wire format of handshake and delivery packets
//!
//! Headers are fixed-size and little-endian:
//!
//! ```text
//! handshake (16 bytes)
//!   0..4   target address (routing flags in the top byte)
//!   4      flags
//!   5      service
//!   6..8   reserved, zero
//!   8..12  source address
//!   12..14 sender task
//!   14..16 receiver task
//!
//! delivery (24 bytes) = handshake header +
//!   16..20 payload size in bytes
//!   20..24 send timestamp (RTC ticks)
//! ```
//!
//! A delivery payload follows its header padded to the transport word size.

use serde::{Deserialize, Serialize};

use crate::error::MsgError;
use crate::types::{PeAddress, TaskId};

/// Transport word size in bytes
pub const WORD_SIZE: usize = 4;

/// Packet service codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Service {
    /// Producer announces that a message is ready
    DataAvailable = 0x40,
    /// Consumer asks the producer for the message
    MessageRequest = 0x41,
    /// Producer ships the payload
    MessageDelivery = 0x43,
}

impl Service {
    /// Convert from u8
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x40 => Some(Service::DataAvailable),
            0x41 => Some(Service::MessageRequest),
            0x43 => Some(Service::MessageDelivery),
            _ => None,
        }
    }
}

/// Router-facing part of a header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    /// Routing flags (top byte of the target)
    pub flags: u8,
    /// Destination PE
    pub target: PeAddress,
}

impl Routing {
    /// Routing towards `target`
    pub fn to(target: PeAddress) -> Self {
        Self {
            flags: target.flags(),
            target,
        }
    }
}

/// A `DataAvailable` or `MessageRequest` packet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakePacket {
    /// Routing information
    pub routing: Routing,
    /// Service code
    pub service: Service,
    /// PE the packet was emitted from
    pub source: PeAddress,
    /// Producer task
    pub sender: TaskId,
    /// Consumer task
    pub receiver: TaskId,
}

impl HandshakePacket {
    /// Encoded header length
    pub const WIRE_LEN: usize = 16;

    /// Build a handshake from `source` towards `target`
    pub fn new(
        service: Service,
        source: PeAddress,
        target: PeAddress,
        sender: TaskId,
        receiver: TaskId,
    ) -> Self {
        Self {
            routing: Routing::to(target),
            service,
            source,
            sender,
            receiver,
        }
    }

    /// Same packet re-addressed to `target`
    pub fn retarget(&self, target: PeAddress) -> Self {
        Self {
            routing: Routing::to(target),
            ..*self
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[0..4].copy_from_slice(&self.routing.target.0.to_le_bytes());
        out[4] = self.routing.flags;
        out[5] = self.service as u8;
        out[8..12].copy_from_slice(&self.source.0.to_le_bytes());
        out[12..14].copy_from_slice(&self.sender.0.to_le_bytes());
        out[14..16].copy_from_slice(&self.receiver.0.to_le_bytes());
        out
    }

    /// Decode from wire bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, MsgError> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(MsgError::InvalidPacket);
        }
        let service = Service::from_u8(bytes[5]).ok_or(MsgError::InvalidPacket)?;
        Ok(Self {
            routing: Routing {
                flags: bytes[4],
                target: PeAddress(read_u32(bytes, 0)),
            },
            service,
            source: PeAddress(read_u32(bytes, 8)),
            sender: TaskId(read_u16(bytes, 12)),
            receiver: TaskId(read_u16(bytes, 14)),
        })
    }
}

/// A `MessageDelivery` packet header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPacket {
    /// Common header (service is always `MessageDelivery`)
    pub header: HandshakePacket,
    /// Payload size in bytes, before padding
    pub payload_size: u32,
    /// RTC tick at which the packet left the sender
    pub timestamp: u32,
}

impl DeliveryPacket {
    /// Encoded header length
    pub const WIRE_LEN: usize = HandshakePacket::WIRE_LEN + Self::EXT_LEN;
    /// Bytes following the common header
    pub const EXT_LEN: usize = 8;

    /// Build a delivery header
    pub fn new(
        source: PeAddress,
        target: PeAddress,
        sender: TaskId,
        receiver: TaskId,
        payload_size: u32,
        timestamp: u32,
    ) -> Self {
        Self {
            header: HandshakePacket::new(Service::MessageDelivery, source, target, sender, receiver),
            payload_size,
            timestamp,
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[..HandshakePacket::WIRE_LEN].copy_from_slice(&self.header.encode());
        out[16..20].copy_from_slice(&self.payload_size.to_le_bytes());
        out[20..24].copy_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    /// Complete a delivery from its already decoded common header
    pub fn from_parts(header: HandshakePacket, ext: &[u8]) -> Result<Self, MsgError> {
        if header.service != Service::MessageDelivery || ext.len() < Self::EXT_LEN {
            return Err(MsgError::InvalidPacket);
        }
        Ok(Self {
            header,
            payload_size: read_u32(ext, 0),
            timestamp: read_u32(ext, 4),
        })
    }

    /// Decode from wire bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, MsgError> {
        let header = HandshakePacket::decode(bytes)?;
        Self::from_parts(header, bytes.get(HandshakePacket::WIRE_LEN..).unwrap_or(&[]))
    }

    /// Payload size as transmitted, padding included
    pub fn frame_len(&self, align: usize) -> Result<usize, MsgError> {
        usize::try_from(self.payload_size)
            .ok()
            .and_then(|size| align_up(size, align))
            .ok_or(MsgError::InvalidPacket)
    }
}

/// Any inbound packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Packet {
    /// `DataAvailable` or `MessageRequest`
    Handshake(HandshakePacket),
    /// `MessageDelivery`
    Delivery(DeliveryPacket),
}

/// Round `len` up to a multiple of `align` (a power of two).
///
/// Returns `None` if the rounded length does not fit in `usize`.
pub fn align_up(len: usize, align: usize) -> Option<usize> {
    len.checked_add(align - 1).map(|end| end & !(align - 1))
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_layout() {
        let pkt = HandshakePacket::new(
            Service::MessageRequest,
            PeAddress(0x0000_0102),
            PeAddress(0x8000_0304),
            TaskId(0x0201),
            TaskId(0xFFFF),
        );
        let bytes = pkt.encode();
        assert_eq!(
            bytes,
            [
                0x04, 0x03, 0x00, 0x80, // target
                0x80, 0x41, 0x00, 0x00, // flags, service, reserved
                0x02, 0x01, 0x00, 0x00, // source
                0x01, 0x02, 0xFF, 0xFF, // sender, receiver
            ]
        );
        assert_eq!(HandshakePacket::decode(&bytes), Ok(pkt));
    }

    #[test]
    fn test_delivery_layout() {
        let dlv = DeliveryPacket::new(
            PeAddress(0x0001),
            PeAddress(0x0100),
            TaskId(0x0100),
            TaskId(0x0101),
            10,
            0xAABBCCDD,
        );
        let bytes = dlv.encode();
        assert_eq!(bytes[5], 0x43);
        assert_eq!(&bytes[16..20], &[10, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(DeliveryPacket::decode(&bytes), Ok(dlv));
        assert_eq!(dlv.frame_len(WORD_SIZE), Ok(12));
    }

    #[test]
    fn test_decode_rejects_unknown_service() {
        let mut bytes = [0u8; HandshakePacket::WIRE_LEN];
        bytes[5] = 0x42;
        assert_eq!(HandshakePacket::decode(&bytes), Err(MsgError::InvalidPacket));
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert_eq!(HandshakePacket::decode(&[0u8; 8]), Err(MsgError::InvalidPacket));
        let hdr = HandshakePacket::new(
            Service::MessageDelivery,
            PeAddress(0),
            PeAddress(0),
            TaskId(0),
            TaskId(0),
        );
        assert_eq!(
            DeliveryPacket::decode(&hdr.encode()),
            Err(MsgError::InvalidPacket)
        );
    }

    #[test]
    fn test_retarget_keeps_everything_but_routing() {
        let pkt = HandshakePacket::new(
            Service::DataAvailable,
            PeAddress(0x0101),
            PeAddress(0x0202),
            TaskId(0x0300),
            TaskId(0x0301),
        );
        let moved = pkt.retarget(PeAddress(0x0404));
        assert_eq!(moved.routing.target, PeAddress(0x0404));
        assert_eq!(moved.source, pkt.source);
        assert_eq!(moved.sender, pkt.sender);
        assert_eq!(moved.receiver, pkt.receiver);
        assert_eq!(moved.service, pkt.service);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4), Some(0));
        assert_eq!(align_up(1, 4), Some(4));
        assert_eq!(align_up(100, 4), Some(100));
        assert_eq!(align_up(101, 4), Some(104));
    }

    #[test]
    fn test_align_up_overflow() {
        assert_eq!(align_up(usize::MAX, 4), None);
        assert_eq!(align_up(usize::MAX - 2, 4), None);
        assert_eq!(align_up(usize::MAX - 3, 4), Some(usize::MAX - 3));
    }
}
