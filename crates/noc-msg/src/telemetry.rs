//! Low-level monitoring hooks
//!
//! Observer tasks announce themselves per monitor kind; each PE keeps the
//! nearest announcer of every kind and sends it compact records about the
//! traffic it delivers.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::types::{AppId, PeAddress, TaskId};

/// Service code carried by a security record
pub const SEC_MONITOR: u8 = 0x29;
/// Service code carried by a volume record
pub const VOL_MONITOR: u8 = 0x30;

/// Kinds of monitoring an observer can offer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MonitorKind {
    /// Real-time deadline monitoring
    Qos = 0,
    /// Message latency anomaly detection
    Security = 1,
    /// Per-hop traffic volume
    Volume = 2,
}

impl MonitorKind {
    /// Number of monitor kinds
    pub const COUNT: usize = 3;
}

/// The observer selected for one monitor kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observer {
    /// Observer task
    pub task: TaskId,
    /// PE hosting the observer
    pub address: PeAddress,
    /// Hops from this PE to the observer
    pub distance: u16,
}

/// Nearest observer of every monitor kind
#[derive(Clone, Debug)]
pub struct ObserverTable {
    local: PeAddress,
    slots: [Option<Observer>; MonitorKind::COUNT],
}

impl ObserverTable {
    /// Create an empty table for the PE at `local`
    pub fn new(local: PeAddress) -> Self {
        Self {
            local,
            slots: [None; MonitorKind::COUNT],
        }
    }

    /// Consider an announced observer.
    ///
    /// The candidate replaces the current one only if the slot is empty or
    /// the candidate is strictly closer; ties keep the earlier registrant.
    /// Returns whether the candidate was selected.
    pub fn set_observer(&mut self, kind: MonitorKind, task: TaskId, address: PeAddress) -> bool {
        let distance = self.local.hops_to(address);
        let slot = &mut self.slots[kind as usize];
        if let Some(current) = slot {
            if current.distance <= distance {
                return false;
            }
        }
        *slot = Some(Observer {
            task,
            address,
            distance,
        });
        true
    }

    /// Selected observer of `kind`
    pub fn observer(&self, kind: MonitorKind) -> Option<&Observer> {
        self.slots[kind as usize].as_ref()
    }

    /// Whether an observer of `kind` is registered
    pub fn has_observer(&self, kind: MonitorKind) -> bool {
        self.slots[kind as usize].is_some()
    }

    /// Address the table measures distances from
    pub fn local(&self) -> PeAddress {
        self.local
    }
}

/// Latency sample for the security monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRecord {
    /// Producer task
    pub producer: TaskId,
    /// Consumer task
    pub consumer: TaskId,
    /// Producer's application
    pub app: AppId,
    /// Send timestamp carried by the delivery
    pub timestamp: u32,
    /// Arrival minus send timestamp
    pub latency: u32,
    /// Hops between producer and consumer PEs
    pub hops: u16,
    /// Packet size in words, header included
    pub size: u16,
}

/// Traffic sample for the volume monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Hops between producer and consumer PEs
    pub hops: u16,
    /// Packet size in words, header included
    pub size: u16,
}

/// A record sent to an observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryRecord {
    /// For the security observer
    Security(SecurityRecord),
    /// For the volume observer
    Volume(VolumeRecord),
}

impl TelemetryRecord {
    /// Monitor kind this record is for
    pub fn kind(&self) -> MonitorKind {
        match self {
            TelemetryRecord::Security(_) => MonitorKind::Security,
            TelemetryRecord::Volume(_) => MonitorKind::Volume,
        }
    }

    /// Encode in the layout observer tasks read from their FIFO
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        match self {
            TelemetryRecord::Security(r) => {
                out.push(r.producer.index());
                out.push(r.consumer.index());
                out.push(SEC_MONITOR);
                out.push(r.app.0);
                out.extend_from_slice(&r.timestamp.to_le_bytes());
                out.extend_from_slice(&r.latency.to_le_bytes());
                out.extend_from_slice(&r.hops.to_le_bytes());
                out.extend_from_slice(&r.size.to_le_bytes());
            }
            TelemetryRecord::Volume(r) => {
                out.extend_from_slice(&[0, 0, VOL_MONITOR, 0]);
                out.extend_from_slice(&r.hops.to_le_bytes());
                out.extend_from_slice(&r.size.to_le_bytes());
            }
        }
        out
    }
}
