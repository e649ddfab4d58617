//! Core identifier types
//!
//! Tasks, applications and router addresses as they appear on the wire.
//! All types here are plain data with no HAL dependency.

use serde::{Deserialize, Serialize};

/// Application identifier (high byte of a [`TaskId`])
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(pub u8);

impl AppId {
    /// Application byte used by kernel-owned ids
    pub const KERNEL: AppId = AppId(0xFF);
    /// Application hosting the management tasks
    pub const MANAGEMENT: AppId = AppId(0);
}

/// Task identifier
///
/// The high byte carries the application id and the low byte the task index
/// inside that application. An all-ones high byte marks a kernel id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u16);

impl TaskId {
    /// The kernel sentinel (−1 on the wire)
    pub const KERNEL: TaskId = TaskId(0xFFFF);

    /// Build a task id from its application and index
    pub const fn new(app: AppId, index: u8) -> Self {
        TaskId(((app.0 as u16) << 8) | index as u16)
    }

    /// Owning application
    pub const fn app(self) -> AppId {
        AppId((self.0 >> 8) as u8)
    }

    /// Index of the task inside its application
    pub const fn index(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Whether this id names the kernel rather than a user task
    pub const fn is_kernel(self) -> bool {
        self.app().0 == AppId::KERNEL.0
    }
}

/// Router address of a PE, possibly carrying routing flags in the top byte
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeAddress(pub u32);

impl PeAddress {
    /// Message must be delivered to a privileged port, not a task
    pub const FORCE_PORT: u32 = 0x8000_0000;
    /// Message is addressed to the kernel of the target PE
    pub const KERNEL_MSG: u32 = 0x1000_0000;

    /// Address of the PE at mesh coordinates `(x, y)`
    pub const fn from_xy(x: u8, y: u8) -> Self {
        PeAddress(((x as u32) << 8) | y as u32)
    }

    /// Routing flags byte carried in packet headers
    pub const fn flags(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Whether the force-port flag is set
    pub const fn is_force_port(self) -> bool {
        self.0 & Self::FORCE_PORT != 0
    }

    /// Mesh coordinates `(x, y)`
    pub fn coordinates(self) -> (u8, u8) {
        noc_hal::mesh_coordinates(self.0)
    }

    /// Manhattan distance to another PE
    pub fn hops_to(self, other: PeAddress) -> u16 {
        noc_hal::hop_distance(self.0, other.0)
    }
}

/// Generation-checked handle to a task owned by the task table.
///
/// Handles stay valid only while the slot keeps the same generation; a task
/// that migrates away and is replaced invalidates every outstanding handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    /// Slot index in the task table
    pub slot: u32,
    /// Generation of the slot when the handle was issued
    pub generation: u32,
}

/// The effective consumer of a message request
///
/// A request normally names its consumer task. Requests without an explicit
/// receiver come from a kernel or a privileged port on the requesting PE and
/// are identified by the requester's address instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consumer {
    /// A user task
    Task(TaskId),
    /// The kernel of the PE at this address
    Kernel(PeAddress),
    /// A privileged port of the PE at this address
    Port(PeAddress),
}

impl Consumer {
    /// Effective consumer of a request sent by `receiver` from `source`.
    pub fn for_request(receiver: TaskId, source: PeAddress) -> Self {
        if receiver != TaskId::KERNEL {
            Consumer::Task(receiver)
        } else if source.is_force_port() {
            Consumer::Port(source)
        } else {
            Consumer::Kernel(PeAddress(source.0 | PeAddress::KERNEL_MSG))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_splits_app_and_index() {
        let id = TaskId::new(AppId(3), 7);
        assert_eq!(id, TaskId(0x0307));
        assert_eq!(id.app(), AppId(3));
        assert_eq!(id.index(), 7);
        assert!(!id.is_kernel());
    }

    #[test]
    fn test_kernel_sentinel() {
        assert!(TaskId::KERNEL.is_kernel());
        assert!(TaskId(0xFF02).is_kernel());
        assert!(!TaskId(0x0002).is_kernel());
    }

    #[test]
    fn test_address_flags() {
        let addr = PeAddress(PeAddress::FORCE_PORT | 0x0102);
        assert!(addr.is_force_port());
        assert_eq!(addr.flags(), 0x80);
        assert_eq!(addr.coordinates(), (1, 2));
        assert_eq!(PeAddress::from_xy(1, 2).hops_to(addr), 0);
    }

    #[test]
    fn test_consumer_for_request() {
        let src = PeAddress(0x0203);
        assert_eq!(
            Consumer::for_request(TaskId(0x0101), src),
            Consumer::Task(TaskId(0x0101))
        );
        assert_eq!(
            Consumer::for_request(TaskId::KERNEL, src),
            Consumer::Kernel(PeAddress(0x1000_0203))
        );

        let port = PeAddress(PeAddress::FORCE_PORT | 0x0203);
        assert_eq!(
            Consumer::for_request(TaskId::KERNEL, port),
            Consumer::Port(port)
        );
    }
}
