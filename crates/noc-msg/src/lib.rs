//! NoC message engine - migration-aware message passing between PEs
//!
//! This crate implements the kernel side of inter-task messaging on a
//! mesh network-on-chip. A message moves in three phases:
//!
//! 1. the producer announces it with `DataAvailable`
//! 2. the consumer asks for it with `MessageRequest`
//! 3. the producer's PE sends it with `MessageDelivery`
//!
//! Phases that arrive before their counterpart are parked per task, and
//! handshakes for a task that migrated away are forwarded to its new PE.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         noc-msg                             │
//! │                                                             │
//! │   ┌───────────────┐    ┌───────────────┐                    │
//! │   │ MessageEngine │    │   handlers    │                    │
//! │   │  - outbound   │───▶│  data_av      │                    │
//! │   │  - observers  │    │  request      │                    │
//! │   │  - stats      │    │  delivery     │                    │
//! │   └───────────────┘    └───────────────┘                    │
//! │           │                    │                            │
//! │           ▼                    ▼                            │
//! │   ┌───────────────┐    ┌───────────────┐                    │
//! │   │    noc-hal    │    │KernelServices │                    │
//! │   │  DMNI, timer  │    │ tasks, sched, │                    │
//! │   │  IRQ line     │    │ migration,RPC │                    │
//! │   └───────────────┘    └───────────────┘                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - Task, application and PE identifiers
//! - `packet` - Handshake and delivery wire format
//! - `pending` - Pending-entry lists and the location cache
//! - `outbound` - Handshakes waiting for the DMNI
//! - `pipe` - Output/input pipes and kernel buffers
//! - `telemetry` - Observer selection and monitoring records
//! - `services` - Traits the engine drives the rest of the kernel through
//! - `engine` - The engine and its packet handlers
//! - `invariants` - Runtime-checkable engine invariants

#![no_std]
extern crate alloc;

pub mod config;
pub mod engine;
pub mod error;
pub mod invariants;
pub mod outbound;
pub mod packet;
pub mod pending;
pub mod pipe;
pub mod services;
pub mod telemetry;
pub mod types;

pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineStats, MessageEngine, ReadStatus};
pub use error::{MsgError, Outcome};
pub use invariants::{check_all_invariants, InvariantViolation};
pub use outbound::OutboundQueue;
pub use packet::{DeliveryPacket, HandshakePacket, Packet, Routing, Service, WORD_SIZE};
pub use pending::{LocationCache, LocationEntry, Mailbox, PendingEntryList};
pub use pipe::{InputPipe, KernelBuffer, OutputPipe};
pub use services::{
    Halt, KernelPipes, KernelServices, Migration, RpcDispatcher, Scheduler, TaskTable,
    TelemetrySink,
};
pub use telemetry::{MonitorKind, Observer, ObserverTable, TelemetryRecord};
pub use types::{AppId, Consumer, PeAddress, TaskHandle, TaskId};
