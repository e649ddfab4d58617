//! Runtime-checkable engine invariants
//!
//! Used by tests after every handled packet.
//!
//! # Invariants
//!
//! 1. **Outbound signal**: the pending-IRQ bit is set exactly when the
//!    outbound queue is non-empty
//! 2. **Observer distance**: each selected observer's cached distance is the
//!    hop count from this PE to the observer's PE

use alloc::string::String;
use alloc::vec::Vec;

use noc_hal::HAL;

use crate::engine::MessageEngine;
use crate::telemetry::MonitorKind;

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all engine invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants<H: HAL>(engine: &MessageEngine<H>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_outbound_signal(engine));
    violations.extend(check_observer_distance(engine));

    violations
}

/// Invariant 1: pending bit mirrors queue occupancy
fn check_outbound_signal<H: HAL>(engine: &MessageEngine<H>) -> Option<InvariantViolation> {
    let queued = engine.outbound().len();
    let pending = engine.hal().outbound_pending();
    if pending == (queued > 0) {
        return None;
    }
    Some(InvariantViolation {
        invariant: "outbound_signal",
        description: alloc::format!(
            "{} handshakes queued but pending bit is {}",
            queued,
            pending
        ),
    })
}

/// Invariant 2: cached observer distances are current
fn check_observer_distance<H: HAL>(engine: &MessageEngine<H>) -> Vec<InvariantViolation> {
    let local = engine.local_address();
    [MonitorKind::Qos, MonitorKind::Security, MonitorKind::Volume]
        .into_iter()
        .filter_map(|kind| engine.observers().observer(kind).map(|obs| (kind, *obs)))
        .filter(|(_, obs)| obs.distance != local.hops_to(obs.address))
        .map(|(kind, obs)| InvariantViolation {
            invariant: "observer_distance",
            description: alloc::format!(
                "{:?} observer at {:#x} cached distance {} but is {} hops away",
                kind,
                obs.address.0,
                obs.distance,
                local.hops_to(obs.address)
            ),
        })
        .collect()
}
