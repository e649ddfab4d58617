//! Migration forwarding
//!
//! A handshake for a task that no longer runs here is re-emitted, unchanged
//! except for its routing, to the PE the task migrated to.

use noc_hal::HAL;
use tracing::{debug, warn};

use super::MessageEngine;
use crate::error::{MsgError, Outcome};
use crate::packet::HandshakePacket;
use crate::services::Migration;
use crate::types::TaskId;

impl<H: HAL> MessageEngine<H> {
    /// Forward `pkt`, which names the absent `task`, to the task's new PE.
    pub(crate) fn forward_handshake<K: Migration>(
        &mut self,
        kernel: &K,
        pkt: &HandshakePacket,
        task: TaskId,
    ) -> Result<Outcome, MsgError> {
        let Some(location) = kernel.last_known_location(task) else {
            warn!(?task, service = ?pkt.service, "no local owner and no migration record");
            return Err(MsgError::InvalidTask);
        };

        self.outbound
            .push(&self.hal, pkt.retarget(location.address))
            .inspect_err(|_| self.stats.dropped_handshakes += 1)?;
        self.stats.forwarded += 1;
        debug!(
            ?task,
            service = ?pkt.service,
            target = location.address.0,
            "handshake forwarded to migrated task"
        );
        Ok(Outcome::Handled)
    }
}
