//! Per-task pending-entry lists and the per-application location cache
//!
//! A handshake phase that arrives before its counterpart is parked here:
//! `DataAvailable` notices on the consumer, `MessageRequest`s on the
//! producer. Entries are kept in arrival order and matched by peer task.

use alloc::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::MsgError;
use crate::types::{AppId, PeAddress, TaskId};

/// A peer task and the PE it was last seen on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    /// Peer task
    pub peer: TaskId,
    /// PE address the peer's handshake came from
    pub address: PeAddress,
}

/// Ordered list of unmatched handshake phases
#[derive(Clone, Debug, Default)]
pub struct PendingEntryList {
    entries: VecDeque<LocationEntry>,
}

impl PendingEntryList {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append an entry at the back.
    ///
    /// Fails with `OutOfMemory` if the list cannot grow; the list is left
    /// unchanged in that case.
    pub fn push_back(&mut self, peer: TaskId, address: PeAddress) -> Result<(), MsgError> {
        self.entries
            .try_reserve(1)
            .map_err(|_| MsgError::OutOfMemory)?;
        self.entries.push_back(LocationEntry { peer, address });
        Ok(())
    }

    /// Remove and return the oldest entry for `peer`
    pub fn take(&mut self, peer: TaskId) -> Option<LocationEntry> {
        let pos = self.entries.iter().position(|e| e.peer == peer)?;
        self.entries.remove(pos)
    }

    /// Oldest entry for `peer`, if any
    pub fn find(&self, peer: TaskId) -> Option<&LocationEntry> {
        self.entries.iter().find(|e| e.peer == peer)
    }

    /// Remove every entry, oldest first.
    ///
    /// Called by the migration subsystem to carry a task's parked phases
    /// to its new PE; the engine itself never empties a list wholesale.
    pub fn drain(&mut self) -> impl Iterator<Item = LocationEntry> + '_ {
        self.entries.drain(..)
    }

    /// Iterate in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &LocationEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The two pending-entry lists owned by every task
#[derive(Clone, Debug, Default)]
pub struct Mailbox {
    /// `DataAvailable` notices waiting for this task to read
    pub data_available: PendingEntryList,
    /// `MessageRequest`s waiting for this task to write
    pub message_requests: PendingEntryList,
}

impl Mailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self::default()
    }
}

/// Last known PE of every task of one application
#[derive(Clone, Debug)]
pub struct LocationCache {
    owner: AppId,
    locations: BTreeMap<TaskId, PeAddress>,
}

impl LocationCache {
    /// Create an empty cache for the tasks of `owner`
    pub fn new(owner: AppId) -> Self {
        Self {
            owner,
            locations: BTreeMap::new(),
        }
    }

    /// Application this cache belongs to
    pub fn owner(&self) -> AppId {
        self.owner
    }

    /// Record a mapping from the application's task table (boot or
    /// migration notice). Tasks of other applications are ignored.
    pub fn insert(&mut self, task: TaskId, address: PeAddress) {
        if task.app() == self.owner {
            self.locations.insert(task, address);
        }
    }

    /// Refresh from observed traffic.
    ///
    /// Only traffic from a sibling task updates the cache. Returns whether
    /// the stored address changed.
    pub fn refresh(&mut self, peer: TaskId, address: PeAddress) -> bool {
        if peer.is_kernel() || peer.app() != self.owner {
            return false;
        }
        self.locations.insert(peer, address) != Some(address)
    }

    /// Last known address of `task`
    pub fn lookup(&self, task: TaskId) -> Option<PeAddress> {
        self.locations.get(&task).copied()
    }

    /// Number of known tasks
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether nothing is known yet
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
