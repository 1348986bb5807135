//! # Vector Clock Store
//!
//! Per-origin "next expected sequence number". Sequence ids start at 1, so an
//! origin this node has never heard of implicitly expects id 1.
//!
//! ## Invariants
//!
//! - `next_id(origin)` never decreases.
//! - A rumor is accepted iff its id equals `next_id(origin)`, and acceptance
//!   advances the clock by exactly one.
//!
//! Origins are kept in a `BTreeMap` so snapshots and comparisons walk them in
//! a fixed order regardless of hashing.

use shared_types::{PeerStatus, StatusPacket};
use std::collections::{BTreeMap, HashSet};

/// First sequence id any origin assigns.
pub const FIRST_ID: u32 = 1;

/// Outcome of comparing a remote status against the local clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// Remote knows something we do not: answer with our status so it pushes.
    RemoteAhead,
    /// We know something the remote does not: push rumor `next_id` of `origin`.
    LocalAhead { origin: String, next_id: u32 },
    /// Identical clocks.
    InSync,
}

#[derive(Debug, Clone, Default)]
pub struct VectorClock {
    next: BTreeMap<String, u32>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, origin: &str) -> u32 {
        self.next.get(origin).copied().unwrap_or(FIRST_ID)
    }

    /// Accept `id` from `origin` if it is exactly the next expected one.
    pub fn try_accept(&mut self, origin: &str, id: u32) -> bool {
        if id != self.next_id(origin) {
            return false;
        }
        self.next.insert(origin.to_string(), id + 1);
        true
    }

    /// Allocate the next id for a locally published rumor.
    pub fn allocate(&mut self, origin: &str) -> u32 {
        let id = self.next_id(origin);
        self.next.insert(origin.to_string(), id + 1);
        id
    }

    pub fn origins(&self) -> Vec<String> {
        self.next.keys().cloned().collect()
    }

    /// Snapshot as a status packet, one entry per known origin.
    pub fn status(&self) -> StatusPacket {
        StatusPacket {
            want: self
                .next
                .iter()
                .map(|(origin, next_id)| PeerStatus {
                    identifier: origin.clone(),
                    next_id: *next_id,
                })
                .collect(),
        }
    }

    /// Three-way comparison against a remote status.
    ///
    /// Remote entries are scanned in the order the remote sent them and the
    /// first mismatch wins. If none is found, any local origin the remote
    /// never mentioned (first in sorted order) makes us ahead; otherwise the
    /// two clocks are in sync. Runs in O(known origins).
    pub fn compare(&self, remote: &StatusPacket) -> SyncDecision {
        let mut mentioned: HashSet<&str> = HashSet::with_capacity(remote.want.len());

        for entry in &remote.want {
            mentioned.insert(entry.identifier.as_str());
            let local_next = self.next_id(&entry.identifier);

            if entry.next_id > local_next {
                return SyncDecision::RemoteAhead;
            }
            if entry.next_id < local_next {
                return SyncDecision::LocalAhead {
                    origin: entry.identifier.clone(),
                    next_id: entry.next_id,
                };
            }
        }

        // Only origins with at least one accepted rumor live in the map.
        match self
            .next
            .keys()
            .find(|origin| !mentioned.contains(origin.as_str()))
        {
            Some(origin) => SyncDecision::LocalAhead {
                origin: origin.clone(),
                next_id: FIRST_ID,
            },
            None => SyncDecision::InSync,
        }
    }
}
