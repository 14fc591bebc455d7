// src/violation_store.rs
//
// Bounded append-only log of violations. Oldest entries are evicted once
// the capacity is exceeded; nothing else ever removes an entry.

use crate::types::{EvidenceRef, Violation, ViolationId};
use std::collections::VecDeque;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 500;

pub struct ViolationStore {
    entries: VecDeque<Violation>,
    capacity: usize,
    evicted: u64,
}

impl ViolationStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append one frame's batch, attaching the same evidence to each entry.
    pub fn append(&mut self, batch: Vec<Violation>, evidence: Option<EvidenceRef>) {
        for mut violation in batch {
            if let Some(ev) = &evidence {
                violation.attach_evidence(ev.clone());
            }
            self.entries.push_back(violation);
        }

        let mut dropped = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            self.evicted += dropped;
            debug!("Violation store full, evicted {} oldest", dropped);
        }
    }

    /// Up to `limit` entries, most recent first.
    pub fn list_recent(&self, limit: usize) -> Vec<Violation> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Searches live entries only; an evicted id is indistinguishable from
    /// one that never existed.
    pub fn find_by_id(&self, id: ViolationId) -> Option<&Violation> {
        self.entries.iter().find(|v| v.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl Default for ViolationStore {
    fn default() -> Self {
        Self::new()
    }
}
