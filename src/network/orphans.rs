// Bounded pool of blocks whose parent has not arrived yet

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use log::warn;

use crate::core::Hash256;

struct Orphan {
    raw: Vec<u8>,
    parent: Hash256,
    received: Instant,
}

/// Orphan blocks keyed by hash and by missing parent.
///
/// Holds at most `max_orphans` blocks, each for at most `ttl`; the oldest is
/// evicted first.
pub struct OrphanPool {
    orphans: HashMap<Hash256, Orphan>,
    by_parent: HashMap<Hash256, Vec<Hash256>>,
    /// Arrival order; may still list hashes already taken out
    arrivals: VecDeque<Hash256>,
    max_orphans: usize,
    ttl: Duration,
}

impl OrphanPool {
    pub fn new(max_orphans: usize, ttl: Duration) -> Self {
        Self {
            orphans: HashMap::new(),
            by_parent: HashMap::new(),
            arrivals: VecDeque::new(),
            max_orphans,
            ttl,
        }
    }

    /// Park a block. Returns false if it is already parked.
    pub fn insert(&mut self, hash: Hash256, parent: Hash256, raw: Vec<u8>, now: Instant) -> bool {
        if self.max_orphans == 0 || self.orphans.contains_key(&hash) {
            return false;
        }

        while self.orphans.len() >= self.max_orphans {
            match self.arrivals.pop_front() {
                Some(oldest) => {
                    if self.remove(&oldest).is_some() {
                        warn!("Evicted orphan block {}: pool full", oldest);
                    }
                }
                None => break,
            }
        }

        self.orphans.insert(
            hash,
            Orphan {
                raw,
                parent,
                received: now,
            },
        );
        self.by_parent.entry(parent).or_default().push(hash);
        self.arrivals.push_back(hash);
        true
    }

    fn remove(&mut self, hash: &Hash256) -> Option<Orphan> {
        let orphan = self.orphans.remove(hash)?;
        if let Some(siblings) = self.by_parent.get_mut(&orphan.parent) {
            siblings.retain(|h| h != hash);
            if siblings.is_empty() {
                self.by_parent.remove(&orphan.parent);
            }
        }
        Some(orphan)
    }

    /// Remove and return every orphan waiting on `parent`
    pub fn take_children(&mut self, parent: &Hash256) -> Vec<(Hash256, Vec<u8>)> {
        let Some(children) = self.by_parent.remove(parent) else {
            return Vec::new();
        };
        children
            .into_iter()
            .filter_map(|hash| self.orphans.remove(&hash).map(|orphan| (hash, orphan.raw)))
            .collect()
    }

    /// First ancestor of `hash` that is not itself parked
    pub fn missing_root(&self, hash: &Hash256) -> Hash256 {
        let mut current = *hash;
        while let Some(orphan) = self.orphans.get(&current) {
            current = orphan.parent;
        }
        current
    }

    /// Drop orphans older than the TTL. Returns how many went.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        while let Some(oldest) = self.arrivals.front().copied() {
            let stale = match self.orphans.get(&oldest) {
                Some(orphan) => now.saturating_duration_since(orphan.received) >= self.ttl,
                None => true,
            };
            if !stale {
                break;
            }
            self.arrivals.pop_front();
            if self.remove(&oldest).is_some() {
                warn!("Expired orphan block {}", oldest);
                expired += 1;
            }
        }
        expired
    }

    /// Whether the block is parked
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.orphans.contains_key(hash)
    }

    /// Number of parked blocks
    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }
}
