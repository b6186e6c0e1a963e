// In-memory chain index: parent links, heights and best-chain selection

use std::collections::{BTreeMap, HashMap};

use crate::core::Hash256;

/// Locator entries taken one block apart before the step starts doubling
const LOCATOR_DENSE_ENTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Record offset in the block file
    pub offset: u64,
    pub parent: Hash256,
    /// `None` until the block connects back to the zero parent
    pub height: Option<u32>,
}

/// Block graph over every stored block, including disconnected ones.
///
/// Append-only: entries are never removed or re-parented.
#[derive(Debug, Default)]
pub struct ChainIndex {
    entries: HashMap<Hash256, IndexEntry>,
    /// Parent hash to children, in insertion order
    children: HashMap<Hash256, Vec<Hash256>>,
    by_height: BTreeMap<u32, Vec<Hash256>>,
}

impl ChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a block. Returns false if the hash is already present.
    ///
    /// A block whose parent is the zero hash gets height 0; a block whose
    /// parent has a height gets one more, and connecting it hands heights down
    /// to every descendant that was waiting on it.
    pub fn insert(&mut self, hash: Hash256, parent: Hash256, offset: u64) -> bool {
        if self.entries.contains_key(&hash) {
            return false;
        }

        let height = if parent.is_zero() {
            Some(0)
        } else {
            self.height_of(&parent).map(|h| h + 1)
        };

        self.entries.insert(
            hash,
            IndexEntry {
                offset,
                parent,
                height: None,
            },
        );
        self.children.entry(parent).or_default().push(hash);

        if let Some(height) = height {
            self.link(hash, height);
        }
        true
    }

    fn link(&mut self, hash: Hash256, height: u32) {
        let mut pending = vec![(hash, height)];

        while let Some((hash, height)) = pending.pop() {
            let Some(entry) = self.entries.get_mut(&hash) else {
                continue;
            };
            if entry.height.is_some() {
                continue;
            }
            entry.height = Some(height);
            self.by_height.entry(height).or_default().push(hash);

            for child in self.children_of(&hash) {
                pending.push((*child, height + 1));
            }
        }
    }

    /// Index entry of a stored block
    pub fn get(&self, hash: &Hash256) -> Option<&IndexEntry> {
        self.entries.get(hash)
    }

    /// Whether the hash has been indexed
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.entries.contains_key(hash)
    }

    /// Height, once the block connects to genesis
    pub fn height_of(&self, hash: &Hash256) -> Option<u32> {
        self.entries.get(hash).and_then(|entry| entry.height)
    }

    /// Greatest height of any connected block, on any branch
    pub fn max_height(&self) -> Option<u32> {
        self.by_height.keys().next_back().copied()
    }

    /// Every connected block at `height`, in arrival order
    pub fn hashes_at(&self, height: u32) -> &[Hash256] {
        self.by_height.get(&height).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of indexed blocks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known children of `hash`, in arrival order
    pub fn children_of(&self, hash: &Hash256) -> &[Hash256] {
        self.children.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pick the canonical branch among siblings.
    ///
    /// Each sibling starts a counter at its own block; every round all live
    /// counters advance one generation into their subtree. A counter stops
    /// when its subtree has no further generation. The last counter still
    /// advancing wins; counters that stop in the same round leave the branch
    /// stored first as the winner.
    fn select_branch(&self, siblings: &[Hash256]) -> Option<Hash256> {
        let mut live: Vec<(Hash256, Vec<Hash256>)> = siblings
            .iter()
            .filter(|hash| self.height_of(hash).is_some())
            .map(|hash| (*hash, vec![*hash]))
            .collect();
        live.sort_by_key(|(hash, _)| self.entries.get(hash).map(|entry| entry.offset));

        while live.len() > 1 {
            let advanced: Vec<(Hash256, Vec<Hash256>)> = live
                .iter()
                .filter_map(|(branch, generation)| {
                    let next: Vec<Hash256> = generation
                        .iter()
                        .flat_map(|hash| self.children_of(hash).iter().copied())
                        .collect();
                    (!next.is_empty()).then_some((*branch, next))
                })
                .collect();

            if advanced.is_empty() {
                break;
            }
            live = advanced;
        }

        live.first().map(|(branch, _)| *branch)
    }

    /// Canonical chain from genesis to the best tip, choosing at every fork
    /// with the round-robin rule.
    pub fn canonical_chain(&self) -> Vec<Hash256> {
        let mut chain = Vec::new();
        let mut current = Hash256::zero();

        while let Some(next) = self.select_branch(self.children_of(&current)) {
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Last block of the canonical chain
    pub fn best_tip(&self) -> Option<Hash256> {
        self.canonical_chain().last().copied()
    }

    /// Block locator for getblocks: the tip and the nine blocks below it,
    /// then a step that doubles every ten entries, ending at genesis.
    pub fn locator(&self) -> Vec<Hash256> {
        let chain = self.canonical_chain();
        let Some(mut position) = chain.len().checked_sub(1) else {
            return Vec::new();
        };

        let mut locator = Vec::new();
        let mut step = 1;
        loop {
            locator.push(chain[position]);
            if position == 0 {
                break;
            }
            if locator.len() % LOCATOR_DENSE_ENTRIES == 0 {
                step *= 2;
            }
            position = position.saturating_sub(step);
        }
        locator
    }

    /// Canonical hashes following the first locator entry found on the
    /// canonical chain, up to and including `stop`, at most `limit` of them.
    /// With no match the chain is served from genesis.
    pub fn blocks_after(&self, locator: &[Hash256], stop: &Hash256, limit: usize) -> Vec<Hash256> {
        let chain = self.canonical_chain();
        // chain[h] is the canonical block at height h
        let start = locator
            .iter()
            .find_map(|hash| {
                let height = self.height_of(hash)? as usize;
                (chain.get(height) == Some(hash)).then_some(height + 1)
            })
            .unwrap_or(0);

        let mut result = Vec::new();
        for hash in chain.iter().skip(start).take(limit) {
            result.push(*hash);
            if hash == stop {
                break;
            }
        }
        result
    }
}
