// Verification driver: block intake, orphans and outstanding requests

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};

use super::message::{InvItem, InvType, Message, MessageType, PROTOCOL_VERSION};
use super::orphans::OrphanPool;
use crate::config::Config;
use crate::consensus::{BlockValidator, ValidationError};
use crate::core::{Block, Hash256, Serializable, Transaction};
use crate::error::NodeError;
use crate::storage::BlockStore;

/// Most block hashes returned for one getblocks
pub const MAX_GETBLOCKS_REPLY: usize = 500;

/// What happened to a block handed to the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Stored; `connected` parked descendants were stored after it
    Accepted {
        hash: Hash256,
        height: Option<u32>,
        connected: usize,
    },
    /// Already stored or parked
    Duplicate(Hash256),
    /// Parked until `missing` arrives
    Orphan { hash: Hash256, missing: Hash256 },
}

/// Owns the block store and everything needed to feed it from peers.
///
/// Not thread safe on its own; `Node` serializes access.
pub struct Driver {
    store: BlockStore,
    validator: BlockValidator,
    orphans: OrphanPool,
    /// Announced but not yet requested, oldest first
    wanted: VecDeque<InvItem>,
    /// Members of `wanted`
    wanted_set: HashSet<InvItem>,
    max_wanted: usize,
    /// Requested, with the deadline for an answer
    in_flight: HashMap<InvItem, Instant>,
    seen_txs: HashSet<Hash256>,
    /// Insertion order of `seen_txs`
    seen_order: VecDeque<Hash256>,
    max_seen_txs: usize,
    request_timeout: Duration,
    batch_size: usize,
}

impl Driver {
    /// Open the block store under the configured data directory
    pub fn open(config: &Config) -> Result<Self, NodeError> {
        fs::create_dir_all(&config.data_dir)?;
        let store = BlockStore::open(config.block_path())?;
        Ok(Self::new(store, config))
    }

    pub fn new(store: BlockStore, config: &Config) -> Self {
        Self {
            store,
            validator: BlockValidator::new(config.max_future_drift_secs),
            orphans: OrphanPool::new(config.max_orphans, config.orphan_ttl()),
            wanted: VecDeque::new(),
            wanted_set: HashSet::new(),
            max_wanted: config.max_wanted.max(1),
            in_flight: HashMap::new(),
            seen_txs: HashSet::new(),
            seen_order: VecDeque::new(),
            max_seen_txs: config.max_seen_txs.max(1),
            request_timeout: config.request_timeout(),
            batch_size: config.getdata_batch.max(1),
        }
    }

    /// The block store fed by this driver
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Process one inbound payload and return the messages to send back
    pub fn handle_payload(&mut self, kind: MessageType, payload: &[u8]) -> Result<Vec<Message>, NodeError> {
        debug!("Handling {} ({} bytes)", kind, payload.len());

        match kind {
            MessageType::Block => {
                let outcome = self.add_block(payload)?;
                let mut replies = Vec::new();
                if let BlockOutcome::Orphan { .. } = outcome {
                    replies.push(self.build_getblocks());
                }
                replies.extend(self.next_getdata());
                Ok(replies)
            }
            MessageType::Tx => {
                self.add_transaction(&Transaction::deserialize(payload)?)?;
                Ok(Vec::new())
            }
            _ => match Message::decode(kind, payload)? {
                Message::Inv(items) => {
                    let fresh = items
                        .iter()
                        .filter(|item| self.add_inventory(item.inv_type, item.hash))
                        .count();
                    debug!("Inventory of {} items, {} new", items.len(), fresh);
                    Ok(self.next_getdata().into_iter().collect())
                }
                Message::GetData(items) => self.serve_getdata(&items),
                Message::GetBlocks { locator, stop, .. } => {
                    Ok(self.serve_getblocks(&locator, &stop).into_iter().collect())
                }
                Message::Block(_) | Message::Tx(_) => Ok(Vec::new()),
            },
        }
    }

    /// Validate and store a raw block, parking it if its parent is unknown.
    ///
    /// A block that fails the block rules is returned as an error and not
    /// stored.
    pub fn add_block(&mut self, payload: &[u8]) -> Result<BlockOutcome, NodeError> {
        let block = Block::deserialize(payload)?;
        let hash = block.hash();
        self.received(&InvItem::block(hash));

        if self.store.contains(&hash) || self.orphans.contains(&hash) {
            debug!("Block {} already known", hash);
            return Ok(BlockOutcome::Duplicate(hash));
        }

        if let Err(e) = self.validator.check_rules(&block, unix_now()) {
            warn!("Rejected block {}: {}", hash, e);
            return Err(e.into());
        }

        let parent = block.prev_hash();
        if !block.is_genesis() && !self.store.contains(&parent) {
            self.orphans.insert(hash, parent, payload.to_vec(), Instant::now());
            let missing = self.orphans.missing_root(&hash);
            debug!("Parked orphan block {} waiting on {}", hash, missing);
            return Ok(BlockOutcome::Orphan { hash, missing });
        }

        self.store.add_block(payload)?;
        let connected = self.connect_orphans(hash);
        let height = self.store.height_of(&hash);
        info!(
            "Accepted block {} at height {:?} ({} orphans connected)",
            hash, height, connected
        );

        Ok(BlockOutcome::Accepted {
            hash,
            height,
            connected,
        })
    }

    /// Store every parked descendant of `root`, depth first
    fn connect_orphans(&mut self, root: Hash256) -> usize {
        let mut connected = 0;
        let mut ready = vec![root];

        while let Some(parent) = ready.pop() {
            for (hash, raw) in self.orphans.take_children(&parent) {
                match self.store.add_block(&raw) {
                    Ok(_) => {
                        connected += 1;
                        ready.push(hash);
                    }
                    Err(e) => error!("Failed to store orphan block {}: {}", hash, e),
                }
            }
        }
        connected
    }

    /// Structural checks on a loose transaction. There is no mempool, so an
    /// accepted transaction is only remembered as seen.
    pub fn add_transaction(&mut self, tx: &Transaction) -> Result<(), NodeError> {
        let txid = tx.txid();
        self.received(&InvItem::tx(txid));

        if tx.is_coinbase() {
            return Err(ValidationError::NullPrevout(0).into());
        }
        self.validator.validate_transaction(0, tx)?;

        self.remember_tx(txid);
        debug!("Transaction {} passed structural checks", txid);
        Ok(())
    }

    /// Remember a txid, forgetting the oldest once `max_seen_txs` is reached
    fn remember_tx(&mut self, txid: Hash256) {
        if !self.seen_txs.insert(txid) {
            return;
        }
        self.seen_order.push_back(txid);
        while self.seen_order.len() > self.max_seen_txs {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen_txs.remove(&oldest);
            }
        }
    }

    /// Queue an announced object for fetching. Returns false if it is
    /// already stored, queued or requested, or if the queue is full.
    pub fn add_inventory(&mut self, inv_type: InvType, hash: Hash256) -> bool {
        let item = InvItem::new(inv_type, hash);
        let have = match inv_type {
            InvType::Block => self.store.contains(&hash) || self.orphans.contains(&hash),
            InvType::Tx => self.seen_txs.contains(&hash),
        };
        if have || self.in_flight.contains_key(&item) || self.wanted_set.contains(&item) {
            return false;
        }
        if self.wanted.len() >= self.max_wanted {
            debug!("Request queue full, ignoring {:?} {}", inv_type, hash);
            return false;
        }

        self.enqueue_back(item);
        true
    }

    fn enqueue_back(&mut self, item: InvItem) {
        if self.wanted_set.insert(item) {
            self.wanted.push_back(item);
        }
    }

    fn enqueue_front(&mut self, item: InvItem) {
        if self.wanted_set.insert(item) {
            self.wanted.push_front(item);
        }
    }

    /// getblocks carrying the locator of the current best chain
    pub fn build_getblocks(&self) -> Message {
        Message::GetBlocks {
            version: PROTOCOL_VERSION,
            locator: self.store.set_for_getblocks(),
            stop: Hash256::zero(),
        }
    }

    /// Request up to one batch of `items`, marking them in flight. Items past
    /// the batch go back to the front of the queue.
    pub fn build_getdata(&mut self, mut items: Vec<InvItem>) -> Option<Message> {
        if items.is_empty() {
            return None;
        }

        if items.len() > self.batch_size {
            let overflow: Vec<InvItem> = items.drain(self.batch_size..).collect();
            for item in overflow.into_iter().rev() {
                self.enqueue_front(item);
            }
        }

        let deadline = Instant::now() + self.request_timeout;
        for item in &items {
            self.in_flight.insert(*item, deadline);
        }
        Some(Message::GetData(items))
    }

    /// Next batch from the queue, after re-queueing expired requests.
    /// Nothing is sent while `max_wanted` requests are outstanding.
    pub fn next_getdata(&mut self) -> Option<Message> {
        self.expire_requests(Instant::now());
        let room = self.max_wanted.saturating_sub(self.in_flight.len());
        let count = self.wanted.len().min(self.batch_size).min(room);
        let batch: Vec<InvItem> = self.wanted.drain(..count).collect();
        for item in &batch {
            self.wanted_set.remove(item);
        }
        self.build_getdata(batch)
    }

    /// Move requests whose deadline has passed back to the queue
    pub fn expire_requests(&mut self, now: Instant) -> usize {
        let expired: Vec<InvItem> = self
            .in_flight
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(item, _)| *item)
            .collect();

        for item in &expired {
            self.in_flight.remove(item);
            warn!("Request for {:?} {} timed out, re-queued", item.inv_type, item.hash);
            self.enqueue_back(*item);
        }
        expired.len()
    }

    /// Periodic housekeeping: drop stale orphans, retry expired requests
    pub fn maintain(&mut self, now: Instant) -> Option<Message> {
        let expired = self.orphans.expire(now);
        if expired > 0 {
            debug!("{} orphan blocks expired", expired);
        }
        self.expire_requests(now);
        self.next_getdata()
    }

    fn received(&mut self, item: &InvItem) {
        self.in_flight.remove(item);
        if self.wanted_set.remove(item) {
            self.wanted.retain(|queued| queued != item);
        }
    }

    /// Blocks we hold for a peer's getdata. Unknown items are skipped.
    pub fn serve_getdata(&self, items: &[InvItem]) -> Result<Vec<Message>, NodeError> {
        let mut replies = Vec::new();
        for item in items {
            if item.inv_type != InvType::Block {
                continue;
            }
            match self.store.get_block(&item.hash)? {
                Some(block) => replies.push(Message::Block(block)),
                None => debug!("Peer asked for unknown block {}", item.hash),
            }
        }
        Ok(replies)
    }

    /// Inventory of canonical blocks past the peer's locator
    pub fn serve_getblocks(&self, locator: &[Hash256], stop: &Hash256) -> Option<Message> {
        let hashes = self
            .store
            .index()
            .blocks_after(locator, stop, MAX_GETBLOCKS_REPLY);
        if hashes.is_empty() {
            return None;
        }
        Some(Message::Inv(hashes.into_iter().map(InvItem::block).collect()))
    }

    /// Blocks parked waiting for a parent
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Requests sent and not yet answered
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Announced items not yet requested
    pub fn wanted_count(&self) -> usize {
        self.wanted.len()
    }
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or_default()
}
