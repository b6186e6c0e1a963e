// Node - single-writer async front for the verification driver

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::driver::Driver;
use super::message::{Message, MessageType};
use crate::config::Config;
use crate::core::{Block, Hash256};
use crate::error::NodeError;

/// Shared handle to one driver. Every payload is processed start to finish
/// under the driver lock, so index updates and file appends never interleave.
#[derive(Clone)]
pub struct Node {
    driver: Arc<Mutex<Driver>>,
    config: Config,
}

impl Node {
    pub fn new(driver: Driver, config: Config) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            config,
        }
    }

    /// Open the driver's block store from `config`
    pub fn open(config: Config) -> Result<Self, NodeError> {
        let driver = Driver::open(&config)?;
        Ok(Self::new(driver, config))
    }

    /// Feed one inbound payload through the driver.
    ///
    /// Errors are logged and swallowed: a bad message from a peer yields no
    /// replies and leaves the node running.
    pub async fn handle_payload(&self, command: &str, payload: &[u8]) -> Vec<Message> {
        let kind = match MessageType::from_command(command) {
            Ok(kind) => kind,
            Err(e) => {
                log::warn!("Ignoring message: {}", e);
                return Vec::new();
            }
        };

        let mut driver = self.driver.lock().await;
        match driver.handle_payload(kind, payload) {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!("Dropped {} message: {}", kind, e);
                Vec::new()
            }
        }
    }

    /// One round of housekeeping; returns a getdata if anything is due
    pub async fn maintain(&self) -> Option<Message> {
        self.driver.lock().await.maintain(Instant::now())
    }

    /// Run `maintain` on the configured interval, sending requests to
    /// `outbound`. Stops when the receiver is dropped.
    pub fn spawn_maintenance(&self, outbound: mpsc::Sender<Message>) -> JoinHandle<()> {
        let node = self.clone();
        let period = self.config.maintenance_interval().max(Duration::from_millis(100));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Some(request) = node.maintain().await {
                    if outbound.send(request).await.is_err() {
                        log::debug!("Outbound channel closed, stopping maintenance");
                        break;
                    }
                }
            }
        })
    }

    /// getblocks for the current best chain
    pub async fn getblocks(&self) -> Message {
        self.driver.lock().await.build_getblocks()
    }

    /// Tip of the canonical chain
    pub async fn best_tip(&self) -> Option<Hash256> {
        self.driver.lock().await.store().best_tip()
    }

    /// Greatest stored height
    pub async fn height(&self) -> Option<u32> {
        self.driver.lock().await.store().max_height()
    }

    /// Number of stored blocks, connected or not
    pub async fn block_count(&self) -> usize {
        self.driver.lock().await.store().len()
    }

    /// Locator of the canonical chain
    pub async fn locator(&self) -> Vec<Hash256> {
        self.driver.lock().await.store().set_for_getblocks()
    }

    /// Read a stored block
    pub async fn get_block(&self, hash: &Hash256) -> Result<Option<Block>, NodeError> {
        Ok(self.driver.lock().await.store().get_block(hash)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
