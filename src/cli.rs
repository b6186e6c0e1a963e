// CLI commands

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::Hash256;
use crate::error::NodeError;
use crate::network::Node;

#[derive(Parser)]
#[command(name = "chain-verify")]
#[command(about = "Block and transaction verification node", long_about = None)]
pub struct Cli {
    /// Data directory (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show height, best block and block count
    Info,

    /// Feed a file of length-prefixed blocks through the verifier
    Import {
        /// Record file in block store format
        file: PathBuf,
    },

    /// Print the getblocks locator for the best chain
    Locator,

    /// Print a stored block
    Block {
        /// Block hash in display (reversed) hex
        hash: String,
    },
}

/// CLI handler
pub struct CliHandler {
    node: Node,
}

impl CliHandler {
    /// Resolve the config and open the node
    pub fn new(cli: &Cli) -> Result<Self, NodeError> {
        let mut config = match &cli.config {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Config::load(path)?
            }
            None => Config::default(),
        };
        if let Some(data_dir) = &cli.data_dir {
            config.data_dir = data_dir.clone();
        }

        Ok(Self {
            node: Node::open(config)?,
        })
    }

    /// Run one subcommand
    pub async fn handle(&self, command: Commands) -> Result<(), NodeError> {
        match command {
            Commands::Info => self.info().await,
            Commands::Import { file } => self.import(file).await,
            Commands::Locator => self.locator().await,
            Commands::Block { hash } => self.block(&hash).await,
        }
    }

    async fn info(&self) -> Result<(), NodeError> {
        println!("Chain Info:");
        match self.node.height().await {
            Some(height) => println!("  Height: {}", height),
            None => println!("  Height: (empty)"),
        }
        if let Some(hash) = self.node.best_tip().await {
            println!("  Best block: {}", hash);
        }
        println!("  Stored blocks: {}", self.node.block_count().await);
        Ok(())
    }

    async fn import(&self, file: PathBuf) -> Result<(), NodeError> {
        let data = fs::read(&file)?;
        let records = split_records(&data);
        let before = self.node.block_count().await;

        for record in &records {
            self.node.handle_payload("block", record).await;
        }

        let stored = self.node.block_count().await - before;
        println!("Imported {} of {} blocks from {}", stored, records.len(), file.display());
        self.info().await
    }

    async fn locator(&self) -> Result<(), NodeError> {
        for hash in self.node.locator().await {
            println!("{}", hash);
        }
        Ok(())
    }

    async fn block(&self, hash: &str) -> Result<(), NodeError> {
        let hash = Hash256::from_hex(hash)?;
        let Some(block) = self.node.get_block(&hash).await? else {
            println!("Block {} not found", hash);
            return Ok(());
        };

        println!("Block {}", hash);
        println!("  Previous: {}", block.header.prev_block_hash);
        println!("  Merkle root: {}", block.header.merkle_root);
        println!("  Timestamp: {}", block.header.timestamp);
        println!("  Bits: {:#010x}", block.header.bits);
        println!("  Nonce: {}", block.header.nonce);
        println!("  Transactions: {}", block.transactions.len());
        for tx in &block.transactions {
            println!("    {}", tx.txid());
        }
        Ok(())
    }
}

/// Split `(u64 LE length, bytes)` records; a torn last record is dropped.
fn split_records(data: &[u8]) -> Vec<&[u8]> {
    let mut records = Vec::new();
    let mut rest = data;

    while let Some((prefix, tail)) = rest.split_first_chunk::<8>() {
        let len = u64::from_le_bytes(*prefix) as usize;
        let Some(record) = tail.get(..len) else {
            log::warn!("Ignoring torn record of {} bytes at end of import", tail.len());
            break;
        };
        records.push(record);
        rest = &tail[len..];
    }
    records
}
