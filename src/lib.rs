// Validation core of a block-chain node: wire codec, script engine,
// consensus checks, block store and the verification driver

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod network;
pub mod script;
pub mod storage;

// Re-exports for convenience
pub use cli::{Cli, CliHandler, Commands};
pub use config::Config;
pub use consensus::{BlockValidator, Miner, Target, ValidationError};
pub use core::{Block, BlockHeader, Hash256, OutPoint, Transaction, TxInput, TxOutput};
pub use error::NodeError;
pub use network::{Driver, Message, Node};
pub use script::{Script, ScriptError};
pub use storage::{BlockStore, StoreError};
