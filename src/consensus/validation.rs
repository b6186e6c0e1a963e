// Context-free block validation

use thiserror::Error;

use crate::consensus::pow::Target;
use crate::core::{Block, BlockHeader, Hash256, Transaction, MAX_MONEY};

/// Default allowance for block timestamps ahead of the local clock
pub const MAX_FUTURE_BLOCK_TIME: u32 = 2 * 60 * 60;

/// Accepted coinbase unlocking script sizes
pub const COINBASE_SCRIPT_MIN: usize = 2;
pub const COINBASE_SCRIPT_MAX: usize = 100;

/// A block broke a consensus rule and will not be stored
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block has no transactions")]
    NoTransactions,

    #[error("target bits {0:#010x} overflow 256 bits")]
    TargetOverflow(u32),

    #[error("block hash {0} does not meet its target")]
    InvalidProofOfWork(Hash256),

    #[error("block timestamp {timestamp} is after {limit}")]
    InvalidTimestamp { timestamp: u32, limit: u32 },

    #[error("first transaction is not a coinbase")]
    MissingCoinbase,

    #[error("coinbase script is {0} bytes, expected 2..=100")]
    BadCoinbaseLength(usize),

    #[error("transaction {0} spends the null outpoint outside the coinbase")]
    NullPrevout(usize),

    #[error("transaction {0} has no inputs or outputs")]
    EmptyTransaction(usize),

    #[error("transaction {0} output value out of range")]
    OutputValueOutOfRange(usize),

    #[error("transaction {0} total output exceeds the money supply")]
    OutputValueExceedsMax(usize),

    #[error("merkle root mismatch: header {header}, computed {computed}")]
    InvalidMerkleRoot { header: Hash256, computed: Hash256 },
}

/// Block checks that need nothing beyond the block itself and a clock
pub struct BlockValidator {
    /// Seconds a timestamp may run ahead of `now`
    max_future_drift: u32,
}

impl Default for BlockValidator {
    fn default() -> Self {
        Self::new(MAX_FUTURE_BLOCK_TIME)
    }
}

impl BlockValidator {
    pub fn new(max_future_drift: u32) -> Self {
        Self { max_future_drift }
    }

    /// Run every block rule in order; the first violation is returned.
    pub fn check_rules(&self, block: &Block, now: u32) -> Result<(), ValidationError> {
        let coinbase = block.coinbase().ok_or(ValidationError::NoTransactions)?;

        self.validate_header(&block.header, now)?;
        self.validate_coinbase(coinbase)?;

        for (index, tx) in block.transactions.iter().enumerate().skip(1) {
            if tx.inputs.iter().any(|input| input.is_coinbase()) {
                return Err(ValidationError::NullPrevout(index));
            }
        }

        for (index, tx) in block.transactions.iter().enumerate() {
            self.validate_transaction(index, tx)?;
        }

        let computed = Block::calculate_merkle_root(&block.transactions);
        if computed != block.header.merkle_root {
            return Err(ValidationError::InvalidMerkleRoot {
                header: block.header.merkle_root,
                computed,
            });
        }

        Ok(())
    }

    /// Proof of work and timestamp
    pub fn validate_header(&self, header: &BlockHeader, now: u32) -> Result<(), ValidationError> {
        let target = Target::from_bits(header.bits);
        if target.to_be_bytes().is_none() {
            return Err(ValidationError::TargetOverflow(header.bits));
        }
        let hash = header.hash();
        if !target.is_met_by(&hash) {
            return Err(ValidationError::InvalidProofOfWork(hash));
        }

        let limit = now.saturating_add(self.max_future_drift);
        if header.timestamp > limit {
            return Err(ValidationError::InvalidTimestamp {
                timestamp: header.timestamp,
                limit,
            });
        }

        Ok(())
    }

    fn validate_coinbase(&self, tx: &Transaction) -> Result<(), ValidationError> {
        if !tx.is_coinbase() {
            return Err(ValidationError::MissingCoinbase);
        }
        let script_len = tx.inputs[0].script_sig.len();
        if !(COINBASE_SCRIPT_MIN..=COINBASE_SCRIPT_MAX).contains(&script_len) {
            return Err(ValidationError::BadCoinbaseLength(script_len));
        }
        Ok(())
    }

    /// Structure and value range of one transaction
    pub fn validate_transaction(&self, index: usize, tx: &Transaction) -> Result<(), ValidationError> {
        if tx.inputs.is_empty() || tx.outputs.is_empty() {
            return Err(ValidationError::EmptyTransaction(index));
        }

        if tx.outputs.iter().any(|output| output.value > MAX_MONEY) {
            return Err(ValidationError::OutputValueOutOfRange(index));
        }

        match tx.total_output_value() {
            Some(total) if total <= MAX_MONEY => Ok(()),
            _ => Err(ValidationError::OutputValueExceedsMax(index)),
        }
    }
}
