// Top-level error type

use std::io;

use thiserror::Error;

use crate::consensus::ValidationError;
use crate::core::{CodecError, VerifyError};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("decode failed: {0}")]
    Codec(#[from] CodecError),

    #[error("block rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("transaction rejected: {0}")]
    Verify(#[from] VerifyError),

    #[error("block store: {0}")]
    Store(#[from] StoreError),

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O: {0}")]
    Io(#[from] io::Error),
}
