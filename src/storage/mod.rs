// Storage layer: block file and chain index

mod block_store;
mod chain_index;

pub use block_store::BlockStore;
pub use chain_index::{ChainIndex, IndexEntry};

use std::io;

use thiserror::Error;

use crate::core::CodecError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("block file I/O: {0}")]
    Io(#[from] io::Error),

    #[error("stored block does not decode: {0}")]
    Codec(#[from] CodecError),

    #[error("record of {0} bytes is shorter than a block header")]
    ShortRecord(usize),
}
