// Append-only block file with an in-memory chain index

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use super::chain_index::ChainIndex;
use super::StoreError;
use crate::core::{Block, BlockHeader, Hash256, Serializable, HEADER_SIZE};

/// Bytes in a record's length prefix
const LENGTH_PREFIX: u64 = 8;

/// Block storage backed by one flat file of `(u64 LE length, raw block)`
/// records. The index is rebuilt from the headers on open.
pub struct BlockStore {
    path: PathBuf,
    file: File,
    /// End of the last complete record
    end: u64,
    index: ChainIndex,
}

impl BlockStore {
    /// Open or create the block file and index every complete record.
    ///
    /// A torn record at the end of the file is cut off.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let mut index = ChainIndex::new();
        let end = Self::scan(&path, file_len, &mut index)?;

        if end < file_len {
            warn!(
                "Truncating {} torn bytes at offset {} of {}",
                file_len - end,
                end,
                path.display()
            );
            file.set_len(end)?;
        }

        info!(
            "Opened block store {} ({} blocks, height {:?})",
            path.display(),
            index.len(),
            index.max_height()
        );

        Ok(Self {
            path,
            file,
            end,
            index,
        })
    }

    /// Walk the record headers. Returns the offset just past the last
    /// complete record.
    fn scan(path: &Path, file_len: u64, index: &mut ChainIndex) -> Result<u64, StoreError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut offset = 0u64;

        while offset + LENGTH_PREFIX <= file_len {
            let mut len_bytes = [0u8; 8];
            reader.read_exact(&mut len_bytes)?;
            let len = u64::from_le_bytes(len_bytes);

            let body_start = offset + LENGTH_PREFIX;
            if len < HEADER_SIZE as u64 || len > file_len - body_start {
                break;
            }

            let mut header_bytes = [0u8; HEADER_SIZE];
            reader.read_exact(&mut header_bytes)?;
            let header = BlockHeader::deserialize(&header_bytes)?;
            reader.seek_relative((len - HEADER_SIZE as u64) as i64)?;

            index.insert(header.hash(), header.prev_block_hash, offset);
            offset = body_start + len;
        }

        Ok(offset)
    }

    /// Store a raw block. Returns false without touching the file or index
    /// if the block is already stored.
    pub fn add_block(&mut self, raw: &[u8]) -> Result<bool, StoreError> {
        let header_bytes = raw.get(..HEADER_SIZE).ok_or(StoreError::ShortRecord(raw.len()))?;
        let header = BlockHeader::deserialize(header_bytes)?;
        let hash = header.hash();

        if self.index.contains(&hash) {
            debug!("Block {} already stored", hash);
            return Ok(false);
        }

        let offset = self.end;
        let mut record = Vec::with_capacity(raw.len() + LENGTH_PREFIX as usize);
        record.extend_from_slice(&(raw.len() as u64).to_le_bytes());
        record.extend_from_slice(raw);
        self.append_record(&record)?;
        self.end += record.len() as u64;

        self.index.insert(hash, header.prev_block_hash, offset);
        debug!(
            "Stored block {} at offset {} (height {:?})",
            hash,
            offset,
            self.index.height_of(&hash)
        );
        Ok(true)
    }

    /// Append one record at `self.end`. Bytes past `self.end`, left by an
    /// earlier failed append, are cut off first, and a failed write is cut
    /// back off so the file always ends on a record boundary.
    fn append_record(&mut self, record: &[u8]) -> io::Result<()> {
        let on_disk = self.file.metadata()?.len();
        if on_disk != self.end {
            warn!(
                "Block file {} is {} bytes, expected {}; truncating",
                self.path.display(),
                on_disk,
                self.end
            );
            self.file.set_len(self.end)?;
        }

        let written = self.file.write_all(record).and_then(|()| self.file.flush());
        if let Err(e) = written {
            if let Err(rollback) = self.file.set_len(self.end) {
                error!("Failed to roll back partial record in {}: {}", self.path.display(), rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Raw bytes of a stored block, read through a separate handle
    pub fn get_raw_block(&self, hash: &Hash256) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(entry) = self.index.get(hash) else {
            return Ok(None);
        };

        let mut reader = File::open(&self.path)?;
        reader.seek(SeekFrom::Start(entry.offset))?;
        let mut len_bytes = [0u8; 8];
        reader.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        let mut raw = Vec::new();
        reader.take(len).read_to_end(&mut raw)?;
        if (raw.len() as u64) < len {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("record for {} is truncated", hash),
            )));
        }
        Ok(Some(raw))
    }

    /// Decoded stored block
    pub fn get_block(&self, hash: &Hash256) -> Result<Option<Block>, StoreError> {
        match self.get_raw_block(hash)? {
            Some(raw) => Ok(Some(Block::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Whether the block is stored, connected or not
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.index.contains(hash)
    }

    /// Height of a connected block
    pub fn height_of(&self, hash: &Hash256) -> Option<u32> {
        self.index.height_of(hash)
    }

    /// Greatest height on any branch
    pub fn max_height(&self) -> Option<u32> {
        self.index.max_height()
    }

    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Tip of the canonical chain
    pub fn best_tip(&self) -> Option<Hash256> {
        self.index.best_tip()
    }

    /// Canonical chain, genesis first
    pub fn canonical_chain(&self) -> Vec<Hash256> {
        self.index.canonical_chain()
    }

    /// Locator hashes for an outgoing getblocks
    pub fn set_for_getblocks(&self) -> Vec<Hash256> {
        self.index.locator()
    }

    /// The chain index built over the file
    pub fn index(&self) -> &ChainIndex {
        &self.index
    }
}
