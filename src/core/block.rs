// Block data structures

use std::io::{Cursor, Read};

use super::serialize::{
    read_hash, read_u32_le, read_varint, write_varint, CodecError, Serializable,
};
use crate::core::{hash256, Hash256, Transaction};

/// Serialized header size
pub const HEADER_SIZE: usize = 80;

/// Block header - 80 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    /// Hash of the parent block, zero for genesis
    pub prev_block_hash: Hash256,
    pub merkle_root: Hash256,
    /// Unix seconds
    pub timestamp: u32,
    /// Difficulty target in compact form
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn new(
        version: u32,
        prev_block_hash: Hash256,
        merkle_root: Hash256,
        timestamp: u32,
        bits: u32,
        nonce: u32,
    ) -> Self {
        Self {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
        }
    }

    /// Block identity: double SHA256 of the 80 header bytes
    pub fn hash(&self) -> Hash256 {
        hash256(&self.to_bytes())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..36].copy_from_slice(self.prev_block_hash.as_bytes());
        buf[36..68].copy_from_slice(self.merkle_root.as_bytes());
        buf[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[72..76].copy_from_slice(&self.bits.to_le_bytes());
        buf[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        Ok(Self {
            version: read_u32_le(reader)?,
            prev_block_hash: read_hash(reader)?,
            merkle_root: read_hash(reader)?,
            timestamp: read_u32_le(reader)?,
            bits: read_u32_le(reader)?,
            nonce: read_u32_le(reader)?,
        })
    }
}

impl Serializable for BlockHeader {
    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != HEADER_SIZE {
            return Err(CodecError::BadLength {
                expected: HEADER_SIZE,
                got: data.len(),
            });
        }
        Self::read_from(&mut Cursor::new(data))
    }
}

/// Block - header plus ordered transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// Build an unmined block on `prev` with the merkle root filled in.
    pub fn assemble(prev: Hash256, transactions: Vec<Transaction>, timestamp: u32, bits: u32) -> Self {
        let merkle_root = Self::calculate_merkle_root(&transactions);
        Self {
            header: BlockHeader::new(1, prev, merkle_root, timestamp, bits, 0),
            transactions,
        }
    }

    /// Merkle root over transaction ids; an odd level repeats its last hash.
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Hash256 {
        if transactions.is_empty() {
            return Hash256::zero();
        }

        let mut hashes: Vec<Hash256> = transactions.iter().map(|tx| tx.txid()).collect();

        while hashes.len() > 1 {
            hashes = hashes
                .chunks(2)
                .map(|pair| {
                    let left = pair[0];
                    let right = pair.get(1).copied().unwrap_or(left);
                    let mut combined = [0u8; 64];
                    combined[..32].copy_from_slice(left.as_bytes());
                    combined[32..].copy_from_slice(right.as_bytes());
                    hash256(&combined)
                })
                .collect();
        }

        hashes[0]
    }

    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn prev_hash(&self) -> Hash256 {
        self.header.prev_block_hash
    }

    /// Whether the block builds on the zero hash
    pub fn is_genesis(&self) -> bool {
        self.header.prev_block_hash.is_zero()
    }

    /// First transaction, which the block rules require to be the coinbase
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }
}

impl Serializable for Block {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = self.header.serialize();
        write_varint(&mut buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.write_to(&mut buf);
        }
        buf
    }

    fn deserialize(data: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(data);
        let header = BlockHeader::read_from(&mut cursor)?;

        let tx_count = read_varint(&mut cursor)?;
        let mut transactions = Vec::new();
        for _ in 0..tx_count {
            transactions.push(Transaction::read_from(&mut cursor)?);
        }

        let trailing = data.len() - cursor.position() as usize;
        if trailing != 0 {
            return Err(CodecError::TrailingBytes(trailing));
        }

        Ok(Self {
            header,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutPoint, TxInput, TxOutput};

    fn coinbase(tag: u8) -> Transaction {
        Transaction::coinbase(vec![tag, tag], TxOutput::new(5_000_000_000, vec![0x51]))
    }

    #[test]
    fn test_block_header_serialization() {
        let header = BlockHeader::new(
            1,
            Hash256::new([3; 32]),
            Hash256::new([4; 32]),
            1234567890,
            0x1d00ffff,
            99,
        );

        let serialized = header.serialize();
        assert_eq!(serialized.len(), HEADER_SIZE);
        assert_eq!(&serialized[4..36], &[3; 32]);
        assert_eq!(&serialized[72..76], &0x1d00ffffu32.to_le_bytes());

        let deserialized = BlockHeader::deserialize(&serialized).unwrap();
        assert_eq!(header, deserialized);
    }

    #[test]
    fn test_header_wrong_length() {
        assert!(matches!(
            BlockHeader::deserialize(&[0u8; 79]),
            Err(CodecError::BadLength {
                expected: 80,
                got: 79
            })
        ));
    }

    #[test]
    fn test_block_hash_is_header_hash() {
        let block = Block::assemble(Hash256::zero(), vec![coinbase(1)], 1_600_000_000, 0x207fffff);
        assert_eq!(block.hash(), hash256(&block.header.serialize()));
        assert!(block.is_genesis());
    }

    #[test]
    fn test_block_roundtrip() {
        let spend = Transaction::new(
            vec![TxInput::new(OutPoint::new(Hash256::new([9; 32]), 1), vec![0xaa; 100])],
            vec![TxOutput::new(10, vec![]), TxOutput::new(20, vec![0x76])],
        );
        let block = Block::assemble(Hash256::new([1; 32]), vec![coinbase(2), spend], 1_600_000_000, 0x207fffff);

        let bytes = block.serialize();
        let decoded = Block::deserialize(&bytes).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.serialize(), bytes);
    }

    #[test]
    fn test_block_rejects_trailing_and_truncated() {
        let bytes = Block::assemble(Hash256::zero(), vec![coinbase(1)], 0, 0x207fffff).serialize();

        let mut extended = bytes.clone();
        extended.extend_from_slice(&[0, 0]);
        assert!(matches!(
            Block::deserialize(&extended),
            Err(CodecError::TrailingBytes(2))
        ));
        assert!(Block::deserialize(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn test_merkle_root_single_tx() {
        let tx = coinbase(5);
        assert_eq!(Block::calculate_merkle_root(&[tx.clone()]), tx.txid());
    }

    #[test]
    fn test_merkle_root_odd_level_duplicates_last() {
        let (a, b, c) = (coinbase(1), coinbase(2), coinbase(3));

        let pair = |l: Hash256, r: Hash256| {
            let mut buf = l.as_bytes().to_vec();
            buf.extend_from_slice(r.as_bytes());
            hash256(&buf)
        };
        let expected = pair(pair(a.txid(), b.txid()), pair(c.txid(), c.txid()));

        assert_eq!(Block::calculate_merkle_root(&[a, b, c]), expected);
    }
}
