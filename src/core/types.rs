// Identifier types shared by blocks, transactions and the chain index

use std::fmt;

use super::serialize::CodecError;

/// 256-bit hash in digest byte order.
///
/// Block hashes, transaction ids and merkle roots are all stored the way the
/// hash function emits them; the conventional hex form is byte-reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| CodecError::BadLength { expected: 32, got: slice.len() })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero hash; parent of every genesis block.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Big-endian view of the hash read as a little-endian 256-bit integer.
    /// Comparing these arrays lexicographically compares the integers.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut reversed = self.0;
        reversed.reverse();
        reversed
    }

    pub fn from_be_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Hex in display order (reversed)
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    /// Parse display-order hex
    pub fn from_hex(hex_str: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_str).map_err(|e| CodecError::BadHex(e.to_string()))?;
        let display: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CodecError::BadLength { expected: 32, got: bytes.len() })?;
        Ok(Self::from_be_bytes(display))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Reference to one output of an earlier transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Sentinel used by coinbase inputs: zero hash, all-ones index.
    pub fn null() -> Self {
        Self {
            txid: Hash256::zero(),
            vout: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == u32::MAX
    }
}
