// Payload codec for the messages the verification driver exchanges

use std::fmt;
use std::io::Cursor;

use crate::core::{
    read_hash, read_u32_le, read_varint, write_varint, Block, CodecError, Hash256, Serializable,
    Transaction,
};

/// Protocol version carried in getblocks
pub const PROTOCOL_VERSION: u32 = 1;

/// Most hashes accepted in a getblocks locator
pub const MAX_LOCATOR_ENTRIES: usize = 101;

/// Most items accepted in one inv or getdata
pub const MAX_INV_ENTRIES: usize = 50_000;

/// Commands handled by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Inv,
    GetData,
    Block,
    Tx,
    GetBlocks,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Inv => "inv",
            MessageType::GetData => "getdata",
            MessageType::Block => "block",
            MessageType::Tx => "tx",
            MessageType::GetBlocks => "getblocks",
        }
    }

    pub fn from_command(command: &str) -> Result<Self, CodecError> {
        match command {
            "inv" => Ok(MessageType::Inv),
            "getdata" => Ok(MessageType::GetData),
            "block" => Ok(MessageType::Block),
            "tx" => Ok(MessageType::Tx),
            "getblocks" => Ok(MessageType::GetBlocks),
            other => Err(CodecError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inventory type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvType {
    Tx,
    Block,
}

impl InvType {
    pub fn to_u32(self) -> u32 {
        match self {
            InvType::Tx => 1,
            InvType::Block => 2,
        }
    }

    pub fn from_u32(value: u32) -> Result<Self, CodecError> {
        match value {
            1 => Ok(InvType::Tx),
            2 => Ok(InvType::Block),
            other => Err(CodecError::UnknownInvType(other)),
        }
    }
}

/// One announced or requested object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvItem {
    pub inv_type: InvType,
    pub hash: Hash256,
}

impl InvItem {
    pub fn new(inv_type: InvType, hash: Hash256) -> Self {
        Self { inv_type, hash }
    }

    pub fn block(hash: Hash256) -> Self {
        Self::new(InvType::Block, hash)
    }

    pub fn tx(hash: Hash256) -> Self {
        Self::new(InvType::Tx, hash)
    }
}

/// Decoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Inv(Vec<InvItem>),
    GetData(Vec<InvItem>),
    Block(Block),
    Tx(Transaction),
    GetBlocks {
        version: u32,
        locator: Vec<Hash256>,
        /// Zero for "as many as allowed"
        stop: Hash256,
    },
}

impl Message {
    /// Wire payload, without any command or length framing
    pub fn serialize_payload(&self) -> Vec<u8> {
        match self {
            Message::Inv(items) | Message::GetData(items) => {
                let mut bytes = Vec::new();
                write_varint(&mut bytes, items.len() as u64);
                for item in items {
                    bytes.extend_from_slice(&item.inv_type.to_u32().to_le_bytes());
                    bytes.extend_from_slice(item.hash.as_bytes());
                }
                bytes
            }
            Message::Block(block) => block.serialize(),
            Message::Tx(tx) => tx.serialize(),
            Message::GetBlocks {
                version,
                locator,
                stop,
            } => {
                let mut bytes = version.to_le_bytes().to_vec();
                write_varint(&mut bytes, locator.len() as u64);
                for hash in locator {
                    bytes.extend_from_slice(hash.as_bytes());
                }
                bytes.extend_from_slice(stop.as_bytes());
                bytes
            }
        }
    }

    /// Decode a payload of the given type; the payload must be consumed
    /// exactly.
    pub fn decode(kind: MessageType, payload: &[u8]) -> Result<Self, CodecError> {
        match kind {
            MessageType::Block => Ok(Message::Block(Block::deserialize(payload)?)),
            MessageType::Tx => Ok(Message::Tx(Transaction::deserialize(payload)?)),
            MessageType::Inv => Ok(Message::Inv(decode_inventory(payload)?)),
            MessageType::GetData => Ok(Message::GetData(decode_inventory(payload)?)),
            MessageType::GetBlocks => {
                let mut cursor = Cursor::new(payload);
                let version = read_u32_le(&mut cursor)?;
                let count = read_count(&mut cursor, MAX_LOCATOR_ENTRIES)?;
                let mut locator = Vec::new();
                for _ in 0..count {
                    locator.push(read_hash(&mut cursor)?);
                }
                let stop = read_hash(&mut cursor)?;
                ensure_consumed(&cursor, payload)?;
                Ok(Message::GetBlocks {
                    version,
                    locator,
                    stop,
                })
            }
        }
    }
}

fn decode_inventory(payload: &[u8]) -> Result<Vec<InvItem>, CodecError> {
    let mut cursor = Cursor::new(payload);
    let count = read_count(&mut cursor, MAX_INV_ENTRIES)?;
    let mut items = Vec::new();
    for _ in 0..count {
        let inv_type = InvType::from_u32(read_u32_le(&mut cursor)?)?;
        let hash = read_hash(&mut cursor)?;
        items.push(InvItem::new(inv_type, hash));
    }
    ensure_consumed(&cursor, payload)?;
    Ok(items)
}

fn read_count(cursor: &mut Cursor<&[u8]>, max: usize) -> Result<usize, CodecError> {
    let count = read_varint(cursor)?;
    if count > max as u64 {
        return Err(CodecError::TooManyEntries { count, max });
    }
    Ok(count as usize)
}

fn ensure_consumed(cursor: &Cursor<&[u8]>, payload: &[u8]) -> Result<(), CodecError> {
    let trailing = payload.len() - cursor.position() as usize;
    if trailing != 0 {
        return Err(CodecError::TrailingBytes(trailing));
    }
    Ok(())
}
