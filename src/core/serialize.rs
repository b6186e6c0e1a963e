// Wire codec primitives: varints, length-prefixed bytes and script pushes

use std::io::{self, Read};

use thiserror::Error;

/// Push opcodes carrying an explicit length
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Largest push that fits in the opcode byte itself
pub const MAX_DIRECT_PUSH: usize = 0x4b;

/// Encoding errors. Owning structure (script, transaction, block) is rejected.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("truncated or unreadable input: {0}")]
    Io(#[from] io::Error),

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("invalid length: expected {expected}, got {got}")]
    BadLength { expected: usize, got: usize },

    #[error("invalid hex: {0}")]
    BadHex(String),

    #[error("unknown message command {0:?}")]
    UnknownCommand(String),

    #[error("unknown inventory type {0}")]
    UnknownInvType(u32),

    #[error("varint {0} is not in its shortest form")]
    NonCanonicalVarint(u64),

    #[error("{count} entries exceed the limit of {max}")]
    TooManyEntries { count: u64, max: usize },
}

/// Types with a canonical wire form
pub trait Serializable {
    fn serialize(&self) -> Vec<u8>;
    fn deserialize(data: &[u8]) -> Result<Self, CodecError>
    where
        Self: Sized;
}

pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => buf.push(value as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Read a varint, rejecting any encoding longer than `write_varint` would
/// produce for the same value
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<u64, CodecError> {
    let (value, min) = match read_u8(reader)? {
        0xfd => (read_u16_le(reader)? as u64, 0xfd),
        0xfe => (read_u32_le(reader)? as u64, 0x1_0000),
        0xff => (read_u64_le(reader)?, 0x1_0000_0000),
        byte => return Ok(byte as u64),
    };
    if value < min {
        return Err(CodecError::NonCanonicalVarint(value));
    }
    Ok(value)
}

pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Read a varint-prefixed byte string.
///
/// Never allocates more than the reader actually yields, so a forged length
/// cannot force a huge allocation.
pub fn read_var_bytes<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, CodecError> {
    let len = read_varint(reader)?;
    let mut data = Vec::new();
    (&mut *reader).take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        return Err(CodecError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("declared {} bytes, found {}", len, data.len()),
        )));
    }
    Ok(data)
}

pub fn read_u8<R: Read + ?Sized>(reader: &mut R) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

pub fn read_u16_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<u16> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

pub fn read_u32_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

pub fn read_u64_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

pub fn read_hash<R: Read + ?Sized>(reader: &mut R) -> io::Result<crate::core::Hash256> {
    let mut bytes = [0u8; 32];
    reader.read_exact(&mut bytes)?;
    Ok(crate::core::Hash256::new(bytes))
}

/// Append a script push of `data` using the shortest legal form
pub fn write_push_data(buf: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len <= MAX_DIRECT_PUSH {
        buf.push(len as u8);
    } else if len <= 0xff {
        buf.push(OP_PUSHDATA1);
        buf.push(len as u8);
    } else if len <= 0xffff {
        buf.push(OP_PUSHDATA2);
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        buf.push(OP_PUSHDATA4);
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
    buf.extend_from_slice(data);
}
