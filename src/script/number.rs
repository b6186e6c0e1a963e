// Script number encoding
//
// Stack items are little-endian sign-magnitude integers: the highest bit of
// the last byte is the sign. Operands longer than four bytes are rejected,
// which bounds inputs to -0x7fffffff..=0x7fffffff. Results are pushed without
// that bound, so a sum can be pushed that cannot be read back.

use super::ScriptError;

/// Longest byte string accepted as a numeric operand
pub const MAX_NUM_SIZE: usize = 4;

/// Decode a numeric operand.
///
/// The empty string and every negative-zero form (`0x80`, `0x00 0x80`, ...)
/// decode to 0.
pub fn decode_int(bytes: &[u8]) -> Result<i64, ScriptError> {
    if bytes.len() > MAX_NUM_SIZE {
        return Err(ScriptError::BadNumber(format!(
            "{}-byte operand exceeds {} bytes",
            bytes.len(),
            MAX_NUM_SIZE
        )));
    }
    Ok(decode_unbounded(bytes))
}

fn decode_unbounded(bytes: &[u8]) -> i64 {
    let Some((&last, _)) = bytes.split_last() else {
        return 0;
    };

    let mut magnitude: i64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        let byte = if i == bytes.len() - 1 { byte & 0x7f } else { *byte };
        magnitude |= (byte as i64) << (8 * i);
    }

    if last & 0x80 != 0 { -magnitude } else { magnitude }
}

/// Encode in the minimal sign-magnitude form; 0 encodes as the empty string.
pub fn encode_int(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut result = Vec::with_capacity(9);
    while magnitude > 0 {
        result.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    // a set high bit would read as the sign, so pad with a sign byte
    if let Some(last) = result.last_mut() {
        if *last & 0x80 != 0 {
            result.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            *last |= 0x80;
        }
    }
    result
}

/// Truth test: false for the empty string, all zeros, or all zeros with a
/// trailing `0x80` (negative zero).
pub fn is_true(bytes: &[u8]) -> bool {
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != 0 {
            return !(i == bytes.len() - 1 && *byte == 0x80);
        }
    }
    false
}

pub fn encode_bool(value: bool) -> Vec<u8> {
    if value { vec![1] } else { Vec::new() }
}
