// Proof of Work: compact targets and nonce search

use std::time::{Duration, Instant};

use crate::core::{Block, BlockHeader, Hash256};

/// Difficulty target in compact form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Compact representation (bits field in block header)
    pub bits: u32,
}

impl Target {
    pub fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Expand to a 256-bit big-endian integer.
    ///
    /// target = mantissa * 2^(8 * (exponent - 3)), with the mantissa taken as
    /// the low 24 bits unsigned. Returns `None` when the value does not fit in
    /// 256 bits.
    pub fn to_be_bytes(&self) -> Option<[u8; 32]> {
        let exponent = (self.bits >> 24) as i32;
        let mantissa = self.bits & 0x00ff_ffff;
        let mut target = [0u8; 32];

        if exponent <= 3 {
            let value = mantissa >> (8 * (3 - exponent));
            target[29..].copy_from_slice(&value.to_be_bytes()[1..]);
            return Some(target);
        }

        let digits = mantissa.to_be_bytes();
        for (k, byte) in digits[1..].iter().enumerate() {
            let position = 29 - (exponent - 3) + k as i32;
            if position < 0 {
                if *byte != 0 {
                    return None;
                }
                continue;
            }
            target[position as usize] = *byte;
        }
        Some(target)
    }

    /// Hash read as a little-endian integer is strictly below the target.
    /// An overflowing target is met by nothing.
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        match self.to_be_bytes() {
            Some(target) => hash.to_be_bytes() < target,
            None => false,
        }
    }
}

/// Nonce search against a fixed target
pub struct Miner {
    pub target: Target,
}

impl Miner {
    pub fn new(bits: u32) -> Self {
        Self {
            target: Target::from_bits(bits),
        }
    }

    /// Try nonces from 0 upwards until the header meets the target
    pub fn mine(&self, header: &mut BlockHeader) -> MiningResult {
        let start_time = Instant::now();
        let mut attempts = 0u64;

        for nonce in 0..=u32::MAX {
            header.nonce = nonce;
            let hash = header.hash();
            attempts += 1;

            if self.target.is_met_by(&hash) {
                return MiningResult {
                    success: true,
                    nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                };
            }

            if attempts % 100_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!(
                    "Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }
        }

        MiningResult {
            success: false,
            nonce: 0,
            hash: Hash256::zero(),
            attempts,
            duration: start_time.elapsed(),
        }
    }

    /// Mine the block's own header in place
    pub fn mine_block(&self, block: &mut Block) -> MiningResult {
        self.mine(&mut block.header)
    }
}

#[derive(Debug)]
pub struct MiningResult {
    pub success: bool,
    pub nonce: u32,
    pub hash: Hash256,
    pub attempts: u64,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(mut bytes: [u8; 32], up: bool) -> [u8; 32] {
        for byte in bytes.iter_mut().rev() {
            let (value, carry) = if up {
                byte.overflowing_add(1)
            } else {
                byte.overflowing_sub(1)
            };
            *byte = value;
            if !carry {
                break;
            }
        }
        bytes
    }

    #[test]
    fn test_target_expansion() {
        let target = Target::from_bits(0x1d00ffff).to_be_bytes().unwrap();
        let mut expected = [0u8; 32];
        expected[4] = 0xff;
        expected[5] = 0xff;
        assert_eq!(target, expected);

        let small = Target::from_bits(0x03123456).to_be_bytes().unwrap();
        assert_eq!(&small[29..], &[0x12, 0x34, 0x56]);

        let shifted = Target::from_bits(0x02123456).to_be_bytes().unwrap();
        assert_eq!(&shifted[29..], &[0x00, 0x12, 0x34]);
    }

    #[test]
    fn test_target_overflow() {
        assert!(Target::from_bits(0x2100ffff).to_be_bytes().is_some());
        assert!(Target::from_bits(0x22000001).to_be_bytes().is_some());
        assert_eq!(Target::from_bits(0x22010000).to_be_bytes(), None);
        assert_eq!(Target::from_bits(0xff123456).to_be_bytes(), None);
        assert!(!Target::from_bits(0xff123456).is_met_by(&Hash256::zero()));
    }

    #[test]
    fn test_hash_at_and_around_target() {
        let target = Target::from_bits(0x1d00ffff);
        let bytes = target.to_be_bytes().unwrap();

        let at = Hash256::from_be_bytes(bytes);
        let below = Hash256::from_be_bytes(step(bytes, false));
        let above = Hash256::from_be_bytes(step(bytes, true));

        assert!(!target.is_met_by(&at));
        assert!(target.is_met_by(&below));
        assert!(!target.is_met_by(&above));
    }

    #[test]
    fn test_hash_compared_as_little_endian_integer() {
        let target = Target::from_bits(0x1d00ffff);
        // leading digest bytes are the least significant
        let mut low = [0u8; 32];
        low[0] = 0xff;
        assert!(target.is_met_by(&Hash256::new(low)));

        let mut high = [0u8; 32];
        high[31] = 0x01;
        assert!(!target.is_met_by(&Hash256::new(high)));
    }

    #[test]
    fn test_pow_mining_easy() {
        let miner = Miner::new(0x207fffff);
        let mut header = BlockHeader::new(1, Hash256::zero(), Hash256::zero(), 1234567890, 0x207fffff, 0);

        let result = miner.mine(&mut header);
        assert!(result.success);
        assert_eq!(header.nonce, result.nonce);
        assert!(miner.target.is_met_by(&header.hash()));
    }
}
