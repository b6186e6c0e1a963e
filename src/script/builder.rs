// Script builders for the standard locking and unlocking forms

use super::number::encode_int;
use super::opcodes::{OP_0, OP_1, OpCode};
use crate::core::write_push_data;

/// Constructors for common scripts
pub struct Script;

impl Script {
    /// OP_DUP OP_HASH160 <pubKeyHash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh_script_pubkey(pubkey_hash: &[u8; 20]) -> Vec<u8> {
        let mut script = vec![OpCode::Dup.to_byte(), OpCode::Hash160.to_byte()];
        write_push_data(&mut script, pubkey_hash);
        script.push(OpCode::EqualVerify.to_byte());
        script.push(OpCode::CheckSig.to_byte());
        script
    }

    /// <signature> <pubkey>
    pub fn p2pkh_script_sig(signature: &[u8], pubkey: &[u8]) -> Vec<u8> {
        Self::push_only(&[signature, pubkey])
    }

    /// <pubkey> OP_CHECKSIG
    pub fn p2pk_script_pubkey(pubkey: &[u8]) -> Vec<u8> {
        let mut script = Vec::new();
        write_push_data(&mut script, pubkey);
        script.push(OpCode::CheckSig.to_byte());
        script
    }

    /// M <pubkey>... N OP_CHECKMULTISIG
    pub fn multisig_script_pubkey<T: AsRef<[u8]>>(required: usize, pubkeys: &[T]) -> Vec<u8> {
        let mut script = Vec::new();
        Self::push_int(&mut script, required as i64);
        for pubkey in pubkeys {
            write_push_data(&mut script, pubkey.as_ref());
        }
        Self::push_int(&mut script, pubkeys.len() as i64);
        script.push(OpCode::CheckMultiSig.to_byte());
        script
    }

    /// <signature>... in the order they are given
    pub fn multisig_script_sig<T: AsRef<[u8]>>(signatures: &[T]) -> Vec<u8> {
        Self::push_only(signatures)
    }

    /// Script made only of data pushes
    pub fn push_only<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
        let mut script = Vec::new();
        for item in items {
            write_push_data(&mut script, item.as_ref());
        }
        script
    }

    /// Small numbers use OP_0 and OP_1..OP_16, anything else a data push
    pub fn push_int(script: &mut Vec<u8>, value: i64) {
        match value {
            0 => script.push(OP_0),
            1..=16 => script.push(OP_1 + (value as u8 - 1)),
            _ => write_push_data(script, &encode_int(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::opcodes::OP_16;
    use crate::script::{parse, Instruction};

    #[test]
    fn test_p2pkh_script_creation() {
        let pubkey_hash = [0x12; 20];
        let script = Script::p2pkh_script_pubkey(&pubkey_hash);

        assert_eq!(script.len(), 25);
        assert_eq!(script[0], OpCode::Dup.to_byte());
        assert_eq!(script[1], OpCode::Hash160.to_byte());
        assert_eq!(script[2], 20);
        assert_eq!(&script[3..23], &pubkey_hash);
        assert_eq!(script[23], OpCode::EqualVerify.to_byte());
        assert_eq!(script[24], OpCode::CheckSig.to_byte());
    }

    #[test]
    fn test_script_sig_uses_pushdata_for_long_items() {
        let signature = vec![1u8; 80];
        let pubkey = vec![2u8; 33];
        let script_sig = Script::p2pkh_script_sig(&signature, &pubkey);

        assert_eq!(script_sig[0], 0x4c);
        assert_eq!(script_sig[1], 80);
        assert_eq!(
            parse(&script_sig).unwrap(),
            vec![Instruction::Push(signature), Instruction::Push(pubkey)]
        );
    }

    #[test]
    fn test_multisig_layout() {
        let keys = vec![vec![2u8; 33], vec![3u8; 33], vec![4u8; 33]];
        let script = Script::multisig_script_pubkey(2, &keys);

        assert_eq!(script[0], OP_1 + 1);
        assert_eq!(script[script.len() - 2], OP_1 + 2);
        assert_eq!(*script.last().unwrap(), OpCode::CheckMultiSig.to_byte());

        let parsed = parse(&script).unwrap();
        assert_eq!(parsed.len(), 6);
        assert!(matches!(
            parsed[5],
            Instruction::Check {
                op: OpCode::CheckMultiSig,
                ..
            }
        ));
    }

    #[test]
    fn test_push_int() {
        let mut script = Vec::new();
        Script::push_int(&mut script, 0);
        Script::push_int(&mut script, 16);
        Script::push_int(&mut script, 17);
        Script::push_int(&mut script, -5);
        assert_eq!(script, vec![OP_0, OP_16, 0x01, 17, 0x01, 0x85]);
    }
}
