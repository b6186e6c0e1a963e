// Transaction model, signature hashing and per-input verification

use std::io::{Cursor, Read};

use log::debug;
use thiserror::Error;

use super::serialize::{
    read_hash, read_u32_le, read_u64_le, read_var_bytes, read_varint, write_var_bytes,
    write_varint, CodecError, Serializable,
};
use crate::core::{hash256, Hash256, OutPoint};
use crate::script::{Machine, ScriptError};

/// 21 million coins in base units
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// The only signature-hash type implemented: sign all inputs and outputs
pub const SIGHASH_ALL: u32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigHashError {
    #[error("signature hash type {0} is not implemented")]
    UnsupportedHashType(u32),

    #[error("input {index} out of range for {count} inputs")]
    InputOutOfRange { index: usize, count: usize },
}

/// An input failed to verify. Invalidates this transaction only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("input {input}: {source}")]
    Script {
        input: usize,
        #[source]
        source: ScriptError,
    },

    #[error("input {index} out of range for {count} inputs")]
    InputOutOfRange { index: usize, count: usize },

    #[error("input {input}: previous output {txid}:{vout} not found")]
    MissingPrevout { input: usize, txid: Hash256, vout: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    /// Unlocking script
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    pub fn new(previous_output: OutPoint, script_sig: Vec<u8>) -> Self {
        Self {
            previous_output,
            script_sig,
            sequence: 0xffffffff,
        }
    }

    /// Input of a coinbase: references the null outpoint
    pub fn coinbase(script_sig: Vec<u8>) -> Self {
        Self::new(OutPoint::null(), script_sig)
    }

    pub fn is_coinbase(&self) -> bool {
        self.previous_output.is_null()
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.previous_output.txid.as_bytes());
        buf.extend_from_slice(&self.previous_output.vout.to_le_bytes());
        write_var_bytes(buf, &self.script_sig);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
    }

    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let txid = read_hash(reader)?;
        let vout = read_u32_le(reader)?;
        let script_sig = read_var_bytes(reader)?;
        let sequence = read_u32_le(reader)?;

        Ok(Self {
            previous_output: OutPoint::new(txid, vout),
            script_sig,
            sequence,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Amount in base units
    pub value: u64,
    /// Locking script
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(buf, &self.script_pubkey);
    }

    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let value = read_u64_le(reader)?;
        let script_pubkey = read_var_bytes(reader)?;
        Ok(Self {
            value,
            script_pubkey,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    pub fn coinbase(script_sig: Vec<u8>, output: TxOutput) -> Self {
        Self::new(vec![TxInput::coinbase(script_sig)], vec![output])
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Double SHA256 of the canonical serialization
    pub fn txid(&self) -> Hash256 {
        hash256(&self.serialize())
    }

    /// Sum of output values; `None` on u64 overflow
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, out| total.checked_add(out.value))
    }

    /// Digest signed by the signature on input `index`.
    ///
    /// Every other input's script is blanked and input `index` carries
    /// `sub_script`; the serialization plus the 4-byte hash type is double
    /// hashed. Only `SIGHASH_ALL` is supported.
    pub fn get_ecdsa_hash(
        &self,
        index: usize,
        sub_script: &[u8],
        hash_type: u32,
    ) -> Result<Hash256, SigHashError> {
        if hash_type != SIGHASH_ALL {
            return Err(SigHashError::UnsupportedHashType(hash_type));
        }
        if index >= self.inputs.len() {
            return Err(SigHashError::InputOutOfRange {
                index,
                count: self.inputs.len(),
            });
        }

        let mut copy = self.clone();
        for (i, input) in copy.inputs.iter_mut().enumerate() {
            input.script_sig = if i == index {
                sub_script.to_vec()
            } else {
                Vec::new()
            };
        }

        let mut preimage = copy.serialize();
        preimage.extend_from_slice(&hash_type.to_le_bytes());
        Ok(hash256(&preimage))
    }

    /// Run input `index`'s unlocking script against the locking script of
    /// the output it spends.
    pub fn verify_input(&self, index: usize, prior_locking_script: &[u8]) -> Result<(), VerifyError> {
        let input = self.inputs.get(index).ok_or(VerifyError::InputOutOfRange {
            index,
            count: self.inputs.len(),
        })?;

        let mut machine = Machine::new(prior_locking_script, self, index);
        machine
            .verify(&input.script_sig)
            .map_err(|source| VerifyError::Script { input: index, source })
    }

    /// Verify every non-coinbase input, resolving spent outputs with `lookup`.
    pub fn verify_inputs<F>(&self, mut lookup: F) -> Result<(), VerifyError>
    where
        F: FnMut(&OutPoint) -> Option<Vec<u8>>,
    {
        if self.is_coinbase() {
            return Ok(());
        }

        for (index, input) in self.inputs.iter().enumerate() {
            let outpoint = &input.previous_output;
            let locking_script = lookup(outpoint).ok_or(VerifyError::MissingPrevout {
                input: index,
                txid: outpoint.txid,
                vout: outpoint.vout,
            })?;
            self.verify_input(index, &locking_script)?;
        }
        debug!("transaction {} verified {} inputs", self.txid(), self.inputs.len());
        Ok(())
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());

        write_varint(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_to(buf);
        }

        write_varint(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(buf);
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    /// Decode from a stream, consuming exactly one transaction
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let version = read_u32_le(reader)?;

        let input_count = read_varint(reader)?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = read_varint(reader)?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(reader)?);
        }

        let lock_time = read_u32_le(reader)?;

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }
}

impl Serializable for Transaction {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    fn deserialize(data: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(data);
        let tx = Self::read_from(&mut cursor)?;
        let trailing = data.len() - cursor.position() as usize;
        if trailing != 0 {
            return Err(CodecError::TrailingBytes(trailing));
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ecdsa, hash160};
    use crate::script::Script;

    const KEY_A: [u8; 32] = [0x11; 32];
    const KEY_B: [u8; 32] = [0x22; 32];
    const KEY_C: [u8; 32] = [0x33; 32];

    fn spend(inputs: usize) -> Transaction {
        let inputs = (0..inputs)
            .map(|i| TxInput::new(OutPoint::new(Hash256::new([0x42; 32]), i as u32), vec![]))
            .collect();
        Transaction::new(inputs, vec![TxOutput::new(4000, vec![0x51])])
    }

    /// DER signature plus SIGHASH_ALL byte over `script_code`
    fn signature(tx: &Transaction, index: usize, script_code: &[u8], key: &[u8; 32]) -> Vec<u8> {
        let digest = tx.get_ecdsa_hash(index, script_code, SIGHASH_ALL).unwrap();
        let mut sig = ecdsa::sign(key, &digest).unwrap();
        sig.push(SIGHASH_ALL as u8);
        sig
    }

    fn pubkey(key: &[u8; 32]) -> Vec<u8> {
        ecdsa::public_key(key).unwrap()
    }

    #[test]
    fn test_coinbase_input() {
        let input = TxInput::coinbase(vec![1, 2, 3]);
        assert!(input.is_coinbase());
        assert_eq!(input.previous_output, OutPoint::null());
    }

    #[test]
    fn test_transaction_roundtrip() {
        let mut tx = spend(2);
        tx.version = 2;
        tx.lock_time = 500_000;
        tx.inputs[1].sequence = 7;
        tx.inputs[0].script_sig = vec![0xaa; 300];

        let serialized = tx.serialize();
        assert_eq!(Transaction::deserialize(&serialized).unwrap(), tx);
    }

    #[test]
    fn test_deserialize_rejects_truncation_and_trailing() {
        let serialized = spend(1).serialize();
        assert!(Transaction::deserialize(&serialized[..serialized.len() - 1]).is_err());

        let mut extended = serialized.clone();
        extended.push(0);
        assert!(matches!(
            Transaction::deserialize(&extended),
            Err(CodecError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_txid_stable() {
        let tx = Transaction::coinbase(vec![4, 5, 6], TxOutput::new(50, vec![]));
        assert_eq!(tx.txid(), tx.txid());
        assert_eq!(tx.txid(), hash256(&tx.serialize()));
    }

    #[test]
    fn test_total_output_overflow() {
        let tx = Transaction::new(
            vec![TxInput::coinbase(vec![0, 0])],
            vec![TxOutput::new(u64::MAX, vec![]), TxOutput::new(1, vec![])],
        );
        assert_eq!(tx.total_output_value(), None);
    }

    #[test]
    fn test_sighash_deterministic() {
        let tx = spend(2);
        let a = tx.get_ecdsa_hash(0, &[0x76, 0xac], SIGHASH_ALL).unwrap();
        let b = tx.get_ecdsa_hash(0, &[0x76, 0xac], SIGHASH_ALL).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, tx.get_ecdsa_hash(1, &[0x76, 0xac], SIGHASH_ALL).unwrap());
    }

    #[test]
    fn test_sighash_ignores_other_input_scripts() {
        let tx = spend(2);
        let mut altered = tx.clone();
        altered.inputs[1].script_sig = vec![0x51; 40];
        altered.inputs[0].script_sig = vec![0x52; 10];

        assert_eq!(
            tx.get_ecdsa_hash(0, &[0xac], SIGHASH_ALL).unwrap(),
            altered.get_ecdsa_hash(0, &[0xac], SIGHASH_ALL).unwrap()
        );
    }

    #[test]
    fn test_sighash_commits_to_outputs() {
        let tx = spend(1);
        let mut altered = tx.clone();
        altered.outputs[0].value += 1;
        assert_ne!(
            tx.get_ecdsa_hash(0, &[0xac], SIGHASH_ALL).unwrap(),
            altered.get_ecdsa_hash(0, &[0xac], SIGHASH_ALL).unwrap()
        );
    }

    #[test]
    fn test_sighash_other_types_rejected() {
        let tx = spend(1);
        for hash_type in [0u32, 2, 3, 0x81] {
            assert_eq!(
                tx.get_ecdsa_hash(0, &[], hash_type),
                Err(SigHashError::UnsupportedHashType(hash_type))
            );
        }
        assert!(matches!(
            tx.get_ecdsa_hash(5, &[], SIGHASH_ALL),
            Err(SigHashError::InputOutOfRange { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_p2pkh_spend() {
        let locking = Script::p2pkh_script_pubkey(&hash160(&pubkey(&KEY_A)));
        let mut tx = spend(1);
        let sig = signature(&tx, 0, &locking, &KEY_A);
        tx.inputs[0].script_sig = Script::p2pkh_script_sig(&sig, &pubkey(&KEY_A));

        assert!(tx.verify_input(0, &locking).is_ok());
    }

    #[test]
    fn test_p2pkh_wrong_key() {
        let locking = Script::p2pkh_script_pubkey(&hash160(&pubkey(&KEY_A)));
        let mut tx = spend(1);
        let sig = signature(&tx, 0, &locking, &KEY_B);
        tx.inputs[0].script_sig = Script::p2pkh_script_sig(&sig, &pubkey(&KEY_B));

        // pubkey hash mismatch stops at EQUALVERIFY
        assert!(matches!(
            tx.verify_input(0, &locking),
            Err(VerifyError::Script {
                input: 0,
                source: ScriptError::ScriptFailure(_)
            })
        ));
    }

    #[test]
    fn test_pay_to_pubkey_bad_signature() {
        let locking = Script::p2pk_script_pubkey(&pubkey(&KEY_A));
        let mut tx = spend(1);
        let sig = signature(&tx, 0, &locking, &KEY_B);
        tx.inputs[0].script_sig = Script::push_only(&[&sig]);

        assert!(tx.verify_input(0, &locking).is_err());
    }

    #[test]
    fn test_signature_breaks_when_output_changes() {
        let locking = Script::p2pk_script_pubkey(&pubkey(&KEY_A));
        let mut tx = spend(1);
        let sig = signature(&tx, 0, &locking, &KEY_A);
        tx.inputs[0].script_sig = Script::push_only(&[&sig]);
        assert!(tx.verify_input(0, &locking).is_ok());

        tx.outputs[0].value -= 1;
        assert!(tx.verify_input(0, &locking).is_err());
    }

    #[test]
    fn test_unsupported_hash_type_is_hard_error() {
        let locking = Script::p2pk_script_pubkey(&pubkey(&KEY_A));
        let mut tx = spend(1);
        let mut sig = signature(&tx, 0, &locking, &KEY_A);
        *sig.last_mut().unwrap() = 0x02;
        tx.inputs[0].script_sig = Script::push_only(&[&sig]);

        assert_eq!(
            tx.verify_input(0, &locking),
            Err(VerifyError::Script {
                input: 0,
                source: ScriptError::UnsupportedHashType(2)
            })
        );
    }

    fn multisig_setup() -> (Vec<u8>, Transaction) {
        let keys = [pubkey(&KEY_A), pubkey(&KEY_B), pubkey(&KEY_C)];
        let locking = Script::multisig_script_pubkey(2, &keys);
        (locking, spend(1))
    }

    #[test]
    fn test_multisig_two_of_three() {
        let (locking, mut tx) = multisig_setup();
        let sig_a = signature(&tx, 0, &locking, &KEY_A);
        let sig_c = signature(&tx, 0, &locking, &KEY_C);
        tx.inputs[0].script_sig = Script::multisig_script_sig(&[&sig_a, &sig_c]);

        assert!(tx.verify_input(0, &locking).is_ok());
    }

    #[test]
    fn test_multisig_foreign_signatures_fail() {
        let (locking, mut tx) = multisig_setup();
        let stranger = [0x44u8; 32];
        let sig_x = signature(&tx, 0, &locking, &stranger);
        let sig_a = signature(&tx, 0, &locking, &KEY_A);
        tx.inputs[0].script_sig = Script::multisig_script_sig(&[&sig_a, &sig_x]);

        assert!(matches!(
            tx.verify_input(0, &locking),
            Err(VerifyError::Script {
                source: ScriptError::ScriptFailure(_),
                ..
            })
        ));
    }

    #[test]
    fn test_multisig_accepts_signatures_out_of_key_order() {
        // Signatures are matched against any remaining key, so reversing
        // them relative to the key list still verifies.
        let (locking, mut tx) = multisig_setup();
        let sig_a = signature(&tx, 0, &locking, &KEY_A);
        let sig_c = signature(&tx, 0, &locking, &KEY_C);
        tx.inputs[0].script_sig = Script::multisig_script_sig(&[&sig_c, &sig_a]);

        assert!(tx.verify_input(0, &locking).is_ok());
    }

    #[test]
    fn test_multisig_same_key_twice_fails() {
        let (locking, mut tx) = multisig_setup();
        let sig_a = signature(&tx, 0, &locking, &KEY_A);
        tx.inputs[0].script_sig = Script::multisig_script_sig(&[&sig_a, &sig_a]);

        assert!(tx.verify_input(0, &locking).is_err());
    }

    #[test]
    fn test_verify_inputs_with_lookup() {
        let locking = Script::p2pk_script_pubkey(&pubkey(&KEY_A));
        let mut tx = spend(2);
        for index in 0..2 {
            let sig = signature(&tx, index, &locking, &KEY_A);
            tx.inputs[index].script_sig = Script::push_only(&[&sig]);
        }

        assert!(tx.verify_inputs(|_| Some(locking.clone())).is_ok());
        assert!(matches!(
            tx.verify_inputs(|outpoint| (outpoint.vout == 0).then(|| locking.clone())),
            Err(VerifyError::MissingPrevout { input: 1, .. })
        ));
    }

    #[test]
    fn test_verify_input_out_of_range() {
        assert!(matches!(
            spend(1).verify_input(3, &[0x51]),
            Err(VerifyError::InputOutOfRange { index: 3, count: 1 })
        ));
    }
}
