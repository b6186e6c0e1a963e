// Two-stack script machine

use log::trace;

use super::number::{decode_int, encode_bool, encode_int, is_true};
use super::opcodes::OpCode;
use super::parser::{op_len, parse, Instruction};
use super::ScriptError;
use crate::core::{ecdsa, hash, write_push_data, SigHashError, Transaction};

/// Upper bound on keys in one CHECKMULTISIG
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

/// Machine scoped to one input of one transaction.
///
/// Created fresh for each input verification and dropped afterwards; the
/// stacks never outlive the evaluation.
pub struct Machine<'a> {
    stack: Vec<Vec<u8>>,
    alt_stack: Vec<Vec<u8>>,
    prior_locking_script: &'a [u8],
    tx: &'a Transaction,
    index: usize,
}

impl<'a> Machine<'a> {
    /// Fresh machine for input `index` of `tx`, spending an output locked by
    /// `prior_locking_script`
    pub fn new(prior_locking_script: &'a [u8], tx: &'a Transaction, index: usize) -> Self {
        Self {
            stack: Vec::new(),
            alt_stack: Vec::new(),
            prior_locking_script,
            tx,
            index,
        }
    }

    /// Main stack, bottom first
    pub fn stack(&self) -> &[Vec<u8>] {
        &self.stack
    }

    /// Alternate stack, bottom first
    pub fn alt_stack(&self) -> &[Vec<u8>] {
        &self.alt_stack
    }

    /// Empty the alternate stack between the unlocking and locking scripts
    pub fn clear_alt_stack(&mut self) {
        self.alt_stack.clear();
    }

    /// Run the unlocking script, then the prior locking script, and decide.
    ///
    /// A trailing signature check decides directly; otherwise the top of the
    /// stack must be true.
    pub fn verify(&mut self, unlocking_script: &[u8]) -> Result<(), ScriptError> {
        self.eval(unlocking_script)?;
        self.clear_alt_stack();

        let locking_script = self.prior_locking_script;
        let verdict = self.eval(locking_script)?;
        let passed = match verdict {
            Some(result) => result,
            None => self.stack.last().is_some_and(|top| is_true(top)),
        };

        if passed {
            Ok(())
        } else {
            Err(ScriptError::ScriptFailure(match verdict {
                Some(_) => "signature check returned false".to_string(),
                None => "final stack top is false or missing".to_string(),
            }))
        }
    }

    /// Parse and run one script on the current stacks
    pub fn eval(&mut self, script: &[u8]) -> Result<Option<bool>, ScriptError> {
        let instructions = parse(script)?;
        self.run(&instructions)
    }

    /// Execute a sequence of instructions.
    ///
    /// Returns the verdict of the last instruction: `Some` when it was a
    /// non-verify signature check (or a conditional whose executed branch
    /// ended in one), `None` otherwise.
    pub fn run(&mut self, instructions: &[Instruction]) -> Result<Option<bool>, ScriptError> {
        let mut verdict = None;
        for instruction in instructions {
            verdict = self.step(instruction)?;
        }
        Ok(verdict)
    }

    fn step(&mut self, instruction: &Instruction) -> Result<Option<bool>, ScriptError> {
        match instruction {
            Instruction::Push(data) => {
                self.stack.push(data.clone());
                Ok(None)
            }
            Instruction::Op(op) => {
                self.require(*op)?;
                self.execute(*op)?;
                Ok(None)
            }
            Instruction::Cond {
                sense,
                then_branch,
                else_branch,
            } => {
                let op = if *sense { OpCode::If } else { OpCode::NotIf };
                self.require(op)?;
                let condition = is_true(&self.pop(op)?);

                if condition == *sense {
                    self.run(then_branch)
                } else if let Some(branch) = else_branch {
                    self.run(branch)
                } else {
                    Ok(None)
                }
            }
            Instruction::Check { op, covered } => {
                self.require(*op)?;
                let result = match op {
                    OpCode::CheckSig | OpCode::CheckSigVerify => self.check_sig(covered)?,
                    _ => self.check_multisig(covered)?,
                };
                trace!("{} on input {} -> {}", op, self.index, result);

                match op {
                    OpCode::CheckSigVerify | OpCode::CheckMultiSigVerify => {
                        if !result {
                            return Err(ScriptError::ScriptFailure(format!("{} failed", op)));
                        }
                        Ok(None)
                    }
                    _ => {
                        self.stack.push(encode_bool(result));
                        Ok(Some(result))
                    }
                }
            }
        }
    }

    fn execute(&mut self, op: OpCode) -> Result<(), ScriptError> {
        use OpCode::*;

        let len = self.stack.len();
        match op {
            Nop | Nop1 | Nop2 | Nop3 | Nop4 | Nop5 | Nop6 | Nop7 | Nop8 | Nop9 | Nop10
            | CodeSeparator => {}
            Reserved | Ver | Reserved1 | Reserved2 => {
                return Err(ScriptError::BadScript(format!("{} executed", op)));
            }
            Verify => {
                if !is_true(&self.pop(op)?) {
                    return Err(ScriptError::ScriptFailure("OP_VERIFY on false".into()));
                }
            }
            Return => return Err(ScriptError::ScriptFailure("OP_RETURN executed".into())),

            ToAltStack => {
                let item = self.pop(op)?;
                self.alt_stack.push(item);
            }
            FromAltStack => {
                let item = self
                    .alt_stack
                    .pop()
                    .ok_or_else(|| ScriptError::AltStackUnderflow(op.name().to_string()))?;
                self.stack.push(item);
            }
            TwoDrop => {
                self.stack.truncate(len - 2);
            }
            TwoDup => {
                self.stack.extend_from_within(len - 2..);
            }
            ThreeDup => {
                self.stack.extend_from_within(len - 3..);
            }
            TwoOver => {
                self.stack.extend_from_within(len - 4..len - 2);
            }
            TwoRot => {
                let moved: Vec<_> = self.stack.drain(len - 6..len - 4).collect();
                self.stack.extend(moved);
            }
            TwoSwap => self.stack[len - 4..].rotate_left(2),
            IfDup => {
                if is_true(&self.stack[len - 1]) {
                    self.stack.extend_from_within(len - 1..);
                }
            }
            Depth => self.stack.push(encode_int(len as i64)),
            Drop => {
                self.stack.pop();
            }
            Dup => self.stack.extend_from_within(len - 1..),
            Nip => {
                self.stack.remove(len - 2);
            }
            Over => self.stack.extend_from_within(len - 2..len - 1),
            Pick | Roll => {
                let n = self.pop_num(op)?;
                let remaining = self.stack.len() as i64;
                if n < 0 || n >= remaining {
                    return Err(ScriptError::StackUnderflow(format!(
                        "{} index {} with depth {}",
                        op, n, remaining
                    )));
                }
                let position = (remaining - 1 - n) as usize;
                let item = if op == Pick {
                    self.stack[position].clone()
                } else {
                    self.stack.remove(position)
                };
                self.stack.push(item);
            }
            Rot => self.stack[len - 3..].rotate_left(1),
            Swap => self.stack.swap(len - 1, len - 2),
            Tuck => {
                let top = self.stack[len - 1].clone();
                self.stack.insert(len - 2, top);
            }
            Size => {
                let size = self.stack[len - 1].len() as i64;
                self.stack.push(encode_int(size));
            }

            Equal | EqualVerify => {
                let b = self.pop(op)?;
                let a = self.pop(op)?;
                if op == EqualVerify {
                    if a != b {
                        return Err(ScriptError::ScriptFailure("OP_EQUALVERIFY mismatch".into()));
                    }
                } else {
                    self.stack.push(encode_bool(a == b));
                }
            }

            OneAdd | OneSub | Negate | Abs | Not | ZeroNotEqual => {
                let a = self.pop_num(op)?;
                let result = match op {
                    OneAdd => a + 1,
                    OneSub => a - 1,
                    Negate => -a,
                    Abs => a.abs(),
                    Not => (a == 0) as i64,
                    _ => (a != 0) as i64,
                };
                self.stack.push(encode_int(result));
            }

            Add | Sub | BoolAnd | BoolOr | NumEqual | NumEqualVerify | NumNotEqual | LessThan
            | GreaterThan | LessThanOrEqual | GreaterThanOrEqual | Min | Max => {
                let b = self.pop_num(op)?;
                let a = self.pop_num(op)?;
                let result = match op {
                    Add => a + b,
                    Sub => a - b,
                    BoolAnd => (a != 0 && b != 0) as i64,
                    BoolOr => (a != 0 || b != 0) as i64,
                    NumEqual | NumEqualVerify => (a == b) as i64,
                    NumNotEqual => (a != b) as i64,
                    LessThan => (a < b) as i64,
                    GreaterThan => (a > b) as i64,
                    LessThanOrEqual => (a <= b) as i64,
                    GreaterThanOrEqual => (a >= b) as i64,
                    Min => a.min(b),
                    _ => a.max(b),
                };
                if op == NumEqualVerify {
                    if result == 0 {
                        return Err(ScriptError::ScriptFailure("OP_NUMEQUALVERIFY mismatch".into()));
                    }
                } else {
                    self.stack.push(encode_int(result));
                }
            }
            Within => {
                let max = self.pop_num(op)?;
                let min = self.pop_num(op)?;
                let x = self.pop_num(op)?;
                self.stack.push(encode_bool(min <= x && x < max));
            }

            Ripemd160 | Sha1 | Sha256 | Hash160 | Hash256 => {
                let data = self.pop(op)?;
                let digest = match op {
                    Ripemd160 => hash::ripemd160(&data).to_vec(),
                    Sha1 => hash::sha1(&data).to_vec(),
                    Sha256 => hash::sha256(&data).to_vec(),
                    Hash160 => hash::hash160(&data).to_vec(),
                    _ => hash::hash256(&data).as_bytes().to_vec(),
                };
                self.stack.push(digest);
            }

            If | NotIf | Else | EndIf | VerIf | VerNotIf | CheckSig | CheckSigVerify
            | CheckMultiSig | CheckMultiSigVerify => {
                return Err(ScriptError::BadScript(format!("{} outside its structure", op)));
            }
            Cat | Substr | Left | Right | Invert | And | Or | Xor | TwoMul | TwoDiv | Mul | Div
            | Mod | LShift | RShift => return Err(ScriptError::DisabledError(op)),
        }
        Ok(())
    }

    fn check_sig(&mut self, covered: &[u8]) -> Result<bool, ScriptError> {
        let op = OpCode::CheckSig;
        let pubkey = self.pop(op)?;
        let signature = self.pop(op)?;

        let script_code = strip_separators(covered)?;
        let script_code = find_and_delete(&script_code, &push_of(&signature))?;
        self.check_signature(&signature, &pubkey, &script_code)
    }

    /// Every signature must match some not-yet-matched key. Key order is not
    /// enforced.
    fn check_multisig(&mut self, covered: &[u8]) -> Result<bool, ScriptError> {
        let op = OpCode::CheckMultiSig;

        let key_count = self.pop_num(op)?;
        if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&key_count) {
            return Err(ScriptError::BadNumber(format!("{} public keys", key_count)));
        }
        let mut pubkeys = self.pop_n(op, key_count as usize)?;

        let sig_count = self.pop_num(op)?;
        if sig_count < 0 || sig_count > key_count {
            return Err(ScriptError::BadNumber(format!(
                "{} signatures for {} keys",
                sig_count, key_count
            )));
        }
        let signatures = self.pop_n(op, sig_count as usize)?;

        let mut script_code = strip_separators(covered)?;
        for signature in &signatures {
            script_code = find_and_delete(&script_code, &push_of(signature))?;
        }

        for signature in &signatures {
            let mut matched = None;
            for (i, pubkey) in pubkeys.iter().enumerate() {
                if self.check_signature(signature, pubkey, &script_code)? {
                    matched = Some(i);
                    break;
                }
            }
            match matched {
                Some(i) => {
                    pubkeys.remove(i);
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Last signature byte is the hash type; the rest is DER.
    fn check_signature(
        &self,
        signature: &[u8],
        pubkey: &[u8],
        script_code: &[u8],
    ) -> Result<bool, ScriptError> {
        let Some((&hash_type, der)) = signature.split_last() else {
            return Ok(false);
        };

        let digest = self
            .tx
            .get_ecdsa_hash(self.index, script_code, hash_type as u32)
            .map_err(|e| match e {
                SigHashError::UnsupportedHashType(t) => ScriptError::UnsupportedHashType(t),
                other => ScriptError::BadScript(other.to_string()),
            })?;

        Ok(ecdsa::verify(pubkey, &digest, der))
    }

    fn require(&self, op: OpCode) -> Result<(), ScriptError> {
        if self.stack.len() < op.min_stack() {
            return Err(ScriptError::StackUnderflow(format!(
                "{} needs {} items, stack has {}",
                op,
                op.min_stack(),
                self.stack.len()
            )));
        }
        Ok(())
    }

    fn pop(&mut self, op: OpCode) -> Result<Vec<u8>, ScriptError> {
        self.stack
            .pop()
            .ok_or_else(|| ScriptError::StackUnderflow(op.name().to_string()))
    }

    fn pop_n(&mut self, op: OpCode, count: usize) -> Result<Vec<Vec<u8>>, ScriptError> {
        if self.stack.len() < count {
            return Err(ScriptError::StackUnderflow(format!(
                "{} needs {} more items, stack has {}",
                op,
                count,
                self.stack.len()
            )));
        }
        let mut items = self.stack.split_off(self.stack.len() - count);
        items.reverse();
        Ok(items)
    }

    fn pop_num(&mut self, op: OpCode) -> Result<i64, ScriptError> {
        decode_int(&self.pop(op)?)
    }
}

fn push_of(data: &[u8]) -> Vec<u8> {
    let mut pattern = Vec::with_capacity(data.len() + 5);
    write_push_data(&mut pattern, data);
    pattern
}

fn strip_separators(script: &[u8]) -> Result<Vec<u8>, ScriptError> {
    find_and_delete(script, &[OpCode::CodeSeparator.to_byte()])
}

/// Remove every occurrence of `pattern` that starts on an opcode boundary.
pub fn find_and_delete(script: &[u8], pattern: &[u8]) -> Result<Vec<u8>, ScriptError> {
    if pattern.is_empty() {
        return Ok(script.to_vec());
    }

    let mut result = Vec::with_capacity(script.len());
    let mut pos = 0;
    while pos < script.len() {
        if script[pos..].starts_with(pattern) {
            pos += pattern.len();
            continue;
        }
        let len = op_len(script, pos)?;
        result.extend_from_slice(&script[pos..pos + len]);
        pos += len;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hash256, OutPoint, TxInput, TxOutput};

    fn dummy_tx() -> Transaction {
        Transaction::new(
            vec![TxInput::new(OutPoint::new(Hash256::new([7; 32]), 0), vec![])],
            vec![TxOutput::new(1000, vec![])],
        )
    }

    fn run_script(script: &[u8]) -> Result<(Option<bool>, Vec<Vec<u8>>), ScriptError> {
        let tx = dummy_tx();
        let mut machine = Machine::new(&[], &tx, 0);
        let verdict = machine.eval(script)?;
        Ok((verdict, machine.stack().to_vec()))
    }

    fn stack_after(script: &[u8]) -> Vec<Vec<u8>> {
        run_script(script).unwrap().1
    }

    #[test]
    fn test_every_opcode_underflows() {
        let tx = dummy_tx();
        for byte in 0u8..=255 {
            let Some(op) = OpCode::from_byte(byte) else { continue };
            let needed = op.min_stack();
            if needed == 0 {
                continue;
            }

            let mut machine = Machine::new(&[], &tx, 0);
            let mut program: Vec<Instruction> =
                (0..needed - 1).map(|_| Instruction::Push(vec![1])).collect();
            program.push(match op {
                OpCode::If | OpCode::NotIf => Instruction::Cond {
                    sense: op == OpCode::If,
                    then_branch: vec![],
                    else_branch: None,
                },
                _ if op.is_signature_check() => Instruction::Check { op, covered: vec![] },
                _ => Instruction::Op(op),
            });

            let result = machine.run(&program);
            assert!(
                matches!(result, Err(ScriptError::StackUnderflow(_))),
                "{} with {} items gave {:?}",
                op,
                needed - 1,
                result
            );
        }
    }

    #[test]
    fn test_alt_stack_underflow() {
        assert!(matches!(
            run_script(&[0x6c]),
            Err(ScriptError::AltStackUnderflow(_))
        ));
    }

    #[test]
    fn test_alt_stack_roundtrip() {
        // 1 2 TOALTSTACK 3 FROMALTSTACK
        assert_eq!(
            stack_after(&[0x51, 0x52, 0x6b, 0x53, 0x6c]),
            vec![vec![1], vec![3], vec![2]]
        );
    }

    #[test]
    fn test_if_branches() {
        // cond IF 5 ELSE 6 ENDIF
        for (cond, expected) in [(0x51u8, 5u8), (0x00, 6)] {
            assert_eq!(stack_after(&[cond, 0x63, 0x55, 0x67, 0x56, 0x68]), vec![vec![expected]]);
        }
        // cond NOTIF 5 ELSE 6 ENDIF
        for (cond, expected) in [(0x51u8, 6u8), (0x00, 5)] {
            assert_eq!(stack_after(&[cond, 0x64, 0x55, 0x67, 0x56, 0x68]), vec![vec![expected]]);
        }
    }

    #[test]
    fn test_if_without_else_skips() {
        assert_eq!(stack_after(&[0x00, 0x63, 0x55, 0x68]), Vec::<Vec<u8>>::new());
        assert_eq!(stack_after(&[0x51, 0x64, 0x55, 0x68]), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn test_negative_zero_is_false() {
        // push 0x80 IF 5 ELSE 6 ENDIF
        assert_eq!(
            stack_after(&[0x01, 0x80, 0x63, 0x55, 0x67, 0x56, 0x68]),
            vec![vec![6]]
        );
    }

    #[test]
    fn test_untaken_branch_is_not_executed() {
        // 0 IF RETURN ENDIF 1
        assert_eq!(stack_after(&[0x00, 0x63, 0x6a, 0x68, 0x51]), vec![vec![1]]);
    }

    #[test]
    fn test_stack_shuffles() {
        // 1 2 3 ROT -> 2 3 1
        assert_eq!(stack_after(&[0x51, 0x52, 0x53, 0x7b]), vec![vec![2], vec![3], vec![1]]);
        // 1 2 SWAP -> 2 1
        assert_eq!(stack_after(&[0x51, 0x52, 0x7c]), vec![vec![2], vec![1]]);
        // 1 2 TUCK -> 2 1 2
        assert_eq!(stack_after(&[0x51, 0x52, 0x7d]), vec![vec![2], vec![1], vec![2]]);
        // 1 2 3 4 2SWAP -> 3 4 1 2
        assert_eq!(
            stack_after(&[0x51, 0x52, 0x53, 0x54, 0x72]),
            vec![vec![3], vec![4], vec![1], vec![2]]
        );
        // 1..6 2ROT -> 3 4 5 6 1 2
        assert_eq!(
            stack_after(&[0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x71]),
            vec![vec![3], vec![4], vec![5], vec![6], vec![1], vec![2]]
        );
        // 1 2 3 4 2OVER -> 1 2 3 4 1 2
        assert_eq!(
            stack_after(&[0x51, 0x52, 0x53, 0x54, 0x70]),
            vec![vec![1], vec![2], vec![3], vec![4], vec![1], vec![2]]
        );
        // 1 2 NIP -> 2 ; 1 2 OVER -> 1 2 1
        assert_eq!(stack_after(&[0x51, 0x52, 0x77]), vec![vec![2]]);
        assert_eq!(stack_after(&[0x51, 0x52, 0x78]), vec![vec![1], vec![2], vec![1]]);
    }

    #[test]
    fn test_pick_and_roll() {
        // 1 2 3 2 PICK -> 1 2 3 1
        assert_eq!(
            stack_after(&[0x51, 0x52, 0x53, 0x52, 0x79]),
            vec![vec![1], vec![2], vec![3], vec![1]]
        );
        // 1 2 3 2 ROLL -> 2 3 1
        assert_eq!(
            stack_after(&[0x51, 0x52, 0x53, 0x52, 0x7a]),
            vec![vec![2], vec![3], vec![1]]
        );
        // index past the bottom
        assert!(matches!(
            run_script(&[0x51, 0x55, 0x79]),
            Err(ScriptError::StackUnderflow(_))
        ));
    }

    #[test]
    fn test_depth_size_ifdup() {
        assert_eq!(stack_after(&[0x51, 0x51, 0x74]), vec![vec![1], vec![1], vec![2]]);
        assert_eq!(stack_after(&[0x02, 0xaa, 0xbb, 0x82]), vec![vec![0xaa, 0xbb], vec![2]]);
        assert_eq!(stack_after(&[0x00, 0x73]), vec![Vec::<u8>::new()]);
        assert_eq!(stack_after(&[0x51, 0x73]), vec![vec![1], vec![1]]);
    }

    #[test]
    fn test_arithmetic() {
        // 2 3 ADD -> 5
        assert_eq!(stack_after(&[0x52, 0x53, 0x93]), vec![vec![5]]);
        // 2 3 SUB -> -1
        assert_eq!(stack_after(&[0x52, 0x53, 0x94]), vec![vec![0x81]]);
        // 5 NEGATE ABS -> 5
        assert_eq!(stack_after(&[0x55, 0x8f, 0x90]), vec![vec![5]]);
        // 0 NOT -> 1 ; 7 0NOTEQUAL -> 1
        assert_eq!(stack_after(&[0x00, 0x91]), vec![vec![1]]);
        assert_eq!(stack_after(&[0x57, 0x92]), vec![vec![1]]);
        // 3 7 MIN / MAX
        assert_eq!(stack_after(&[0x53, 0x57, 0xa3]), vec![vec![3]]);
        assert_eq!(stack_after(&[0x53, 0x57, 0xa4]), vec![vec![7]]);
        // 4 3 7 WITHIN -> true ; 7 3 7 WITHIN -> false
        assert_eq!(stack_after(&[0x54, 0x53, 0x57, 0xa5]), vec![vec![1]]);
        assert_eq!(stack_after(&[0x57, 0x53, 0x57, 0xa5]), vec![Vec::<u8>::new()]);
        // 2 3 LESSTHAN -> 1
        assert_eq!(stack_after(&[0x52, 0x53, 0x9f]), vec![vec![1]]);
    }

    #[test]
    fn test_results_may_exceed_operand_range() {
        // 0x7fffffff 1ADD pushes a five-byte result without error
        let script = [0x04, 0xff, 0xff, 0xff, 0x7f, 0x8b];
        assert_eq!(stack_after(&script), vec![vec![0x00, 0x00, 0x00, 0x80, 0x00]]);

        // ...but it cannot be used as an operand again
        let reuse = [0x04, 0xff, 0xff, 0xff, 0x7f, 0x8b, 0x8b];
        assert!(matches!(run_script(&reuse), Err(ScriptError::BadNumber(_))));
    }

    #[test]
    fn test_wide_operand_is_bad_number() {
        let script = [0x05, 1, 2, 3, 4, 5, 0x51, 0x93];
        assert!(matches!(run_script(&script), Err(ScriptError::BadNumber(_))));
    }

    #[test]
    fn test_equal_and_verify() {
        assert_eq!(stack_after(&[0x52, 0x52, 0x87]), vec![vec![1]]);
        assert!(matches!(
            run_script(&[0x52, 0x53, 0x88]),
            Err(ScriptError::ScriptFailure(_))
        ));
        assert!(matches!(
            run_script(&[0x00, 0x69]),
            Err(ScriptError::ScriptFailure(_))
        ));
        assert!(matches!(
            run_script(&[0x51, 0x6a]),
            Err(ScriptError::ScriptFailure(_))
        ));
        assert!(matches!(
            run_script(&[0x52, 0x53, 0x9d]),
            Err(ScriptError::ScriptFailure(_))
        ));
    }

    #[test]
    fn test_reserved_fails_only_when_executed() {
        assert!(matches!(run_script(&[0x50]), Err(ScriptError::BadScript(_))));
        assert_eq!(stack_after(&[0x00, 0x63, 0x50, 0x68, 0x51]), vec![vec![1]]);
    }

    #[test]
    fn test_hash_ops() {
        let stack = stack_after(&[0x00, 0xa9]);
        assert_eq!(stack, vec![hash::hash160(&[]).to_vec()]);

        let stack = stack_after(&[0x00, 0xaa]);
        assert_eq!(stack, vec![hash::hash256(&[]).as_bytes().to_vec()]);

        let stack = stack_after(&[0x00, 0xa7]);
        assert_eq!(stack[0].len(), 20);
    }

    #[test]
    fn test_no_verdict_without_trailing_check() {
        assert_eq!(run_script(&[0x51]).unwrap().0, None);
    }

    #[test]
    fn test_find_and_delete_respects_op_boundaries() {
        // push of [0xab] must survive; the bare CODESEPARATOR goes
        let script = [0x01, 0xab, 0xab, 0x76];
        assert_eq!(strip_separators(&script).unwrap(), vec![0x01, 0xab, 0x76]);

        let sig = vec![0x30, 0x01];
        let mut script = push_of(&sig);
        script.push(0x76);
        script.extend(push_of(&sig));
        assert_eq!(find_and_delete(&script, &push_of(&sig)).unwrap(), vec![0x76]);
    }

    #[test]
    fn test_verify_implicit_truth() {
        let tx = dummy_tx();
        // locking: 2 EQUAL ; unlocking: 2
        let mut machine = Machine::new(&[0x52, 0x87], &tx, 0);
        assert!(machine.verify(&[0x52]).is_ok());

        let mut machine = Machine::new(&[0x52, 0x87], &tx, 0);
        assert!(matches!(machine.verify(&[0x53]), Err(ScriptError::ScriptFailure(_))));

        let mut machine = Machine::new(&[], &tx, 0);
        assert!(matches!(machine.verify(&[]), Err(ScriptError::ScriptFailure(_))));
    }

    #[test]
    fn test_alt_stack_cleared_between_scripts() {
        let tx = dummy_tx();
        // unlocking leaves an item on the alt stack, locking tries to take it
        let mut machine = Machine::new(&[0x6c], &tx, 0);
        let result = machine.verify(&[0x51, 0x6b]);
        assert!(matches!(result, Err(ScriptError::AltStackUnderflow(_))));
    }
}
