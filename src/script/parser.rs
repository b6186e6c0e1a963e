// Script parser: raw bytes to an owned instruction tree

use super::number::encode_int;
use super::opcodes::{OP_1, OP_16, OP_1NEGATE, OpCode};
use super::ScriptError;
use crate::core::{OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};

/// One node of a parsed script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Data push (including the small-number opcodes)
    Push(Vec<u8>),
    /// Any opcode without structure of its own
    Op(OpCode),
    /// `IF` (sense = true) or `NOTIF` (sense = false) with its branches
    Cond {
        sense: bool,
        then_branch: Vec<Instruction>,
        else_branch: Option<Vec<Instruction>>,
    },
    /// Signature check with the script bytes it signs over
    Check { op: OpCode, covered: Vec<u8> },
}

/// Parse a script into its instruction tree.
pub fn parse(script: &[u8]) -> Result<Vec<Instruction>, ScriptError> {
    let mut parser = Parser {
        script,
        pos: 0,
        boundary: 0,
    };
    match parser.parse_block()? {
        (instructions, Terminator::End) => Ok(instructions),
        (_, Terminator::Else) => Err(ScriptError::BadScript("OP_ELSE without OP_IF".into())),
        (_, Terminator::EndIf) => Err(ScriptError::BadScript("OP_ENDIF without OP_IF".into())),
    }
}

/// Length of the operation starting at `pos`, including push payloads.
pub fn op_len(script: &[u8], pos: usize) -> Result<usize, ScriptError> {
    let opcode = *script.get(pos).ok_or(ScriptError::ScriptUnderflow)?;
    let (header, len) = push_header(script, pos, opcode)?;
    if pos + header + len > script.len() {
        return Err(ScriptError::ScriptUnderflow);
    }
    Ok(header + len)
}

/// Header size and payload length of a push opcode; (1, 0) for anything else.
fn push_header(script: &[u8], pos: usize, opcode: u8) -> Result<(usize, usize), ScriptError> {
    let field = |width: usize| -> Result<usize, ScriptError> {
        let bytes = script
            .get(pos + 1..pos + 1 + width)
            .ok_or(ScriptError::ScriptUnderflow)?;
        let mut value = [0u8; 4];
        value[..width].copy_from_slice(bytes);
        Ok(u32::from_le_bytes(value) as usize)
    };

    match opcode {
        0x00..=0x4b => Ok((1, opcode as usize)),
        OP_PUSHDATA1 => Ok((2, field(1)?)),
        OP_PUSHDATA2 => Ok((3, field(2)?)),
        OP_PUSHDATA4 => Ok((5, field(4)?)),
        _ => Ok((1, 0)),
    }
}

enum Terminator {
    End,
    Else,
    EndIf,
}

struct Parser<'a> {
    script: &'a [u8],
    pos: usize,
    /// Start of the bytes covered by the next signature check
    boundary: usize,
}

impl Parser<'_> {
    fn parse_block(&mut self) -> Result<(Vec<Instruction>, Terminator), ScriptError> {
        let mut instructions = Vec::new();

        while self.pos < self.script.len() {
            let opcode = self.script[self.pos];

            if opcode <= OP_PUSHDATA4 {
                let data = self.read_push(opcode)?;
                instructions.push(Instruction::Push(data));
                continue;
            }
            self.pos += 1;

            if opcode == OP_1NEGATE {
                instructions.push(Instruction::Push(encode_int(-1)));
                continue;
            }
            if (OP_1..=OP_16).contains(&opcode) {
                let n = (opcode - OP_1 + 1) as i64;
                instructions.push(Instruction::Push(encode_int(n)));
                continue;
            }

            let op = OpCode::from_byte(opcode).ok_or_else(|| {
                ScriptError::BadScript(format!("unknown opcode {:#04x}", opcode))
            })?;
            if op.is_disabled() {
                return Err(ScriptError::DisabledError(op));
            }

            match op {
                OpCode::VerIf | OpCode::VerNotIf => {
                    return Err(ScriptError::BadScript(format!("{} is always invalid", op)));
                }
                OpCode::Else => return Ok((instructions, Terminator::Else)),
                OpCode::EndIf => return Ok((instructions, Terminator::EndIf)),
                OpCode::If | OpCode::NotIf => {
                    instructions.push(self.parse_conditional(op == OpCode::If)?);
                }
                OpCode::CodeSeparator => {
                    self.boundary = self.pos;
                    instructions.push(Instruction::Op(op));
                }
                _ if op.is_signature_check() => {
                    instructions.push(Instruction::Check {
                        op,
                        covered: self.script[self.boundary..].to_vec(),
                    });
                }
                _ => instructions.push(Instruction::Op(op)),
            }
        }

        Ok((instructions, Terminator::End))
    }

    fn parse_conditional(&mut self, sense: bool) -> Result<Instruction, ScriptError> {
        let unterminated = || ScriptError::BadScript("OP_IF without OP_ENDIF".into());

        let (then_branch, terminator) = self.parse_block()?;
        let else_branch = match terminator {
            Terminator::End => return Err(unterminated()),
            Terminator::EndIf => None,
            Terminator::Else => match self.parse_block()? {
                (branch, Terminator::EndIf) => Some(branch),
                (_, Terminator::Else) => {
                    return Err(ScriptError::BadScript("second OP_ELSE in one OP_IF".into()));
                }
                (_, Terminator::End) => return Err(unterminated()),
            },
        };

        Ok(Instruction::Cond {
            sense,
            then_branch,
            else_branch,
        })
    }

    fn read_push(&mut self, opcode: u8) -> Result<Vec<u8>, ScriptError> {
        let (header, len) = push_header(self.script, self.pos, opcode)?;
        let start = self.pos + header;
        let data = self
            .script
            .get(start..start + len)
            .ok_or(ScriptError::ScriptUnderflow)?
            .to_vec();
        self.pos = start + len;
        Ok(data)
    }
}
