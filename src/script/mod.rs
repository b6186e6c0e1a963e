// Script engine: parser, instruction tree and the two-stack machine

pub mod builder;
pub mod machine;
pub mod number;
pub mod opcodes;
pub mod parser;

pub use builder::Script;
pub use machine::Machine;
pub use opcodes::OpCode;
pub use parser::{parse, Instruction};

use thiserror::Error;

/// Failure of a single script evaluation. Invalidates only the input under
/// evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script failed: {0}")]
    ScriptFailure(String),

    #[error("malformed script: {0}")]
    BadScript(String),

    #[error("bad numeric operand: {0}")]
    BadNumber(String),

    #[error("disabled opcode {0}")]
    DisabledError(OpCode),

    #[error("stack underflow in {0}")]
    StackUnderflow(String),

    #[error("alt stack underflow in {0}")]
    AltStackUnderflow(String),

    #[error("push runs past end of script")]
    ScriptUnderflow,

    #[error("signature hash type {0} is not implemented")]
    UnsupportedHashType(u32),
}
