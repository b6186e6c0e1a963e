// Opcode table

/// Every non-push opcode the machine knows about.
///
/// Push opcodes (`0x00..=0x4e`, `OP_1NEGATE`, `OP_1..=OP_16`) never reach the
/// tree as an `OpCode`; the parser turns them into `Instruction::Push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Reserved = 0x50,
    Nop = 0x61,
    Ver = 0x62,
    If = 0x63,
    NotIf = 0x64,
    VerIf = 0x65,
    VerNotIf = 0x66,
    Else = 0x67,
    EndIf = 0x68,
    Verify = 0x69,
    Return = 0x6a,

    ToAltStack = 0x6b,
    FromAltStack = 0x6c,
    TwoDrop = 0x6d,
    TwoDup = 0x6e,
    ThreeDup = 0x6f,
    TwoOver = 0x70,
    TwoRot = 0x71,
    TwoSwap = 0x72,
    IfDup = 0x73,
    Depth = 0x74,
    Drop = 0x75,
    Dup = 0x76,
    Nip = 0x77,
    Over = 0x78,
    Pick = 0x79,
    Roll = 0x7a,
    Rot = 0x7b,
    Swap = 0x7c,
    Tuck = 0x7d,

    Cat = 0x7e,
    Substr = 0x7f,
    Left = 0x80,
    Right = 0x81,
    Size = 0x82,

    Invert = 0x83,
    And = 0x84,
    Or = 0x85,
    Xor = 0x86,
    Equal = 0x87,
    EqualVerify = 0x88,
    Reserved1 = 0x89,
    Reserved2 = 0x8a,

    OneAdd = 0x8b,
    OneSub = 0x8c,
    TwoMul = 0x8d,
    TwoDiv = 0x8e,
    Negate = 0x8f,
    Abs = 0x90,
    Not = 0x91,
    ZeroNotEqual = 0x92,
    Add = 0x93,
    Sub = 0x94,
    Mul = 0x95,
    Div = 0x96,
    Mod = 0x97,
    LShift = 0x98,
    RShift = 0x99,
    BoolAnd = 0x9a,
    BoolOr = 0x9b,
    NumEqual = 0x9c,
    NumEqualVerify = 0x9d,
    NumNotEqual = 0x9e,
    LessThan = 0x9f,
    GreaterThan = 0xa0,
    LessThanOrEqual = 0xa1,
    GreaterThanOrEqual = 0xa2,
    Min = 0xa3,
    Max = 0xa4,
    Within = 0xa5,

    Ripemd160 = 0xa6,
    Sha1 = 0xa7,
    Sha256 = 0xa8,
    Hash160 = 0xa9,
    Hash256 = 0xaa,
    CodeSeparator = 0xab,
    CheckSig = 0xac,
    CheckSigVerify = 0xad,
    CheckMultiSig = 0xae,
    CheckMultiSigVerify = 0xaf,

    Nop1 = 0xb0,
    Nop2 = 0xb1,
    Nop3 = 0xb2,
    Nop4 = 0xb3,
    Nop5 = 0xb4,
    Nop6 = 0xb5,
    Nop7 = 0xb6,
    Nop8 = 0xb7,
    Nop9 = 0xb8,
    Nop10 = 0xb9,
}

/// Raw byte values of the push-family opcodes
pub const OP_0: u8 = 0x00;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;

impl OpCode {
    /// Opcodes retired by the network; rejected at parse time wherever they appear.
    pub const DISABLED: [OpCode; 15] = [
        OpCode::Cat,
        OpCode::Substr,
        OpCode::Left,
        OpCode::Right,
        OpCode::Invert,
        OpCode::And,
        OpCode::Or,
        OpCode::Xor,
        OpCode::TwoMul,
        OpCode::TwoDiv,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::LShift,
        OpCode::RShift,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        use OpCode::*;
        let op = match byte {
            0x50 => Reserved,
            0x61 => Nop,
            0x62 => Ver,
            0x63 => If,
            0x64 => NotIf,
            0x65 => VerIf,
            0x66 => VerNotIf,
            0x67 => Else,
            0x68 => EndIf,
            0x69 => Verify,
            0x6a => Return,
            0x6b => ToAltStack,
            0x6c => FromAltStack,
            0x6d => TwoDrop,
            0x6e => TwoDup,
            0x6f => ThreeDup,
            0x70 => TwoOver,
            0x71 => TwoRot,
            0x72 => TwoSwap,
            0x73 => IfDup,
            0x74 => Depth,
            0x75 => Drop,
            0x76 => Dup,
            0x77 => Nip,
            0x78 => Over,
            0x79 => Pick,
            0x7a => Roll,
            0x7b => Rot,
            0x7c => Swap,
            0x7d => Tuck,
            0x7e => Cat,
            0x7f => Substr,
            0x80 => Left,
            0x81 => Right,
            0x82 => Size,
            0x83 => Invert,
            0x84 => And,
            0x85 => Or,
            0x86 => Xor,
            0x87 => Equal,
            0x88 => EqualVerify,
            0x89 => Reserved1,
            0x8a => Reserved2,
            0x8b => OneAdd,
            0x8c => OneSub,
            0x8d => TwoMul,
            0x8e => TwoDiv,
            0x8f => Negate,
            0x90 => Abs,
            0x91 => Not,
            0x92 => ZeroNotEqual,
            0x93 => Add,
            0x94 => Sub,
            0x95 => Mul,
            0x96 => Div,
            0x97 => Mod,
            0x98 => LShift,
            0x99 => RShift,
            0x9a => BoolAnd,
            0x9b => BoolOr,
            0x9c => NumEqual,
            0x9d => NumEqualVerify,
            0x9e => NumNotEqual,
            0x9f => LessThan,
            0xa0 => GreaterThan,
            0xa1 => LessThanOrEqual,
            0xa2 => GreaterThanOrEqual,
            0xa3 => Min,
            0xa4 => Max,
            0xa5 => Within,
            0xa6 => Ripemd160,
            0xa7 => Sha1,
            0xa8 => Sha256,
            0xa9 => Hash160,
            0xaa => Hash256,
            0xab => CodeSeparator,
            0xac => CheckSig,
            0xad => CheckSigVerify,
            0xae => CheckMultiSig,
            0xaf => CheckMultiSigVerify,
            0xb0 => Nop1,
            0xb1 => Nop2,
            0xb2 => Nop3,
            0xb3 => Nop4,
            0xb4 => Nop5,
            0xb5 => Nop6,
            0xb6 => Nop7,
            0xb7 => Nop8,
            0xb8 => Nop9,
            0xb9 => Nop10,
            _ => return None,
        };
        Some(op)
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn is_disabled(self) -> bool {
        Self::DISABLED.contains(&self)
    }

    /// Signature checks capture a covered script at parse time
    pub fn is_signature_check(self) -> bool {
        matches!(
            self,
            OpCode::CheckSig
                | OpCode::CheckSigVerify
                | OpCode::CheckMultiSig
                | OpCode::CheckMultiSigVerify
        )
    }

    /// Items that must be on the main stack before the opcode runs.
    ///
    /// Opcodes whose depth depends on stack contents (`PICK`, `ROLL`,
    /// `CHECKMULTISIG`) report the fixed part and check the rest themselves.
    pub fn min_stack(self) -> usize {
        use OpCode::*;
        match self {
            If | NotIf | Verify | ToAltStack | IfDup | Drop | Dup | Size | OneAdd | OneSub
            | Negate | Abs | Not | ZeroNotEqual | Ripemd160 | Sha1 | Sha256 | Hash160
            | Hash256 | Pick | Roll | CheckMultiSig | CheckMultiSigVerify => 1,
            TwoDrop | TwoDup | Nip | Over | Swap | Tuck | Equal | EqualVerify | Add | Sub
            | BoolAnd | BoolOr | NumEqual | NumEqualVerify | NumNotEqual | LessThan
            | GreaterThan | LessThanOrEqual | GreaterThanOrEqual | Min | Max | CheckSig
            | CheckSigVerify => 2,
            ThreeDup | Rot | Within => 3,
            TwoOver | TwoSwap => 4,
            TwoRot => 6,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        use OpCode::*;
        match self {
            Reserved => "OP_RESERVED",
            Nop => "OP_NOP",
            Ver => "OP_VER",
            If => "OP_IF",
            NotIf => "OP_NOTIF",
            VerIf => "OP_VERIF",
            VerNotIf => "OP_VERNOTIF",
            Else => "OP_ELSE",
            EndIf => "OP_ENDIF",
            Verify => "OP_VERIFY",
            Return => "OP_RETURN",
            ToAltStack => "OP_TOALTSTACK",
            FromAltStack => "OP_FROMALTSTACK",
            TwoDrop => "OP_2DROP",
            TwoDup => "OP_2DUP",
            ThreeDup => "OP_3DUP",
            TwoOver => "OP_2OVER",
            TwoRot => "OP_2ROT",
            TwoSwap => "OP_2SWAP",
            IfDup => "OP_IFDUP",
            Depth => "OP_DEPTH",
            Drop => "OP_DROP",
            Dup => "OP_DUP",
            Nip => "OP_NIP",
            Over => "OP_OVER",
            Pick => "OP_PICK",
            Roll => "OP_ROLL",
            Rot => "OP_ROT",
            Swap => "OP_SWAP",
            Tuck => "OP_TUCK",
            Cat => "OP_CAT",
            Substr => "OP_SUBSTR",
            Left => "OP_LEFT",
            Right => "OP_RIGHT",
            Size => "OP_SIZE",
            Invert => "OP_INVERT",
            And => "OP_AND",
            Or => "OP_OR",
            Xor => "OP_XOR",
            Equal => "OP_EQUAL",
            EqualVerify => "OP_EQUALVERIFY",
            Reserved1 => "OP_RESERVED1",
            Reserved2 => "OP_RESERVED2",
            OneAdd => "OP_1ADD",
            OneSub => "OP_1SUB",
            TwoMul => "OP_2MUL",
            TwoDiv => "OP_2DIV",
            Negate => "OP_NEGATE",
            Abs => "OP_ABS",
            Not => "OP_NOT",
            ZeroNotEqual => "OP_0NOTEQUAL",
            Add => "OP_ADD",
            Sub => "OP_SUB",
            Mul => "OP_MUL",
            Div => "OP_DIV",
            Mod => "OP_MOD",
            LShift => "OP_LSHIFT",
            RShift => "OP_RSHIFT",
            BoolAnd => "OP_BOOLAND",
            BoolOr => "OP_BOOLOR",
            NumEqual => "OP_NUMEQUAL",
            NumEqualVerify => "OP_NUMEQUALVERIFY",
            NumNotEqual => "OP_NUMNOTEQUAL",
            LessThan => "OP_LESSTHAN",
            GreaterThan => "OP_GREATERTHAN",
            LessThanOrEqual => "OP_LESSTHANOREQUAL",
            GreaterThanOrEqual => "OP_GREATERTHANOREQUAL",
            Min => "OP_MIN",
            Max => "OP_MAX",
            Within => "OP_WITHIN",
            Ripemd160 => "OP_RIPEMD160",
            Sha1 => "OP_SHA1",
            Sha256 => "OP_SHA256",
            Hash160 => "OP_HASH160",
            Hash256 => "OP_HASH256",
            CodeSeparator => "OP_CODESEPARATOR",
            CheckSig => "OP_CHECKSIG",
            CheckSigVerify => "OP_CHECKSIGVERIFY",
            CheckMultiSig => "OP_CHECKMULTISIG",
            CheckMultiSigVerify => "OP_CHECKMULTISIGVERIFY",
            Nop1 => "OP_NOP1",
            Nop2 => "OP_NOP2",
            Nop3 => "OP_NOP3",
            Nop4 => "OP_NOP4",
            Nop5 => "OP_NOP5",
            Nop6 => "OP_NOP6",
            Nop7 => "OP_NOP7",
            Nop8 => "OP_NOP8",
            Nop9 => "OP_NOP9",
            Nop10 => "OP_NOP10",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_roundtrip_for_every_opcode() {
        for byte in 0u8..=255 {
            if let Some(op) = OpCode::from_byte(byte) {
                assert_eq!(op.to_byte(), byte);
            }
        }
    }

    #[test]
    fn test_push_range_is_not_an_opcode() {
        for byte in 0x00..=0x4f {
            assert_eq!(OpCode::from_byte(byte), None);
        }
        for byte in OP_1..=OP_16 {
            assert_eq!(OpCode::from_byte(byte), None);
        }
        assert_eq!(OpCode::from_byte(0xba), None);
        assert_eq!(OpCode::from_byte(0xff), None);
    }

    #[test]
    fn test_disabled_set() {
        assert!(OpCode::Cat.is_disabled());
        assert!(OpCode::RShift.is_disabled());
        assert!(!OpCode::Add.is_disabled());
        assert!(!OpCode::Size.is_disabled());
    }
}
