//! Mnemonics and branch conditions.
//!
//! `Mnemonic` is closed: the executor matches on it, so a mnemonic without a
//! handler lands in a single fallback arm instead of a failed lookup.

/// Branch conditions in encoding order.
///
/// The low nibble of a Bcc opcode indexes [`CONDITIONS`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// BT / BRA: always.
    True,
    /// BF / BRN: never.
    False,
    /// C | Z == 0.
    Hi,
    /// C | Z == 1.
    Ls,
    /// C == 0 (BCC).
    Hs,
    /// C == 1 (BCS).
    Lo,
    /// Z == 0.
    Ne,
    /// Z == 1.
    Eq,
    /// V == 0.
    Vc,
    /// V == 1.
    Vs,
    /// N == 0.
    Pl,
    /// N == 1.
    Mi,
    /// N ^ V == 0.
    Ge,
    /// N ^ V == 1.
    Lt,
    /// Z | (N ^ V) == 0.
    Gt,
    /// Z | (N ^ V) == 1.
    Le,
}

/// Conditions indexed by the opcode's condition field.
pub const CONDITIONS: [Condition; 16] = [
    Condition::True,
    Condition::False,
    Condition::Hi,
    Condition::Ls,
    Condition::Hs,
    Condition::Lo,
    Condition::Ne,
    Condition::Eq,
    Condition::Vc,
    Condition::Vs,
    Condition::Pl,
    Condition::Mi,
    Condition::Ge,
    Condition::Lt,
    Condition::Gt,
    Condition::Le,
];

impl Condition {
    /// Condition for the 4-bit field `code`.
    #[inline]
    pub const fn from_code(code: u8) -> Self {
        CONDITIONS[(code & 0xF) as usize]
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Condition::True => "bt",
            Condition::False => "bf",
            Condition::Hi => "bhi",
            Condition::Ls => "bls",
            Condition::Hs => "bhs",
            Condition::Lo => "blo",
            Condition::Ne => "bne",
            Condition::Eq => "beq",
            Condition::Vc => "bvc",
            Condition::Vs => "bvs",
            Condition::Pl => "bpl",
            Condition::Mi => "bmi",
            Condition::Ge => "bge",
            Condition::Lt => "blt",
            Condition::Gt => "bgt",
            Condition::Le => "ble",
        }
    }
}

/// Coprocessor entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoprocessorOp {
    StoreToMemory,
    LoadFromMemory,
    DataOperation,
    MoveToRegister,
    MoveRegisterPair,
}

/// Operation kinds. Variants that differ only in flag behaviour or width
/// (ADD/ADDS/ADDX, BAND/BIAND) share a mnemonic and are told apart by
/// [`super::InstrFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // Data transfer
    Mov,
    Eepmov,
    Ldm,
    Stm,

    // Arithmetic
    Add,
    Sub,
    Cmp,
    Inc,
    Dec,
    Neg,
    Extu,
    Exts,
    Mulxu,
    Mulxs,
    Divxu,
    Divxs,
    Daa,
    Das,

    // Logic
    And,
    Or,
    Xor,
    Not,
    Andc,
    Orc,
    Xorc,
    Ldc,
    Stc,

    // Shift
    Shal,
    Shar,
    Shll,
    Shlr,
    Rotl,
    Rotr,
    Rotxl,
    Rotxr,

    // Bit manipulation
    Bset,
    Bclr,
    Bnot,
    Btst,
    Bld,
    Bst,
    Band,
    Bor,
    Bxor,

    // Branch
    Bcc(Condition),
    Bsr,
    Jmp,
    Jsr,
    Rts,
    Rte,
    Trapa,

    // System
    Nop,
    Sleep,
    Coprocessor(CoprocessorOp),
}

impl Mnemonic {
    /// Base assembler name, without variant suffixes.
    pub const fn base_name(self) -> &'static str {
        match self {
            Mnemonic::Mov => "mov",
            Mnemonic::Eepmov => "eepmov",
            Mnemonic::Ldm => "ldm",
            Mnemonic::Stm => "stm",
            Mnemonic::Add => "add",
            Mnemonic::Sub => "sub",
            Mnemonic::Cmp => "cmp",
            Mnemonic::Inc => "inc",
            Mnemonic::Dec => "dec",
            Mnemonic::Neg => "neg",
            Mnemonic::Extu => "extu",
            Mnemonic::Exts => "exts",
            Mnemonic::Mulxu => "mulxu",
            Mnemonic::Mulxs => "mulxs",
            Mnemonic::Divxu => "divxu",
            Mnemonic::Divxs => "divxs",
            Mnemonic::Daa => "daa",
            Mnemonic::Das => "das",
            Mnemonic::And => "and",
            Mnemonic::Or => "or",
            Mnemonic::Xor => "xor",
            Mnemonic::Not => "not",
            Mnemonic::Andc => "andc",
            Mnemonic::Orc => "orc",
            Mnemonic::Xorc => "xorc",
            Mnemonic::Ldc => "ldc",
            Mnemonic::Stc => "stc",
            Mnemonic::Shal => "shal",
            Mnemonic::Shar => "shar",
            Mnemonic::Shll => "shll",
            Mnemonic::Shlr => "shlr",
            Mnemonic::Rotl => "rotl",
            Mnemonic::Rotr => "rotr",
            Mnemonic::Rotxl => "rotxl",
            Mnemonic::Rotxr => "rotxr",
            Mnemonic::Bset => "bset",
            Mnemonic::Bclr => "bclr",
            Mnemonic::Bnot => "bnot",
            Mnemonic::Btst => "btst",
            Mnemonic::Bld => "bld",
            Mnemonic::Bst => "bst",
            Mnemonic::Band => "band",
            Mnemonic::Bor => "bor",
            Mnemonic::Bxor => "bxor",
            Mnemonic::Bcc(cond) => cond.mnemonic(),
            Mnemonic::Bsr => "bsr",
            Mnemonic::Jmp => "jmp",
            Mnemonic::Jsr => "jsr",
            Mnemonic::Rts => "rts",
            Mnemonic::Rte => "rte",
            Mnemonic::Trapa => "trapa",
            Mnemonic::Nop => "nop",
            Mnemonic::Sleep => "sleep",
            Mnemonic::Coprocessor(CoprocessorOp::StoreToMemory) => "cpstore",
            Mnemonic::Coprocessor(CoprocessorOp::LoadFromMemory) => "cpload",
            Mnemonic::Coprocessor(CoprocessorOp::DataOperation) => "cpdata",
            Mnemonic::Coprocessor(CoprocessorOp::MoveToRegister) => "cpmove",
            Mnemonic::Coprocessor(CoprocessorOp::MoveRegisterPair) => "cpmovepair",
        }
    }

    /// Whether this is a control transfer.
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Mnemonic::Bcc(_)
                | Mnemonic::Bsr
                | Mnemonic::Jmp
                | Mnemonic::Jsr
                | Mnemonic::Rts
                | Mnemonic::Rte
                | Mnemonic::Trapa
        )
    }
}
