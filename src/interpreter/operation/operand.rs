//! Operand addressing modes.
//!
//! Operands are plain data produced by the decoder. Reading or writing
//! through one (including base-register write-back) is done by
//! [`crate::interpreter::execute::addressing`].

use crate::interpreter::state::{Field, RegisterId};

/// Base-register adjustment of register-indirect addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// `@-ERn`: subtract the access size, then access.
    PreDecrement,
    /// `@ERn+`: access, then add the access size.
    PostIncrement,
}

/// Encoded width of an absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsoluteForm {
    /// `@aa:8`, in the top page of the address space.
    Short8,
    /// `@aa:16`, sign-extended.
    Short16,
    /// `@aa:24`.
    Long24,
}

/// Addressing mode of one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// `#xx`: constant, already zero- or sign-extended by the decoder.
    Immediate(u32),

    /// Direct register or sub-register.
    Register(Field),

    /// `@ERn`, `@-ERn` or `@ERn+`.
    Indirect {
        base: RegisterId,
        step: Option<Step>,
        /// Store the adjusted address back into `base`.
        writeback: bool,
    },

    /// `@(d:16,ERn)` / `@(d:24,ERn)`.
    Displacement { base: RegisterId, disp: i32 },

    /// `@aa:8`, `@aa:16`, `@aa:24`; `address` is already extended.
    Absolute { address: u32, form: AbsoluteForm },

    /// Branch displacement relative to the end of the instruction.
    PcRelative { disp: i32 },

    /// `@@aa:8`: branch through a pointer stored at `address`.
    MemoryIndirect { address: u32 },

    /// Register set for load/store-multiple, bit `i` selecting register `i`.
    RegisterList {
        base: RegisterId,
        mask: u16,
        /// Adjust the address before each access rather than after.
        before: bool,
        /// Move upward rather than downward.
        increment: bool,
        writeback: bool,
    },
}

/// A decoded operand and its access width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub kind: OperandKind,
    /// Access width in bytes (per register for lists; 0 where meaningless).
    pub tsize: u8,
}

impl Operand {
    #[inline]
    pub const fn new(kind: OperandKind, tsize: u8) -> Self {
        Self { kind, tsize }
    }

    #[inline]
    pub const fn imm(value: u32, tsize: u8) -> Self {
        Self::new(OperandKind::Immediate(value), tsize)
    }

    /// Direct register; the width follows the field.
    #[inline]
    pub fn reg(field: Field) -> Self {
        Self::new(OperandKind::Register(field), (field.width() / 8) as u8)
    }

    #[inline]
    pub const fn indirect(base: RegisterId, tsize: u8) -> Self {
        Self::new(OperandKind::Indirect { base, step: None, writeback: false }, tsize)
    }

    #[inline]
    pub const fn pre_decrement(base: RegisterId, tsize: u8) -> Self {
        Self::new(
            OperandKind::Indirect { base, step: Some(Step::PreDecrement), writeback: true },
            tsize,
        )
    }

    #[inline]
    pub const fn post_increment(base: RegisterId, tsize: u8) -> Self {
        Self::new(
            OperandKind::Indirect { base, step: Some(Step::PostIncrement), writeback: true },
            tsize,
        )
    }

    #[inline]
    pub const fn displacement(base: RegisterId, disp: i32, tsize: u8) -> Self {
        Self::new(OperandKind::Displacement { base, disp }, tsize)
    }

    #[inline]
    pub const fn absolute(address: u32, form: AbsoluteForm, tsize: u8) -> Self {
        Self::new(OperandKind::Absolute { address, form }, tsize)
    }

    #[inline]
    pub const fn pc_relative(disp: i32) -> Self {
        Self::new(OperandKind::PcRelative { disp }, 0)
    }

    #[inline]
    pub const fn memory_indirect(address: u32) -> Self {
        Self::new(OperandKind::MemoryIndirect { address }, 0)
    }

    #[inline]
    pub const fn register_list(
        base: RegisterId,
        mask: u16,
        before: bool,
        increment: bool,
        writeback: bool,
        tsize: u8,
    ) -> Self {
        Self::new(
            OperandKind::RegisterList { base, mask, before, increment, writeback },
            tsize,
        )
    }

    /// The register this operand names directly, if any.
    #[inline]
    pub fn register(&self) -> Option<Field> {
        match self.kind {
            OperandKind::Register(field) => Some(field),
            _ => None,
        }
    }

    /// Whether this operand names the program counter directly.
    #[inline]
    pub fn is_pc(&self) -> bool {
        self.register().map_or(false, |f| f.backing() == RegisterId::PC)
    }

    /// Whether the operand lives in memory.
    pub fn is_memory(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::Indirect { .. }
                | OperandKind::Displacement { .. }
                | OperandKind::Absolute { .. }
                | OperandKind::MemoryIndirect { .. }
        )
    }
}
