//! Decoded operation representation.
//!
//! An [`Operation`] is what the decoder hands the executor: a mnemonic, the
//! operands in assembler order (source first, destination last), the byte
//! length consumed, a size class and variant flags. Operations are
//! immutable once built.
//!
//! # Example
//!
//! ```
//! use h8_emu::interpreter::operation::{InstrFlags, Mnemonic, Operand, Operation, SizeClass};
//! use h8_emu::interpreter::state::Field;
//!
//! // add.b r0l,r1l
//! let op = Operation::new(0x100, Mnemonic::Add, 2, SizeClass::Byte, InstrFlags::SETS_FLAGS)
//!     .with_operand(Operand::reg(Field::rl(0)))
//!     .with_operand(Operand::reg(Field::rl(1)));
//! assert_eq!(op.name(), "add");
//! assert_eq!(op.next_address(), 0x102);
//! ```

pub mod mnemonic;
pub mod operand;

pub use mnemonic::{Condition, CoprocessorOp, Mnemonic, CONDITIONS};
pub use operand::{AbsoluteForm, Operand, OperandKind, Step};

use smallvec::SmallVec;

/// Operand size suffix (.B/.W/.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Byte,
    Word,
    Long,
    /// No size suffix (branches, CCR operations, ...).
    Unsized,
}

impl SizeClass {
    /// Width in bytes; 0 for `Unsized`.
    #[inline]
    pub const fn bytes(self) -> u8 {
        match self {
            SizeClass::Byte => 1,
            SizeClass::Word => 2,
            SizeClass::Long => 4,
            SizeClass::Unsized => 0,
        }
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Size class for a width in bytes.
    pub const fn from_bytes(bytes: u8) -> Self {
        match bytes {
            1 => SizeClass::Byte,
            2 => SizeClass::Word,
            4 => SizeClass::Long,
            _ => SizeClass::Unsized,
        }
    }
}

bitflags::bitflags! {
    /// Variant flags of a decoded operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InstrFlags: u8 {
        /// Writes condition codes (ADD as opposed to ADDS).
        const SETS_FLAGS = 1 << 0;
        /// Consumes the carry flag (ADDX/SUBX).
        const WITH_CARRY = 1 << 1;
        /// Address adjusted before each access.
        const BEFORE = 1 << 2;
        /// Address moves upward.
        const INCREMENT = 1 << 3;
        /// Base register receives the final address.
        const WRITEBACK = 1 << 4;
        /// Inverted bit operand (BIAND, BILD, ...).
        const INVERT = 1 << 5;
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Address the instruction was decoded at.
    pub address: u32,
    pub mnemonic: Mnemonic,
    /// Operands in assembler order.
    pub operands: SmallVec<[Operand; 4]>,
    /// Bytes consumed from the instruction stream.
    pub length: u8,
    pub size: SizeClass,
    pub flags: InstrFlags,
}

impl Operation {
    /// An operation with no operands yet.
    pub fn new(address: u32, mnemonic: Mnemonic, length: u8, size: SizeClass, flags: InstrFlags) -> Self {
        Self {
            address,
            mnemonic,
            operands: SmallVec::new(),
            length,
            size,
            flags,
        }
    }

    /// Append an operand.
    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    /// Address of the following instruction.
    #[inline]
    pub fn next_address(&self) -> u32 {
        self.address.wrapping_add(self.length as u32) & 0x00FF_FFFF
    }

    /// Assembler name, accounting for flag-selected variants.
    pub fn name(&self) -> &'static str {
        let invert = self.flags.contains(InstrFlags::INVERT);
        match self.mnemonic {
            Mnemonic::Add if self.flags.contains(InstrFlags::WITH_CARRY) => "addx",
            Mnemonic::Add if !self.flags.contains(InstrFlags::SETS_FLAGS) => "adds",
            Mnemonic::Sub if self.flags.contains(InstrFlags::WITH_CARRY) => "subx",
            Mnemonic::Sub if !self.flags.contains(InstrFlags::SETS_FLAGS) => "subs",
            Mnemonic::Bld if invert => "bild",
            Mnemonic::Bst if invert => "bist",
            Mnemonic::Band if invert => "biand",
            Mnemonic::Bor if invert => "bior",
            Mnemonic::Bxor if invert => "bixor",
            m => m.base_name(),
        }
    }

    /// First operand (the source of two-operand forms).
    #[inline]
    pub fn source(&self) -> Option<&Operand> {
        self.operands.first()
    }

    /// Last operand (the destination).
    #[inline]
    pub fn dest(&self) -> Option<&Operand> {
        self.operands.last()
    }
}
