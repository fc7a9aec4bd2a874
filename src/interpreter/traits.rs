//! Core traits and shared types for the interpreter.
//!
//! These define the seams between the components:
//!
//! - `Decoder`: bytes to [`Operation`]
//! - `Executor`: runs an `Operation` against a [`RegisterContext`] and a `Memory`
//! - `Memory`: the byte-addressed store the core reads and writes through
//!
//! The error enums here are the crate's whole error taxonomy; every failure
//! aborts the current decode/execute/step call and is handed to the caller.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use super::operation::Operation;
use super::state::{Flag, RegisterContext};

/// Condition flags produced by an ALU operation, before being committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagSet {
    /// Negative: sign bit of the result.
    pub n: bool,
    /// Zero: result is all-bits-clear.
    pub z: bool,
    /// Overflow: signed result out of range.
    pub v: bool,
    /// Carry (borrow for subtraction).
    pub c: bool,
    /// Half-carry out of the low nibble of the top byte.
    pub h: bool,
}

impl FlagSet {
    /// N and Z for a result of `width` bits; V, C and H clear.
    #[inline]
    pub fn from_result(result: u32, width: u32) -> Self {
        let mask = super::state::width_mask(width);
        Self {
            n: (result >> (width - 1)) & 1 != 0,
            z: result & mask == 0,
            ..Self::default()
        }
    }

    /// State of `flag`, if this set carries it.
    pub fn get(&self, flag: Flag) -> Option<bool> {
        match flag {
            Flag::N => Some(self.n),
            Flag::Z => Some(self.z),
            Flag::V => Some(self.v),
            Flag::C => Some(self.c),
            Flag::H => Some(self.h),
            Flag::U | Flag::Ui | Flag::I => None,
        }
    }
}

bitflags::bitflags! {
    /// Which computed flags an instruction writes back to CCR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlagMask: u8 {
        const C = 1 << 0;
        const V = 1 << 1;
        const Z = 1 << 2;
        const N = 1 << 3;
        const H = 1 << 5;
    }
}

impl FlagMask {
    /// Full arithmetic update.
    pub const HNZVC: FlagMask = FlagMask::all();
    /// Data transfer and logic.
    pub const NZV: FlagMask = FlagMask::N.union(FlagMask::Z).union(FlagMask::V);

    #[inline]
    pub fn covers(self, flag: Flag) -> bool {
        self.bits() & (flag.mask() as u8) != 0
    }
}

/// Outcome of executing one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Fall through to PC + operation length.
    Continue,

    /// Continue at an explicit address.
    Branch {
        /// Target program counter.
        target: u32,
    },

    /// SLEEP executed; fall through, then wait for an interrupt.
    Sleep,
}

/// Errors raised while decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes for the instruction the leading bytes select.
    #[error("incomplete instruction: need {needed} bytes, have {have}")]
    Incomplete {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        have: usize,
    },

    /// Leading bytes select a reserved or unassigned table slot.
    #[error("reserved opcode 0x{opcode:04X} at PC 0x{pc:06X}")]
    Reserved {
        /// First two instruction bytes (one if that is all there was).
        opcode: u16,
        /// Program counter where decoding started.
        pc: u32,
    },
}

/// Errors reported by a [`Memory`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Nothing is mapped at the address.
    #[error("{len} byte access at 0x{address:06X} is not mapped")]
    Unmapped {
        address: u32,
        len: usize,
    },

    /// Write to a protected range.
    #[error("write to read-only address 0x{address:06X}")]
    ReadOnly {
        address: u32,
    },

    /// Value access with a width other than 1, 2 or 4 bytes.
    #[error("unsupported access width {width}")]
    InvalidWidth {
        width: u8,
    },
}

/// Errors raised while executing a decoded operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Decoded fine, but nothing executes this mnemonic.
    #[error("unsupported instruction {mnemonic} at 0x{address:06X}")]
    Unsupported {
        mnemonic: &'static str,
        address: u32,
    },

    /// A flag was read while CCR is Undefined.
    #[error("flag {flag} is undefined")]
    UndefinedFlag {
        flag: &'static str,
    },

    /// A control transfer needs a target that is Undefined.
    #[error("control transfer target is undefined at 0x{address:06X}")]
    UndefinedTarget {
        address: u32,
    },

    /// The memory collaborator refused an access.
    #[error("memory access failed: {0}")]
    MemoryAccess(#[from] MemoryError),

    /// Internal inconsistency between an operation and its handler.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Either kind of failure a single step can end with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl From<MemoryError> for StepError {
    fn from(e: MemoryError) -> Self {
        StepError::Exec(ExecError::MemoryAccess(e))
    }
}

/// Byte-addressed memory the core executes against.
///
/// Implementations decide what is mapped; the core never touches storage
/// any other way. Multi-byte values are big-endian.
///
/// # Example
///
/// ```
/// use h8_emu::device::FlatMemory;
/// use h8_emu::interpreter::Memory;
///
/// let mut mem = FlatMemory::new(0, 0x100);
/// mem.write_value(0x10, 2, 0xBEEF).unwrap();
/// assert_eq!(mem.read_value(0x10, 1).unwrap(), 0xBE);
/// ```
pub trait Memory {
    /// Fill `buf` from `address` onward.
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Store `bytes` from `address` onward.
    fn write(&mut self, address: u32, bytes: &[u8]) -> Result<(), MemoryError>;

    /// Read a 1, 2 or 4 byte big-endian value.
    fn read_value(&self, address: u32, size: u8) -> Result<u32, MemoryError> {
        let mut buf = [0u8; 4];
        let bytes = buf
            .get_mut(..size as usize)
            .ok_or(MemoryError::InvalidWidth { width: size })?;
        self.read(address, bytes)?;
        match size {
            1 => Ok(bytes[0] as u32),
            2 => Ok(BigEndian::read_u16(bytes) as u32),
            4 => Ok(BigEndian::read_u32(bytes)),
            _ => Err(MemoryError::InvalidWidth { width: size }),
        }
    }

    /// Write the low `size` bytes of `value`, big-endian.
    fn write_value(&mut self, address: u32, size: u8, value: u32) -> Result<(), MemoryError> {
        let mut buf = [0u8; 4];
        match size {
            1 => buf[0] = value as u8,
            2 => BigEndian::write_u16(&mut buf, value as u16),
            4 => BigEndian::write_u32(&mut buf, value),
            _ => return Err(MemoryError::InvalidWidth { width: size }),
        }
        self.write(address, &buf[..size as usize])
    }
}

/// Instruction decoding.
///
/// # Example
///
/// ```
/// use h8_emu::interpreter::{Decoder, InstructionDecoder, Mnemonic};
///
/// let decoder = InstructionDecoder::new();
/// let op = decoder.decode(&[0x0C, 0x8A], 0x100).unwrap(); // mov.b r0l,r2l
/// assert_eq!(op.mnemonic, Mnemonic::Mov);
/// assert_eq!(op.length, 2);
/// ```
pub trait Decoder: Send + Sync {
    /// Decode the instruction starting at `bytes[0]`.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Instruction stream starting at PC; may be longer than needed
    /// * `pc` - Address of `bytes[0]`, recorded in the operation
    fn decode(&self, bytes: &[u8], pc: u32) -> Result<Operation, DecodeError>;

    /// Longest instruction this decoder can produce, in bytes.
    fn max_instruction_len(&self) -> usize;
}

/// Execution of decoded operations.
pub trait Executor: Send {
    /// Execute one operation.
    ///
    /// # Returns
    ///
    /// `Continue` when the next PC is the fall-through address, `Branch`
    /// when the handler chose it, or an error that aborts the step. State
    /// changes made before an error are not rolled back.
    fn execute(
        &mut self,
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<ExecuteResult, ExecError>;
}
