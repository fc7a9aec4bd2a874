//! Execution units for H8/300H operations.
//!
//! Each unit handles one category of operations:
//!
//! | Unit | Operations |
//! |------|------------|
//! | [`ArithUnit`] | Arithmetic, logic, shifts, multiply/divide |
//! | [`BitUnit`] | Single-bit set/clear/test and carry-bit logic |
//! | [`TransferUnit`] | MOV, EEPMOV, LDM/STM, CCR operations |
//! | [`ControlUnit`] | Branch, call, return, TRAPA/RTE, SLEEP |
//! | [`CoprocessorTable`] | Host-attached coprocessors |
//!
//! [`H8Executor`] owns the mode-dependent state and dispatches with a
//! single `match` on the mnemonic.
//!
//! # Example
//!
//! ```
//! use h8_emu::device::FlatMemory;
//! use h8_emu::interpreter::execute::H8Executor;
//! use h8_emu::interpreter::{Decoder, ExecuteResult, Executor, InstructionDecoder, RegisterContext};
//!
//! let op = InstructionDecoder::new().decode(&[0x40, 0x10], 0x100).unwrap(); // bra .+0x10
//! let mut ctx = RegisterContext::new();
//! let mut mem = FlatMemory::new(0, 0x1000);
//! let result = H8Executor::default().execute(&op, &mut ctx, &mut mem).unwrap();
//! assert_eq!(result, ExecuteResult::Branch { target: 0x112 });
//! ```

pub mod addressing;
pub mod alu;
mod bit;
mod control;
mod coprocessor;
mod executor;
mod transfer;

pub use addressing::{Addressing, Resolved, Transfer};
pub use alu::{arith, logic_flags, ArithOp, ArithUnit, ShiftOp};
pub use bit::BitUnit;
pub use control::{evaluate_condition, ControlUnit};
pub use coprocessor::{Coprocessor, CoprocessorTable, COPROCESSOR_SLOTS};
pub use executor::H8Executor;
pub use transfer::TransferUnit;

use crate::interpreter::operation::{InstrFlags, Operand, Operation};
use crate::interpreter::state::RegisterContext;
use crate::interpreter::traits::{ExecError, ExecuteResult, FlagMask, FlagSet};

/// Return type shared by every handler.
pub(crate) type HandlerResult = Result<ExecuteResult, ExecError>;

/// Operation width in bits.
pub(crate) fn width(op: &Operation) -> Result<u32, ExecError> {
    match op.size.bits() {
        0 => Err(ExecError::InvalidOperation(format!("{} needs a size", op.name()))),
        bits => Ok(bits),
    }
}

/// Source and destination of a two-operand operation.
pub(crate) fn src_dst(op: &Operation) -> Result<(&Operand, &Operand), ExecError> {
    match op.operands.as_slice() {
        [src, dst] => Ok((src, dst)),
        other => Err(ExecError::InvalidOperation(format!(
            "{} expects 2 operands, got {}",
            op.name(),
            other.len()
        ))),
    }
}

/// The last operand: the only one for unary operations.
pub(crate) fn one_operand(op: &Operation) -> Result<&Operand, ExecError> {
    op.operands
        .last()
        .ok_or_else(|| ExecError::InvalidOperation(format!("{} has no operands", op.name())))
}

/// Write flags, but only for the flag-setting variant of an operation.
#[inline]
pub(crate) fn commit(op: &Operation, ctx: &mut RegisterContext, flags: FlagSet, mask: FlagMask) {
    if op.flags.contains(InstrFlags::SETS_FLAGS) {
        ctx.commit_flags(flags, mask);
    }
}
