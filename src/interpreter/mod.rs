//! H8/300H interpreter.
//!
//! Decodes and executes H8/300H machine code against a register context
//! whose values may be unknown. Every register slot holds a
//! [`Value`]: either a known number or `Undefined`. Undefinedness flows
//! through arithmetic, and an instruction that needs an unknown flag or
//! jump target fails instead of guessing.
//!
//! # Architecture
//!
//! - [`state`]: registers, sub-register fields, CCR flags, the context
//! - [`operation`]: decoded instructions and their operands
//! - [`decode`]: table-driven opcode decoder
//! - [`execute`]: execution units (ALU, bit, control, transfer, coprocessor)
//! - [`core`]: per-CPU fetch/decode/execute loop
//! - [`engine`]: the `Emulator` owning context, memory and core
//! - [`calling`]: calling-convention helpers for analysis hosts
//!
//! # Example
//!
//! ```
//! use h8_emu::interpreter::{Decoder, InstructionDecoder, Mnemonic};
//!
//! let decoder = InstructionDecoder::new();
//! // add.b r0h,r1l
//! let op = decoder.decode(&[0x08, 0x09], 0x1000).unwrap();
//! assert_eq!(op.mnemonic, Mnemonic::Add);
//! assert_eq!(op.length, 2);
//! ```

pub mod traits;
pub mod mode;
pub mod state;
pub mod operation;
pub mod decode;
pub mod execute;
pub mod core;
pub mod engine;
pub mod calling;

// Re-export key types for convenience
pub use traits::{
    DecodeError, Decoder, ExecError, ExecuteResult, Executor, FlagMask, FlagSet, Memory,
    MemoryError, StepError,
};

pub use mode::CpuMode;

// State types
pub use state::{Field, Flag, RegisterContext, RegisterId, Value};

// Operation types
pub use operation::{InstrFlags, Mnemonic, Operand, OperandKind, Operation, SizeClass};

// Decoder
pub use decode::InstructionDecoder;

// Execute types
pub use execute::{Coprocessor, H8Executor};

// Core types
pub use core::{CoreInterpreter, CoreStatus, StepResult};

// Engine types
pub use engine::{Emulator, EngineStatus};

pub use calling::H8CallingConvention;
