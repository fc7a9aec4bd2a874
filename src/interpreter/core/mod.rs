//! Per-CPU interpreter.
//!
//! The `CoreInterpreter` ties together the decoder and executor to run a
//! single H8/300H CPU against a register context and a memory.
//!
//! # Execution Model
//!
//! 1. Fetch up to 10 bytes at PC
//! 2. Decode into an `Operation`
//! 3. Execute it
//! 4. Handle the result (advance PC, branch, or sleep)
//!
//! Status moves strictly `Fetching` -> `Executing` -> `Fetching`, with
//! `Sleeping` after SLEEP and `Error` after a failed step.
//!
//! # Example
//!
//! ```
//! use h8_emu::device::FlatMemory;
//! use h8_emu::interpreter::{CoreInterpreter, RegisterContext, StepResult};
//!
//! let mut mem = FlatMemory::new(0, 0x100);
//! mem.load(0x10, &[0x00, 0x00]).unwrap(); // nop
//! let mut ctx = RegisterContext::new();
//! ctx.set_pc(0x10);
//!
//! let mut interpreter = CoreInterpreter::default();
//! assert_eq!(interpreter.step(&mut ctx, &mut mem).unwrap(), StepResult::Continue);
//! assert_eq!(ctx.pc(), 0x12);
//! ```

mod interpreter;

pub use interpreter::{CoreInterpreter, CoreStatus, StepResult};
