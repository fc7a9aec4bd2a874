//! Emulated processor instance.
//!
//! The `Emulator` owns everything one H8/300H CPU needs: the register
//! context, a memory, and a core interpreter configured for the CPU mode.
//! It is the unit hosts create, reset, step and snapshot.
//!
//! # Example
//!
//! ```
//! use h8_emu::config::Config;
//! use h8_emu::interpreter::{Emulator, StepResult};
//!
//! let mut emulator = Emulator::from_config(&Config::default());
//! // Reset vector -> 0x100, program: sleep
//! emulator.memory_mut().load(0, &[0x00, 0x00, 0x01, 0x00]).unwrap();
//! emulator.memory_mut().load(0x100, &[0x01, 0x80]).unwrap();
//! emulator.reset();
//!
//! let (result, retired) = emulator.run().unwrap();
//! assert_eq!(result, StepResult::Sleep);
//! assert_eq!(retired, 1);
//! ```

mod emulator;

pub use emulator::{Emulator, EngineStatus};
