//! Memory devices the core executes against.
//!
//! The interpreter only sees the [`Memory`](crate::interpreter::Memory)
//! trait; this module provides the bundled implementation.

pub mod memory;

pub use memory::FlatMemory;
