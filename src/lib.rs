//! h8-emu library
//!
//! Decode and execute core for the Renesas H8/300H CPU, with registers
//! that may hold undefined values.

pub mod config;
pub mod device;
pub mod interpreter;
