//! Instruction decoder for the H8/300H.
//!
//! Decoding walks a static, byte-indexed dispatch table ([`table::PRIMARY`]).
//! Each entry is a terminal rule, a nested subtable keyed on a later byte
//! or nibble, or the reserved sentinel. Terminal rules name an operand
//! pattern ([`patterns`]) that turns the instruction bytes into operands.
//!
//! # H8/300H Instruction Format
//!
//! Instructions are 2 to 10 bytes. The first byte selects the
//! instruction group, and register fields usually sit in the nibbles of
//! the second byte:
//!
//! | Length | Typical shape |
//! |--------|---------------|
//! | 2 | `op rs:rd` |
//! | 4 | `op 0:rd imm16`, `6E ers:rd disp16`, `01 xx op regs` |
//! | 6 | `7A 0:erd imm32`, `6A 2:rd 00 abs24` |
//! | 8-10 | `d:24` displacement forms |
//!
//! # Example
//!
//! ```
//! use h8_emu::interpreter::decode::InstructionDecoder;
//! use h8_emu::interpreter::traits::Decoder;
//!
//! let decoder = InstructionDecoder::new();
//! let op = decoder.decode(&[0x79, 0x03, 0x12, 0x34], 0x200).unwrap(); // mov.w #0x1234,r3
//! assert_eq!(op.length, 4);
//! ```

mod decoder;
pub mod patterns;
pub mod table;

pub use decoder::InstructionDecoder;
pub use table::{Entry, Key, Rule, Subtable, PRIMARY};

/// Longest H8/300H instruction in bytes.
pub const MAX_INSTRUCTION_LEN: usize = 10;

/// Sign-extend the low `bits` bits of `value`.
#[inline]
pub fn sign_extend(value: u32, bits: u8) -> i32 {
    let shift = 32 - bits as u32;
    ((value << shift) as i32) >> shift
}

/// Big-endian 16-bit field at `at`.
#[inline]
pub fn be16(bytes: &[u8], at: usize) -> u32 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]]) as u32
}

/// Big-endian 24-bit field at `at`.
#[inline]
pub fn be24(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([0, bytes[at], bytes[at + 1], bytes[at + 2]])
}

/// Big-endian 32-bit field at `at`.
#[inline]
pub fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// `@aa:8` addresses the top 256 bytes of the address space.
#[inline]
pub const fn extend_abs8(aa: u8) -> u32 {
    0x00FF_FF00 | aa as u32
}

/// `@aa:16` is sign-extended to 24 bits.
#[inline]
pub const fn extend_abs16(aa: u32) -> u32 {
    if aa & 0x8000 != 0 {
        0x00FF_0000 | (aa & 0xFFFF)
    } else {
        aa & 0xFFFF
    }
}
