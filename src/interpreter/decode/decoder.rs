//! Table-driven instruction decoder.
//!
//! # How It Works
//!
//! 1. The first byte indexes [`PRIMARY`]
//! 2. Subtable entries select on a bit field of a later byte until a rule is reached
//! 3. The rule's length is checked against the available bytes
//! 4. The rule's pattern extracts the operands, or rejects a reserved encoding
//!
//! Decoding is a pure function of the input bytes: the decoder holds no
//! state beyond statistics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::table::{Entry, PRIMARY};
use super::MAX_INSTRUCTION_LEN;
use crate::interpreter::operation::Operation;
use crate::interpreter::traits::{DecodeError, Decoder};

/// H8/300H instruction decoder.
pub struct InstructionDecoder {
    table: &'static [Entry; 256],

    /// Statistics: successful decodes.
    decode_count: AtomicU64,
    /// Statistics: reserved encodings seen.
    reserved_count: AtomicU64,
}

impl Default for InstructionDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionDecoder {
    /// Decoder over the built-in opcode map.
    pub fn new() -> Self {
        Self {
            table: &PRIMARY,
            decode_count: AtomicU64::new(0),
            reserved_count: AtomicU64::new(0),
        }
    }

    /// Decode statistics: (decoded, reserved).
    pub fn stats(&self) -> (u64, u64) {
        (
            self.decode_count.load(Ordering::Relaxed),
            self.reserved_count.load(Ordering::Relaxed),
        )
    }

    fn reserved(&self, bytes: &[u8], pc: u32) -> DecodeError {
        self.reserved_count.fetch_add(1, Ordering::Relaxed);
        let opcode = match bytes {
            [a, b, ..] => u16::from_be_bytes([*a, *b]),
            [a] => *a as u16,
            [] => 0,
        };
        log::debug!("reserved opcode {:04X} at {:06X}", opcode, pc);
        DecodeError::Reserved { opcode, pc }
    }
}

impl Decoder for InstructionDecoder {
    fn decode(&self, bytes: &[u8], pc: u32) -> Result<Operation, DecodeError> {
        let first = *bytes.first().ok_or(DecodeError::Incomplete { needed: 1, have: 0 })?;
        let have = bytes.len();

        let mut entry = &self.table[first as usize];
        let rule = loop {
            match entry {
                Entry::Rule(rule) => break rule,
                Entry::Reserved => return Err(self.reserved(bytes, pc)),
                Entry::Table(sub) => {
                    let at = sub.key.byte as usize;
                    let key = *bytes
                        .get(at)
                        .ok_or(DecodeError::Incomplete { needed: at + 1, have })?;
                    entry = sub.entries.get(sub.key.index(key)).unwrap_or(&Entry::Reserved);
                }
            }
        };

        let length = rule.length as usize;
        if have < length {
            return Err(DecodeError::Incomplete { needed: length, have });
        }

        let operands: SmallVec<_> = match (rule.pattern)(&bytes[..length]) {
            Some(operands) => operands,
            None => return Err(self.reserved(bytes, pc)),
        };

        self.decode_count.fetch_add(1, Ordering::Relaxed);

        let mut op = Operation::new(pc & 0x00FF_FFFF, rule.mnemonic, rule.length, rule.size, rule.flags);
        op.operands = operands;
        Ok(op)
    }

    fn max_instruction_len(&self) -> usize {
        MAX_INSTRUCTION_LEN
    }
}
