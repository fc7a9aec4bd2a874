//! Register/flag context for one emulated H8/300H.
//!
//! `RegisterContext` owns the only copy of register storage. Sub-register
//! and flag accessors are bit-slice views over it, driven by the metadata
//! in [`super::registers`].

use std::fmt;

use super::registers::{width_mask, Field, Flag, RegisterId, Value, FLAGS};
use crate::interpreter::traits::{ExecError, FlagMask, FlagSet};

/// Register storage plus execution bookkeeping.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterContext {
    regs: [Value; RegisterId::COUNT],

    // === Bookkeeping ===
    /// Instructions executed since construction/reset.
    pub instructions: u64,
    /// Set by SLEEP, cleared by reset.
    pub sleeping: bool,
}

impl Default for RegisterContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterContext {
    /// All registers zeroed and defined.
    pub fn new() -> Self {
        Self {
            regs: [Value::Known(0); RegisterId::COUNT],
            instructions: 0,
            sleeping: false,
        }
    }

    /// Re-initialize in place.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // ========================================================================
    // Backing registers
    // ========================================================================

    #[inline]
    pub fn get(&self, reg: RegisterId) -> Value {
        self.regs[reg.index()]
    }

    /// Write a backing register, masking to its width.
    ///
    /// The program counter never becomes Undefined: control transfers to an
    /// unknown target are reported by the handlers before they get here.
    #[inline]
    pub fn set(&mut self, reg: RegisterId, value: Value) {
        if reg == RegisterId::PC && value.is_undefined() {
            log::debug!("ignoring undefined write to pc");
            return;
        }
        let mask = width_mask(reg.width());
        self.regs[reg.index()] = value.map(|v| v & mask);
    }

    /// Shorthand for `set(reg, Value::Known(value))`.
    #[inline]
    pub fn set_known(&mut self, reg: RegisterId, value: u32) {
        self.set(reg, Value::Known(value));
    }

    // ========================================================================
    // Fields (sub-registers)
    // ========================================================================

    /// Read the bit slice a field describes.
    pub fn get_field(&self, field: Field) -> Value {
        let meta = field.meta();
        let mask = width_mask(meta.width);
        self.get(meta.backing).map(|v| (v >> meta.offset) & mask)
    }

    /// Write the bit slice a field describes, preserving the other bits.
    ///
    /// Writing Undefined makes the whole backing register Undefined. A
    /// concrete write into an Undefined register leaves it Undefined, since
    /// the bits outside the field are still unknown.
    pub fn set_field(&mut self, field: Field, value: Value) {
        let meta = field.meta();
        if field.is_full() {
            self.set(meta.backing, value);
        } else {
            self.set_slice(meta.backing, meta.offset, meta.width, value);
        }
    }

    fn set_slice(&mut self, backing: RegisterId, offset: u32, width: u32, value: Value) {
        let mask = width_mask(width) << offset;
        let merged = self
            .get(backing)
            .zip_with(value, |old, v| (old & !mask) | ((v << offset) & mask));
        self.set(backing, merged);
    }

    // ========================================================================
    // Condition codes
    // ========================================================================

    /// Raw CCR contents.
    #[inline]
    pub fn ccr(&self) -> Value {
        self.get(RegisterId::CCR)
    }

    /// Read one condition flag.
    ///
    /// Fails rather than guessing when CCR is Undefined.
    pub fn get_flag(&self, flag: Flag) -> Result<bool, ExecError> {
        match self.ccr() {
            Value::Known(ccr) => Ok(ccr & flag.mask() != 0),
            Value::Undefined => Err(ExecError::UndefinedFlag { flag: flag.name() }),
        }
    }

    /// Set or clear one condition flag. No effect while CCR is Undefined.
    pub fn set_flag(&mut self, flag: Flag, state: bool) {
        let meta = flag.meta();
        self.set_slice(meta.backing, meta.offset, meta.width, Value::Known(state as u32));
    }

    /// Mark the whole CCR Undefined.
    pub fn undefine_flags(&mut self) {
        self.set(RegisterId::CCR, Value::Undefined);
    }

    /// Write the flags selected by `mask` from a computed flag set.
    pub fn commit_flags(&mut self, flags: FlagSet, mask: FlagMask) {
        let Value::Known(mut ccr) = self.ccr() else {
            return;
        };
        for flag in FLAGS {
            let Some(state) = flags.get(flag) else { continue };
            if !mask.covers(flag) {
                continue;
            }
            if state {
                ccr |= flag.mask();
            } else {
                ccr &= !flag.mask();
            }
        }
        self.set_known(RegisterId::CCR, ccr);
    }

    // ========================================================================
    // Program counter and stack pointer
    // ========================================================================

    /// Current program counter.
    #[inline]
    pub fn pc(&self) -> u32 {
        // `set` keeps PC defined.
        self.get(RegisterId::PC).known().unwrap_or_default()
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u32) {
        self.set_known(RegisterId::PC, pc);
    }

    /// Advance PC by `bytes`, wrapping within 24 bits.
    #[inline]
    pub fn advance_pc(&mut self, bytes: u32) {
        self.set_pc(self.pc().wrapping_add(bytes));
    }

    #[inline]
    pub fn sp(&self) -> Value {
        self.get(RegisterId::SP)
    }

    #[inline]
    pub fn set_sp(&mut self, sp: u32) {
        self.set_known(RegisterId::SP, sp);
    }

    /// Count one retired instruction.
    #[inline]
    pub fn record_instruction(&mut self) {
        self.instructions += 1;
    }
}

impl fmt::Debug for RegisterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show non-zero registers
        let shown: Vec<_> = (0..RegisterId::COUNT)
            .filter_map(RegisterId::from_index)
            .filter(|&r| self.get(r) != Value::Known(0))
            .map(|r| format!("{}: {:?}", r, self.get(r)))
            .collect();

        f.debug_struct("RegisterContext")
            .field("regs", &shown)
            .field("instructions", &self.instructions)
            .field("sleeping", &self.sleeping)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_register_aliasing() {
        let mut ctx = RegisterContext::new();
        ctx.set_field(Field::r(0), Value::Known(0x1234));
        assert_eq!(ctx.get_field(Field::rh(0)), Value::Known(0x12));
        assert_eq!(ctx.get_field(Field::rl(0)), Value::Known(0x34));

        ctx.set_field(Field::rl(0), Value::Known(0xAB));
        assert_eq!(ctx.get_field(Field::r(0)), Value::Known(0x12AB));
    }

    #[test]
    fn test_full_register_slices() {
        let mut ctx = RegisterContext::new();
        ctx.set_known(RegisterId::ER3, 0xDEAD_BEEF);
        assert_eq!(ctx.get_field(Field::e(3)), Value::Known(0xDEAD));
        assert_eq!(ctx.get_field(Field::r(3)), Value::Known(0xBEEF));
        assert_eq!(ctx.get_field(Field::rh(3)), Value::Known(0xBE));
        assert_eq!(ctx.get_field(Field::rl(3)), Value::Known(0xEF));

        ctx.set_field(Field::e(3), Value::Known(0x0001));
        assert_eq!(ctx.get(RegisterId::ER3), Value::Known(0x0001_BEEF));
    }

    #[test]
    fn test_width_masking() {
        let mut ctx = RegisterContext::new();
        ctx.set_pc(0x0123_4567);
        assert_eq!(ctx.pc(), 0x23_4567);
        ctx.set_known(RegisterId::CCR, 0x1FF);
        assert_eq!(ctx.ccr(), Value::Known(0xFF));
        ctx.set_field(Field::r(1), Value::Known(0x1_FFFF));
        assert_eq!(ctx.get(RegisterId::ER1), Value::Known(0xFFFF));
    }

    #[test]
    fn test_undefined_field_write_spreads() {
        let mut ctx = RegisterContext::new();
        ctx.set_known(RegisterId::ER2, 0x1111_2222);
        ctx.set_field(Field::rl(2), Value::Undefined);
        assert!(ctx.get(RegisterId::ER2).is_undefined());
        assert!(ctx.get_field(Field::e(2)).is_undefined());

        // A concrete slice does not make the rest known again.
        ctx.set_field(Field::r(2), Value::Known(5));
        assert!(ctx.get(RegisterId::ER2).is_undefined());

        ctx.set_known(RegisterId::ER2, 7);
        assert_eq!(ctx.get_field(Field::r(2)), Value::Known(7));
    }

    #[test]
    fn test_flags() {
        let mut ctx = RegisterContext::new();
        ctx.set_flag(Flag::Z, true);
        ctx.set_flag(Flag::C, true);
        assert_eq!(ctx.ccr(), Value::Known(0x05));
        assert!(ctx.get_flag(Flag::Z).unwrap());
        ctx.set_flag(Flag::Z, false);
        assert!(!ctx.get_flag(Flag::Z).unwrap());
        assert!(ctx.get_flag(Flag::C).unwrap());
    }

    #[test]
    fn test_undefined_flags_fail() {
        let mut ctx = RegisterContext::new();
        ctx.undefine_flags();
        assert_eq!(ctx.get_flag(Flag::C), Err(ExecError::UndefinedFlag { flag: "C" }));
        ctx.set_flag(Flag::C, true);
        assert!(ctx.ccr().is_undefined());
    }

    #[test]
    fn test_commit_flags_respects_mask() {
        let mut ctx = RegisterContext::new();
        ctx.set_known(RegisterId::CCR, 0x81); // I and C
        let flags = FlagSet { n: true, z: false, v: true, c: false, h: true };
        ctx.commit_flags(flags, FlagMask::N | FlagMask::Z | FlagMask::V);
        // C untouched, H untouched, I untouched
        assert_eq!(ctx.ccr(), Value::Known(0x80 | 0x08 | 0x02 | 0x01));
    }

    #[test]
    fn test_pc_never_undefined() {
        let mut ctx = RegisterContext::new();
        ctx.set_pc(0x100);
        ctx.set(RegisterId::PC, Value::Undefined);
        assert_eq!(ctx.pc(), 0x100);
        ctx.advance_pc(4);
        assert_eq!(ctx.pc(), 0x104);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ctx = RegisterContext::new();
        ctx.set_known(RegisterId::ER0, 1);
        let snapshot = ctx.clone();
        ctx.set_known(RegisterId::ER0, 2);
        assert_eq!(snapshot.get(RegisterId::ER0), Value::Known(1));
        assert_ne!(snapshot, ctx);
    }
}
