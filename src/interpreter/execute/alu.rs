//! Integer ALU: arithmetic, logic, shifts, multiply and divide.
//!
//! The pure functions at the top compute a result and its condition flags
//! for a given width. [`ArithUnit`] applies them to decoded operations.
//!
//! # Flag rules
//!
//! | Group | Flags written |
//! |-------|---------------|
//! | ADD, SUB, CMP, NEG, ADDX, SUBX | H N Z V C |
//! | INC, DEC | N Z V |
//! | AND, OR, XOR, NOT, EXTU, EXTS | N Z, V cleared |
//! | Shifts and rotates | N Z V C |
//! | MULXS, DIVXU, DIVXS | N Z |
//! | ADDS, SUBS, MULXU | none |

use crate::interpreter::operation::{InstrFlags, Operand, Operation};
use crate::interpreter::state::{width_mask, Flag, RegisterContext, Value};
use crate::interpreter::traits::{ExecuteResult, FlagMask, FlagSet, Memory};

use super::addressing::{Addressing, Resolved};
use super::{commit, one_operand, src_dst, width, HandlerResult};

/// Add or subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    /// `a - b - carry`.
    Sub,
}

/// Shift and rotate kinds, all by one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Shal,
    Shar,
    Shll,
    Shlr,
    Rotl,
    Rotr,
    Rotxl,
    Rotxr,
}

/// Sign-extend the low `width` bits of `value` to 64 bits.
#[inline]
fn signed(value: u32, width: u32) -> i64 {
    let shift = 64 - width;
    ((value as i64) << shift) >> shift
}

#[inline]
fn msb(value: u32, width: u32) -> bool {
    (value >> (width - 1)) & 1 != 0
}

/// Add or subtract with carry/borrow in, at `width` bits.
///
/// The unsigned and signed results are computed independently: C is the
/// unsigned carry (borrow for subtraction), V the signed overflow, and H
/// the carry out of bit 3, 11 or 27.
pub fn arith(op: ArithOp, a: u32, b: u32, carry_in: bool, width: u32) -> (u32, FlagSet) {
    let mask = width_mask(width);
    let half = width_mask(width - 4);
    let (a, b, c) = (a & mask, b & mask, carry_in as u32);

    let (unsigned, signed_result, carry, half_carry) = match op {
        ArithOp::Add => {
            let sum = a as u64 + b as u64 + c as u64;
            (
                sum,
                signed(a, width) + signed(b, width) + c as i64,
                sum > mask as u64,
                (a & half) + (b & half) + c > half,
            )
        }
        ArithOp::Sub => (
            (a as u64).wrapping_sub(b as u64 + c as u64),
            signed(a, width) - signed(b, width) - c as i64,
            (a as u64) < b as u64 + c as u64,
            (a & half) < (b & half) + c,
        ),
    };

    let result = unsigned as u32 & mask;
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;

    let mut flags = FlagSet::from_result(result, width);
    flags.c = carry;
    flags.v = signed_result < min || signed_result > max;
    flags.h = half_carry;
    (result, flags)
}

/// N and Z of a logical result; V cleared.
#[inline]
pub fn logic_flags(result: u32, width: u32) -> FlagSet {
    FlagSet::from_result(result, width)
}

/// One-bit shift or rotate. C receives the bit shifted out.
pub fn shift(op: ShiftOp, value: u32, carry_in: bool, width: u32) -> (u32, FlagSet) {
    let mask = width_mask(width);
    let value = value & mask;
    let top = msb(value, width);
    let bottom = value & 1 != 0;
    let high_bit = 1u32 << (width - 1);

    let (result, carry) = match op {
        ShiftOp::Shal | ShiftOp::Shll => (value << 1, top),
        ShiftOp::Shar => ((value >> 1) | (value & high_bit), bottom),
        ShiftOp::Shlr => (value >> 1, bottom),
        ShiftOp::Rotl => ((value << 1) | top as u32, top),
        ShiftOp::Rotr => ((value >> 1) | if bottom { high_bit } else { 0 }, bottom),
        ShiftOp::Rotxl => ((value << 1) | carry_in as u32, top),
        ShiftOp::Rotxr => ((value >> 1) | if carry_in { high_bit } else { 0 }, bottom),
    };
    let result = result & mask;

    let mut flags = FlagSet::from_result(result, width);
    flags.c = carry;
    flags.v = op == ShiftOp::Shal && top != msb(result, width);
    (result, flags)
}

/// Multiply two `width`-bit values into a `2 * width`-bit product.
pub fn multiply(a: u32, b: u32, width: u32, is_signed: bool) -> u32 {
    let product = if is_signed {
        (signed(a, width) * signed(b, width)) as u64
    } else {
        (a & width_mask(width)) as u64 * (b & width_mask(width)) as u64
    };
    product as u32 & width_mask(width * 2)
}

/// Divide a `2 * width`-bit dividend by a `width`-bit divisor.
///
/// Returns `(quotient, remainder)`, each `width` bits, or `None` when the
/// divisor is zero or the quotient does not fit.
pub fn divide(dividend: u32, divisor: u32, width: u32, is_signed: bool) -> Option<(u32, u32)> {
    let mask = width_mask(width);
    if is_signed {
        let n = signed(dividend, width * 2);
        let d = signed(divisor, width);
        if d == 0 {
            return None;
        }
        let (q, r) = (n / d, n % d);
        let limit = 1i64 << (width - 1);
        if q < -limit || q >= limit {
            return None;
        }
        Some((q as u32 & mask, r as u32 & mask))
    } else {
        let n = dividend as u64 & width_mask(width * 2) as u64;
        let d = (divisor & mask) as u64;
        if d == 0 {
            return None;
        }
        let q = n / d;
        if q > mask as u64 {
            return None;
        }
        Some((q as u32, (n % d) as u32))
    }
}

/// Executes arithmetic, logic and shift operations.
pub struct ArithUnit;

impl ArithUnit {
    /// ADD/SUB, ADDX/SUBX and ADDS/SUBS.
    pub fn add_sub(
        op: &Operation,
        kind: ArithOp,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let b = addr.read(src, ctx, mem)?;
        let target = addr.resolve(dst, ctx, mem)?;

        let with_carry = op.flags.contains(InstrFlags::WITH_CARRY);
        let carry = if with_carry {
            ctx.ccr().map(|ccr| ccr & Flag::C.mask())
        } else {
            Value::Known(0)
        };

        let (Value::Known(a), Value::Known(b), Value::Known(carry)) = (target.value, b, carry) else {
            return Self::poison(op, dst, &target, ctx, mem, addr);
        };

        let (result, mut flags) = arith(kind, a, b, carry != 0, width);
        if with_carry {
            // Z can only be cleared across a multi-precision chain.
            flags.z &= ctx.get_flag(Flag::Z)?;
        }
        addr.update(dst, &target, ctx, mem, Value::Known(result))?;
        commit(op, ctx, flags, FlagMask::HNZVC);
        Ok(ExecuteResult::Continue)
    }

    /// CMP: subtract for flags only.
    pub fn cmp(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let b = addr.read(src, ctx, mem)?;
        let a = addr.read(dst, ctx, mem)?;
        match (a, b) {
            (Value::Known(a), Value::Known(b)) => {
                let (_, flags) = arith(ArithOp::Sub, a, b, false, width);
                commit(op, ctx, flags, FlagMask::HNZVC);
            }
            _ => ctx.undefine_flags(),
        }
        Ok(ExecuteResult::Continue)
    }

    /// INC/DEC by the immediate operand.
    pub fn inc_dec(
        op: &Operation,
        kind: ArithOp,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let step = addr.read(src, ctx, mem)?;
        let target = addr.resolve(dst, ctx, mem)?;
        let (Value::Known(a), Value::Known(step)) = (target.value, step) else {
            return Self::poison(op, dst, &target, ctx, mem, addr);
        };
        let (result, flags) = arith(kind, a, step, false, width);
        addr.update(dst, &target, ctx, mem, Value::Known(result))?;
        commit(op, ctx, flags, FlagMask::NZV);
        Ok(ExecuteResult::Continue)
    }

    /// NEG: two's complement.
    pub fn neg(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        Self::unary(op, ctx, mem, addr, FlagMask::HNZVC, |a| arith(ArithOp::Sub, 0, a, false, width))
    }

    /// AND/OR/XOR with `f` combining source and destination.
    pub fn logic(
        op: &Operation,
        f: fn(u32, u32) -> u32,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let b = addr.read(src, ctx, mem)?;
        let target = addr.resolve(dst, ctx, mem)?;
        let (Value::Known(a), Value::Known(b)) = (target.value, b) else {
            return Self::poison(op, dst, &target, ctx, mem, addr);
        };
        let result = f(a, b) & width_mask(width);
        addr.update(dst, &target, ctx, mem, Value::Known(result))?;
        commit(op, ctx, logic_flags(result, width), FlagMask::NZV);
        Ok(ExecuteResult::Continue)
    }

    /// NOT: one's complement.
    pub fn not(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        Self::unary(op, ctx, mem, addr, FlagMask::NZV, |a| {
            let result = !a & width_mask(width);
            (result, logic_flags(result, width))
        })
    }

    /// EXTU/EXTS: extend the lower half of the register into the whole.
    pub fn extend(
        op: &Operation,
        is_signed: bool,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let half = width / 2;
        Self::unary(op, ctx, mem, addr, FlagMask::NZV, |a| {
            let result = if is_signed {
                signed(a & width_mask(half), half) as u32 & width_mask(width)
            } else {
                a & width_mask(half)
            };
            (result, logic_flags(result, width))
        })
    }

    /// Shifts and rotates.
    pub fn shift(
        op: &Operation,
        kind: ShiftOp,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let through_carry = matches!(kind, ShiftOp::Rotxl | ShiftOp::Rotxr);
        let carry = ctx.ccr().map(|ccr| ccr & Flag::C.mask());
        if through_carry && carry.is_undefined() {
            let dst = one_operand(op)?;
            let target = addr.resolve(dst, ctx, mem)?;
            return Self::poison(op, dst, &target, ctx, mem, addr);
        }
        let carry_in = carry.known().map_or(false, |c| c != 0);
        Self::unary(op, ctx, mem, addr, FlagMask::N | FlagMask::Z | FlagMask::V | FlagMask::C, |a| {
            shift(kind, a, carry_in, width)
        })
    }

    /// MULXU/MULXS: `width` x `width` into the double-width destination.
    pub fn multiply(
        op: &Operation,
        is_signed: bool,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let b = addr.read(src, ctx, mem)?;
        let target = addr.resolve(dst, ctx, mem)?;
        let (Value::Known(a), Value::Known(b)) = (target.value, b) else {
            return Self::poison(op, dst, &target, ctx, mem, addr);
        };
        let product = multiply(a, b, width, is_signed);
        addr.update(dst, &target, ctx, mem, Value::Known(product))?;
        commit(op, ctx, FlagSet::from_result(product, width * 2), FlagMask::N | FlagMask::Z);
        Ok(ExecuteResult::Continue)
    }

    /// DIVXU/DIVXS: remainder in the upper half, quotient in the lower.
    ///
    /// Division by zero or an overflowing quotient leaves the destination
    /// Undefined.
    pub fn divide(
        op: &Operation,
        is_signed: bool,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let divisor = addr.read(src, ctx, mem)?;
        let target = addr.resolve(dst, ctx, mem)?;
        let (Value::Known(dividend), Value::Known(divisor)) = (target.value, divisor) else {
            return Self::poison(op, dst, &target, ctx, mem, addr);
        };
        let divisor = divisor & width_mask(width);

        let quotient = divide(dividend, divisor, width, is_signed);
        let result = quotient.map(|(q, r)| (r << width) | q);
        addr.update(dst, &target, ctx, mem, result.map_or(Value::Undefined, Value::Known))?;

        let negative = if is_signed {
            match quotient {
                Some((q, _)) => msb(q, width),
                None => divisor != 0 && msb(dividend, width * 2) != msb(divisor, width),
            }
        } else {
            msb(divisor, width)
        };
        let flags = FlagSet { n: negative, z: divisor == 0, ..FlagSet::default() };
        commit(op, ctx, flags, FlagMask::N | FlagMask::Z);
        Ok(ExecuteResult::Continue)
    }

    /// Read-modify-write of the single (last) operand.
    fn unary(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
        mask: FlagMask,
        f: impl FnOnce(u32) -> (u32, FlagSet),
    ) -> HandlerResult {
        let dst = one_operand(op)?;
        let target = addr.resolve(dst, ctx, mem)?;
        let Value::Known(a) = target.value else {
            return Self::poison(op, dst, &target, ctx, mem, addr);
        };
        let (result, flags) = f(a);
        addr.update(dst, &target, ctx, mem, Value::Known(result))?;
        commit(op, ctx, flags, mask);
        Ok(ExecuteResult::Continue)
    }

    /// An input was Undefined: so is the destination, and so are the flags
    /// if the operation writes any.
    fn poison(
        op: &Operation,
        dst: &Operand,
        target: &Resolved,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        log::debug!("{} at {:06X}: undefined input", op.name(), op.address);
        addr.update(dst, target, ctx, mem, Value::Undefined)?;
        if op.flags.contains(InstrFlags::SETS_FLAGS) {
            ctx.undefine_flags();
        }
        Ok(ExecuteResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_borrow_at_long_width() {
        let (result, flags) = arith(ArithOp::Sub, 0, 1, false, 32);
        assert_eq!(result, 0xFFFF_FFFF);
        assert!(flags.c);
        assert!(!flags.z);
        assert!(flags.n);
        assert!(!flags.v);
    }

    #[test]
    fn test_add_flags_per_width() {
        // 0x7F + 1 overflows signed bytes and carries out of bit 3
        let (result, flags) = arith(ArithOp::Add, 0x7F, 1, false, 8);
        assert_eq!(result, 0x80);
        assert!(flags.v && flags.n && flags.h);
        assert!(!flags.c);

        // 0xFFFF + 1 wraps words to zero
        let (result, flags) = arith(ArithOp::Add, 0xFFFF, 1, false, 16);
        assert_eq!(result, 0);
        assert!(flags.z && flags.c && flags.h);
        assert!(!flags.v);

        // Half-carry out of bit 27 for longs
        let (_, flags) = arith(ArithOp::Add, 0x0400_0000, 0x0400_0000, false, 32);
        assert!(!flags.h);
        let (_, flags) = arith(ArithOp::Add, 0x0FFF_FFFF, 1, false, 32);
        assert!(flags.h);
    }

    #[test]
    fn test_carry_in() {
        let (result, flags) = arith(ArithOp::Add, 0xFE, 1, true, 8);
        assert_eq!(result, 0);
        assert!(flags.c && flags.z);

        let (result, flags) = arith(ArithOp::Sub, 0, 0, true, 8);
        assert_eq!(result, 0xFF);
        assert!(flags.c);
    }

    #[test]
    fn test_sub_signed_overflow() {
        // -128 - 1 overflows
        let (result, flags) = arith(ArithOp::Sub, 0x80, 1, false, 8);
        assert_eq!(result, 0x7F);
        assert!(flags.v);
        assert!(!flags.c);
    }

    #[test]
    fn test_shifts() {
        let (r, f) = shift(ShiftOp::Shll, 0x81, false, 8);
        assert_eq!(r, 0x02);
        assert!(f.c && !f.v);

        let (r, f) = shift(ShiftOp::Shal, 0x40, false, 8);
        assert_eq!(r, 0x80);
        assert!(f.v && f.n && !f.c);

        let (r, f) = shift(ShiftOp::Shar, 0x8001, false, 16);
        assert_eq!(r, 0xC000);
        assert!(f.c && f.n);

        let (r, _) = shift(ShiftOp::Shlr, 0x8000_0000, false, 32);
        assert_eq!(r, 0x4000_0000);

        let (r, f) = shift(ShiftOp::Rotl, 0x80, false, 8);
        assert_eq!(r, 0x01);
        assert!(f.c);

        let (r, f) = shift(ShiftOp::Rotxr, 0x02, true, 8);
        assert_eq!(r, 0x81);
        assert!(!f.c);

        let (r, _) = shift(ShiftOp::Rotr, 0x0001, false, 16);
        assert_eq!(r, 0x8000);
    }

    #[test]
    fn test_multiply() {
        assert_eq!(multiply(0xFF, 0xFF, 8, false), 0xFE01);
        // -1 * -1
        assert_eq!(multiply(0xFF, 0xFF, 8, true), 1);
        // -2 * 3 in words
        assert_eq!(multiply(0xFFFE, 3, 16, true), 0xFFFF_FFFA);
    }

    #[test]
    fn test_divide() {
        assert_eq!(divide(100, 7, 8, false), Some((14, 2)));
        assert_eq!(divide(100, 0, 8, false), None);
        // Quotient too large for a byte
        assert_eq!(divide(0x1000, 2, 8, false), None);
        // -7 / 2 = -3 rem -1
        assert_eq!(divide(0xFFF9, 2, 8, true), Some((0xFD, 0xFF)));
        assert_eq!(divide(0x0001_0000, 0x10, 16, false), Some((0x1000, 0)));
    }
}
