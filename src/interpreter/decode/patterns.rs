//! Operand patterns.
//!
//! A pattern is a pure function from the instruction bytes to its operand
//! list. The decoder only calls a pattern with exactly as many bytes as
//! the rule's length, so fixed indices below that length are safe.
//! Returning `None` marks an encoding whose "must be zero" bits are set;
//! the decoder reports it as reserved.
//!
//! Width parameters (`W`) are access widths in bytes. `AT` is the index
//! of the byte carrying the register nibbles, which moves right by two
//! in the `01 xx` prefixed forms.

use smallvec::{smallvec, SmallVec};

use super::{be16, be24, be32, extend_abs16, extend_abs8, sign_extend};
use crate::interpreter::operation::{AbsoluteForm, Operand};
use crate::interpreter::state::{Field, RegisterId};

/// Operand list produced by a pattern.
pub type Operands = SmallVec<[Operand; 4]>;

/// Pattern function type stored in decode rules.
pub type Pattern = fn(&[u8]) -> Option<Operands>;

#[inline]
fn hi(b: u8) -> u8 {
    b >> 4
}

#[inline]
fn lo(b: u8) -> u8 {
    b & 0x0F
}

/// General register ERn from a 3-bit field; the fourth bit must be clear.
#[inline]
fn er_id(code: u8) -> Option<RegisterId> {
    (code & 0x8 == 0).then(|| RegisterId::er(code))
}

/// Direct register of width `w` from a 4-bit register code.
fn reg(w: u8, code: u8) -> Option<Operand> {
    match w {
        1 => Some(Operand::reg(Field::reg8(code))),
        2 => Some(Operand::reg(Field::reg16(code))),
        4 => er_id(code).map(|r| Operand::reg(Field::full(r))),
        _ => None,
    }
}

#[inline]
fn ccr() -> Operand {
    Operand::reg(Field::CCR)
}

// ============================================================================
// Fixed encodings
// ============================================================================

/// No operands; the whole instruction is keyed by the table.
pub fn p_none(_: &[u8]) -> Option<Operands> {
    Some(SmallVec::new())
}

/// No operands; the second byte must equal `B1` (`0000`, `5470`, ...).
pub fn p_fixed<const B1: u8>(b: &[u8]) -> Option<Operands> {
    (b[1] == B1).then(SmallVec::new)
}

/// `7B 5C 59 8F` / `7B D4 59 8F`.
pub fn p_eepmov<const B1: u8>(b: &[u8]) -> Option<Operands> {
    (b[1] == B1 && b[2] == 0x59 && b[3] == 0x8F).then(SmallVec::new)
}

// ============================================================================
// Register and immediate forms
// ============================================================================

/// `op rs:rd` at byte `AT`.
pub fn p_rs_rd<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let src = if W == 4 { hi(b[AT]) & 0x7 } else { hi(b[AT]) };
    Some(smallvec![reg(W, src)?, reg(W, lo(b[AT]))?])
}

/// `op x:rd`, single register in the low nibble of byte 1.
pub fn p_rd<const W: u8>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![reg(W, lo(b[1]))?])
}

/// `op x:rd` with an implied constant: INC/DEC/ADDS/SUBS.
pub fn p_imm_rd<const W: u8, const N: u32>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::imm(N, W), reg(W, lo(b[1]))?])
}

/// `8d II`: byte immediate to the register in the opcode's low nibble.
pub fn p_imm8_rd(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::imm(b[1] as u32, 1), reg(1, lo(b[0]))?])
}

/// `79 xd IIII`.
pub fn p_imm16_rd(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::imm(be16(b, 2), 2), reg(2, lo(b[1]))?])
}

/// `7A xd IIIIIIII`.
pub fn p_imm32_rd(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::imm(be32(b, 2), 4), reg(4, lo(b[1]))?])
}

/// `0s II`: immediate to CCR (ORC/XORC/ANDC/LDC #).
pub fn p_imm8_ccr(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::imm(b[1] as u32, 1), ccr()])
}

/// `02 0d`: STC CCR,Rd.
pub fn p_stc_reg(b: &[u8]) -> Option<Operands> {
    (hi(b[1]) == 0).then(|| smallvec![ccr(), Operand::reg(Field::reg8(lo(b[1])))])
}

/// `03 0s`: LDC Rs,CCR.
pub fn p_ldc_reg(b: &[u8]) -> Option<Operands> {
    (hi(b[1]) == 0).then(|| smallvec![Operand::reg(Field::reg8(lo(b[1]))), ccr()])
}

/// MULXU/DIVXU/MULXS/DIVXS: the destination is twice the source width.
pub fn p_mulx<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![reg(W, hi(b[AT]))?, reg(W * 2, lo(b[AT]))?])
}

/// `01 F0 6x 0s:0d`: long logical register form.
pub fn p_logic_l(b: &[u8]) -> Option<Operands> {
    Some(smallvec![reg(4, hi(b[3]))?, reg(4, lo(b[3]))?])
}

// ============================================================================
// Data transfer
// ============================================================================

/// Base register from the high nibble, ignoring the direction bit.
#[inline]
fn base(b: u8) -> RegisterId {
    RegisterId::er(hi(b) & 0x7)
}

/// `@aa:8` operand of a `2d aa` / `3s aa` move.
pub fn p_mov_abs8_load(b: &[u8]) -> Option<Operands> {
    let src = Operand::absolute(extend_abs8(b[1]), AbsoluteForm::Short8, 1);
    Some(smallvec![src, reg(1, lo(b[0]))?])
}

pub fn p_mov_abs8_store(b: &[u8]) -> Option<Operands> {
    let dst = Operand::absolute(extend_abs8(b[1]), AbsoluteForm::Short8, 1);
    Some(smallvec![reg(1, lo(b[0]))?, dst])
}

/// `@ERs,Rd`.
pub fn p_mov_ind_load<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::indirect(base(b[AT]), W), reg(W, lo(b[AT]))?])
}

/// `Rs,@ERd`.
pub fn p_mov_ind_store<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![reg(W, lo(b[AT]))?, Operand::indirect(base(b[AT]), W)])
}

/// `@ERs+,Rd` (POP when ERs is ER7).
pub fn p_mov_postinc_load<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::post_increment(base(b[AT]), W), reg(W, lo(b[AT]))?])
}

/// `Rs,@-ERd` (PUSH when ERd is ER7).
pub fn p_mov_predec_store<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    Some(smallvec![reg(W, lo(b[AT]))?, Operand::pre_decrement(base(b[AT]), W)])
}

/// `@(d:16,ERs),Rd`.
pub fn p_mov_disp16_load<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let disp = sign_extend(be16(b, AT + 1), 16);
    Some(smallvec![Operand::displacement(base(b[AT]), disp, W), reg(W, lo(b[AT]))?])
}

/// `Rs,@(d:16,ERd)`.
pub fn p_mov_disp16_store<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let disp = sign_extend(be16(b, AT + 1), 16);
    Some(smallvec![reg(W, lo(b[AT]))?, Operand::displacement(base(b[AT]), disp, W)])
}

/// `@aa:16,Rd`.
pub fn p_mov_abs16_load<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let src = Operand::absolute(extend_abs16(be16(b, AT + 1)), AbsoluteForm::Short16, W);
    Some(smallvec![src, reg(W, lo(b[AT]))?])
}

/// `Rs,@aa:16`.
pub fn p_mov_abs16_store<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let dst = Operand::absolute(extend_abs16(be16(b, AT + 1)), AbsoluteForm::Short16, W);
    Some(smallvec![reg(W, lo(b[AT]))?, dst])
}

/// `@aa:24,Rd`; the address field is 32 bits with the top byte ignored.
pub fn p_mov_abs24_load<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let src = Operand::absolute(be32(b, AT + 1) & 0x00FF_FFFF, AbsoluteForm::Long24, W);
    Some(smallvec![src, reg(W, lo(b[AT]))?])
}

/// `Rs,@aa:24`.
pub fn p_mov_abs24_store<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let dst = Operand::absolute(be32(b, AT + 1) & 0x00FF_FFFF, AbsoluteForm::Long24, W);
    Some(smallvec![reg(W, lo(b[AT]))?, dst])
}

/// Shared validation of the `78 r0 6x yd 00 dddddd` shape. `AT` is the
/// index of the `r0` byte; returns the base, register code and displacement.
fn disp24_fields<const W: u8, const AT: usize>(b: &[u8]) -> Option<(RegisterId, u8, i32)> {
    let inner = if W == 1 { 0x6A } else { 0x6B };
    let valid = b[AT] & 0x8F == 0 && b[AT + 1] == inner && b[AT + 3] == 0;
    valid.then(|| {
        let disp = sign_extend(be24(b, AT + 4), 24);
        (RegisterId::er(hi(b[AT])), lo(b[AT + 2]), disp)
    })
}

/// `@(d:24,ERs),Rd`.
pub fn p_mov_disp24_load<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let (base, code, disp) = disp24_fields::<W, AT>(b)?;
    Some(smallvec![Operand::displacement(base, disp, W), reg(W, code)?])
}

/// `Rs,@(d:24,ERd)`.
pub fn p_mov_disp24_store<const W: u8, const AT: usize>(b: &[u8]) -> Option<Operands> {
    let (base, code, disp) = disp24_fields::<W, AT>(b)?;
    Some(smallvec![reg(W, code)?, Operand::displacement(base, disp, W)])
}

// ============================================================================
// CCR memory forms (01 40 ...)
// ============================================================================

/// Swap the R0 placeholder a move pattern produced for CCR. The register
/// nibble of LDC/STC memory forms must be zero.
fn with_ccr(mut ops: Operands) -> Option<Operands> {
    let slot = ops.iter_mut().find(|o| o.register().is_some())?;
    if slot.register() != Some(Field::r(0)) {
        return None;
    }
    *slot = ccr();
    Some(ops)
}

pub fn p_ldc_ind(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_ind_load::<2, 3>(b)?)
}

pub fn p_stc_ind(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_ind_store::<2, 3>(b)?)
}

pub fn p_ldc_postinc(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_postinc_load::<2, 3>(b)?)
}

pub fn p_stc_predec(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_predec_store::<2, 3>(b)?)
}

pub fn p_ldc_disp16(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_disp16_load::<2, 3>(b)?)
}

pub fn p_stc_disp16(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_disp16_store::<2, 3>(b)?)
}

pub fn p_ldc_abs16(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_abs16_load::<2, 3>(b)?)
}

pub fn p_stc_abs16(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_abs16_store::<2, 3>(b)?)
}

pub fn p_ldc_abs24(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_abs24_load::<2, 3>(b)?)
}

pub fn p_stc_abs24(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_abs24_store::<2, 3>(b)?)
}

pub fn p_ldc_disp24(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_disp24_load::<2, 3>(b)?)
}

pub fn p_stc_disp24(b: &[u8]) -> Option<Operands> {
    with_ccr(p_mov_disp24_store::<2, 3>(b)?)
}

// ============================================================================
// Branches
// ============================================================================

/// `4c dd` / `55 dd`.
pub fn p_disp8(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::pc_relative(sign_extend(b[1] as u32, 8))])
}

/// `58 c0 dddd`.
pub fn p_disp16(b: &[u8]) -> Option<Operands> {
    (lo(b[1]) == 0).then(|| smallvec![Operand::pc_relative(sign_extend(be16(b, 2), 16))])
}

/// `5C 00 dddd`.
pub fn p_bsr16(b: &[u8]) -> Option<Operands> {
    (b[1] == 0).then(|| smallvec![Operand::pc_relative(sign_extend(be16(b, 2), 16))])
}

/// `59 r0` / `5D r0`: JMP/JSR @ERn.
pub fn p_jump_ind(b: &[u8]) -> Option<Operands> {
    (b[1] & 0x8F == 0).then(|| smallvec![Operand::indirect(base(b[1]), 0)])
}

/// `5A aaaaaa` / `5E aaaaaa`.
pub fn p_jump_abs(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::absolute(be24(b, 1), AbsoluteForm::Long24, 0)])
}

/// `5B aa` / `5F aa`: through the vector at `aa`.
pub fn p_jump_mem(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::memory_indirect(b[1] as u32)])
}

/// `57 i0`: TRAPA #0-3.
pub fn p_trapa(b: &[u8]) -> Option<Operands> {
    (b[1] & 0xCF == 0).then(|| smallvec![Operand::imm(((b[1] >> 4) & 0x3) as u32, 1)])
}

// ============================================================================
// Bit manipulation
// ============================================================================

/// `6x nd`: bit number in register Rn.
pub fn p_bit_reg(b: &[u8]) -> Option<Operands> {
    Some(smallvec![reg(1, hi(b[1]))?, reg(1, lo(b[1]))?])
}

/// `7x id` with bit 7 of byte 1 selecting the inverted variant.
pub fn p_bit_imm(b: &[u8]) -> Option<Operands> {
    Some(smallvec![Operand::imm(((b[1] >> 4) & 0x7) as u32, 1), reg(1, lo(b[1]))?])
}

/// `7x 0iii d`: bit 7 of byte 1 must be clear.
pub fn p_bit_imm_strict(b: &[u8]) -> Option<Operands> {
    if b[1] & 0x80 != 0 {
        return None;
    }
    p_bit_imm(b)
}

/// Memory target of a `7C`-`7F` bit operation.
fn bit_target<const ABS: bool>(b: &[u8]) -> Option<Operand> {
    if ABS {
        Some(Operand::absolute(extend_abs8(b[1]), AbsoluteForm::Short8, 1))
    } else {
        (b[1] & 0x8F == 0).then(|| Operand::indirect(base(b[1]), 1))
    }
}

/// `7C r0 6x n0` / `7E aa 6x n0`.
pub fn p_bitm_reg<const ABS: bool>(b: &[u8]) -> Option<Operands> {
    if lo(b[3]) != 0 {
        return None;
    }
    Some(smallvec![reg(1, hi(b[3]))?, bit_target::<ABS>(b)?])
}

/// `7C r0 7x i0`, bit 7 of byte 3 selecting the inverted variant.
pub fn p_bitm_imm<const ABS: bool>(b: &[u8]) -> Option<Operands> {
    if lo(b[3]) != 0 {
        return None;
    }
    Some(smallvec![Operand::imm(((b[3] >> 4) & 0x7) as u32, 1), bit_target::<ABS>(b)?])
}

/// As [`p_bitm_imm`], with bit 7 of byte 3 required clear.
pub fn p_bitm_imm_strict<const ABS: bool>(b: &[u8]) -> Option<Operands> {
    if b[3] & 0x80 != 0 {
        return None;
    }
    p_bitm_imm::<ABS>(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::operation::OperandKind;

    #[test]
    fn test_reg_codes_by_width() {
        assert_eq!(reg(1, 0x9), Some(Operand::reg(Field::rl(1))));
        assert_eq!(reg(2, 0x9), Some(Operand::reg(Field::e(1))));
        assert_eq!(reg(4, 0x1), Some(Operand::reg(Field::er(1))));
        assert_eq!(reg(4, 0x9), None);
    }

    #[test]
    fn test_rs_rd_long_rejects_high_dest() {
        // add.l er1,er2
        let ops = p_rs_rd::<4, 1>(&[0x0A, 0x92]).unwrap();
        assert_eq!(ops[0].register(), Some(Field::er(1)));
        assert_eq!(ops[1].register(), Some(Field::er(2)));
        assert!(p_rs_rd::<4, 1>(&[0x0A, 0x9A]).is_none());
    }

    #[test]
    fn test_push_pop_shapes() {
        // mov.w r3,@-er7 (push.w r3)
        let ops = p_mov_predec_store::<2, 1>(&[0x6D, 0xF3]).unwrap();
        assert_eq!(ops[1], Operand::pre_decrement(RegisterId::SP, 2));
        // mov.l @er7+,er4 (pop.l er4)
        let ops = p_mov_postinc_load::<4, 3>(&[0x01, 0x00, 0x6D, 0x74]).unwrap();
        assert_eq!(ops[0], Operand::post_increment(RegisterId::SP, 4));
        assert_eq!(ops[1].register(), Some(Field::er(4)));
    }

    #[test]
    fn test_disp24_validation() {
        // mov.b @(0x123456,er1),r2l
        let bytes = [0x78, 0x10, 0x6A, 0x2A, 0x00, 0x12, 0x34, 0x56];
        let ops = p_mov_disp24_load::<1, 1>(&bytes).unwrap();
        assert_eq!(ops[0].kind, OperandKind::Displacement { base: RegisterId::ER1, disp: 0x12_3456 });
        let mut bad = bytes;
        bad[4] = 0x01;
        assert!(p_mov_disp24_load::<1, 1>(&bad).is_none());
    }

    #[test]
    fn test_ccr_forms_require_zero_register_nibble() {
        // ldc @er2,ccr
        let ops = p_ldc_ind(&[0x01, 0x40, 0x69, 0x20]).unwrap();
        assert_eq!(ops[1], ccr());
        assert_eq!(ops[0], Operand::indirect(RegisterId::ER2, 2));
        assert!(p_ldc_ind(&[0x01, 0x40, 0x69, 0x21]).is_none());
    }

    #[test]
    fn test_branch_displacements() {
        let ops = p_disp8(&[0x40, 0xFE]).unwrap();
        assert_eq!(ops[0].kind, OperandKind::PcRelative { disp: -2 });
        assert!(p_disp16(&[0x58, 0x71, 0x00, 0x10]).is_none());
        assert!(p_trapa(&[0x57, 0x30]).is_some());
        assert!(p_trapa(&[0x57, 0x31]).is_none());
    }

    #[test]
    fn test_bit_memory_targets() {
        // bset #3,@er4
        let ops = p_bitm_imm_strict::<false>(&[0x7D, 0x40, 0x70, 0x30]).unwrap();
        assert_eq!(ops[0], Operand::imm(3, 1));
        assert_eq!(ops[1], Operand::indirect(RegisterId::ER4, 1));
        // btst r1l,@0xFFFF20
        let ops = p_bitm_reg::<true>(&[0x7E, 0x20, 0x63, 0x90]).unwrap();
        assert_eq!(ops[1], Operand::absolute(0xFF_FF20, AbsoluteForm::Short8, 1));
    }
}
