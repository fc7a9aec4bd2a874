//! Single-bit operations on a byte register or a byte in memory.
//!
//! The first operand selects the bit (`#xx:3` or the low three bits of a
//! register); the second is the byte being tested or modified. BLD, BST
//! and the logical bit operations move the bit through C, inverted when
//! the operation carries [`InstrFlags::INVERT`].

use crate::interpreter::operation::{InstrFlags, Mnemonic, Operation};
use crate::interpreter::state::{Flag, RegisterContext, Value};
use crate::interpreter::traits::{ExecError, ExecuteResult, Memory};

use super::addressing::Addressing;
use super::{src_dst, HandlerResult};

/// Executes BSET, BCLR, BNOT, BTST, BLD, BST, BAND, BOR and BXOR.
pub struct BitUnit;

impl BitUnit {
    pub fn execute(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let (selector, target_op) = src_dst(op)?;
        let bit = addr.read(selector, ctx, mem)?.map(|n| n & 7);
        let target = addr.resolve(target_op, ctx, mem)?;
        let invert = op.flags.contains(InstrFlags::INVERT);

        // Tested bit, inverted for the BIxx forms.
        let tested = target.value.zip_with(bit, |byte, n| ((byte >> n) & 1) ^ invert as u32);

        match op.mnemonic {
            Mnemonic::Bset | Mnemonic::Bclr | Mnemonic::Bnot => {
                let updated = target.value.zip_with(bit, |byte, n| {
                    let mask = 1 << n;
                    match op.mnemonic {
                        Mnemonic::Bset => byte | mask,
                        Mnemonic::Bclr => byte & !mask,
                        _ => byte ^ mask,
                    }
                });
                addr.update(target_op, &target, ctx, mem, updated)?;
            }
            Mnemonic::Btst => match tested {
                Value::Known(b) => ctx.set_flag(Flag::Z, b == 0),
                Value::Undefined => ctx.undefine_flags(),
            },
            Mnemonic::Bld => match tested {
                Value::Known(b) => ctx.set_flag(Flag::C, b != 0),
                Value::Undefined => ctx.undefine_flags(),
            },
            Mnemonic::Bst => {
                let carry = ctx.ccr().map(|ccr| ((ccr >> Flag::C.bit()) & 1) ^ invert as u32);
                let updated = target
                    .value
                    .zip_with(bit, |byte, n| byte & !(1 << n))
                    .zip_with(carry.zip_with(bit, |c, n| c << n), |byte, b| byte | b);
                addr.update(target_op, &target, ctx, mem, updated)?;
            }
            Mnemonic::Band | Mnemonic::Bor | Mnemonic::Bxor => {
                let carry = ctx.ccr().map(|ccr| (ccr >> Flag::C.bit()) & 1);
                let combined = carry.zip_with(tested, |c, b| match op.mnemonic {
                    Mnemonic::Band => c & b,
                    Mnemonic::Bor => c | b,
                    _ => c ^ b,
                });
                match combined {
                    Value::Known(c) => ctx.set_flag(Flag::C, c != 0),
                    Value::Undefined => ctx.undefine_flags(),
                }
            }
            _ => {
                return Err(ExecError::InvalidOperation(format!(
                    "{} is not a bit operation",
                    op.name()
                )));
            }
        }
        Ok(ExecuteResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FlatMemory;
    use crate::interpreter::mode::CpuMode;
    use crate::interpreter::operation::{AbsoluteForm, Operand, SizeClass};
    use crate::interpreter::state::Field;

    fn make_bit_op(mnemonic: Mnemonic, flags: InstrFlags, bit: Operand, target: Operand) -> Operation {
        Operation::new(0x100, mnemonic, 2, SizeClass::Byte, flags)
            .with_operand(bit)
            .with_operand(target)
    }

    fn run(op: &Operation, ctx: &mut RegisterContext, mem: &mut FlatMemory) {
        let addr = Addressing::new(CpuMode::Advanced);
        BitUnit::execute(op, ctx, mem, &addr).unwrap();
    }

    #[test]
    fn test_bset_bclr_register() {
        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0, 0x10);
        let r0l = Operand::reg(Field::rl(0));

        run(&make_bit_op(Mnemonic::Bset, InstrFlags::empty(), Operand::imm(3, 1), r0l), &mut ctx, &mut mem);
        assert_eq!(ctx.get_field(Field::rl(0)), Value::Known(0x08));

        ctx.set_field(Field::rh(1), Value::Known(0x0B)); // bit number from r1h, masked to 3
        run(&make_bit_op(Mnemonic::Bclr, InstrFlags::empty(), Operand::reg(Field::rh(1)), r0l), &mut ctx, &mut mem);
        assert_eq!(ctx.get_field(Field::rl(0)), Value::Known(0x00));
    }

    #[test]
    fn test_btst_sets_z_to_inverse() {
        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0, 0x10);
        ctx.set_field(Field::rl(2), Value::Known(0x40));
        let op = make_bit_op(Mnemonic::Btst, InstrFlags::SETS_FLAGS, Operand::imm(6, 1), Operand::reg(Field::rl(2)));
        run(&op, &mut ctx, &mut mem);
        assert!(!ctx.get_flag(Flag::Z).unwrap());

        let op = make_bit_op(Mnemonic::Btst, InstrFlags::SETS_FLAGS, Operand::imm(5, 1), Operand::reg(Field::rl(2)));
        run(&op, &mut ctx, &mut mem);
        assert!(ctx.get_flag(Flag::Z).unwrap());
    }

    #[test]
    fn test_bild_and_bst_memory() {
        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0xFF_FF00, 0x100);
        mem.write_value(0xFF_FF10, 1, 0x01).unwrap();
        let target = Operand::absolute(0xFF_FF10, AbsoluteForm::Short8, 1);

        // bild #0: C = !1
        let op = make_bit_op(Mnemonic::Bld, InstrFlags::SETS_FLAGS | InstrFlags::INVERT, Operand::imm(0, 1), target);
        run(&op, &mut ctx, &mut mem);
        assert!(!ctx.get_flag(Flag::C).unwrap());

        // bist #7: bit 7 = !C = 1
        let op = make_bit_op(Mnemonic::Bst, InstrFlags::INVERT, Operand::imm(7, 1), target);
        run(&op, &mut ctx, &mut mem);
        assert_eq!(mem.read_value(0xFF_FF10, 1).unwrap(), 0x81);
    }

    #[test]
    fn test_band_bor_bxor() {
        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0, 0x10);
        ctx.set_field(Field::rl(0), Value::Known(0x02));
        let r0l = Operand::reg(Field::rl(0));

        ctx.set_flag(Flag::C, true);
        run(&make_bit_op(Mnemonic::Band, InstrFlags::SETS_FLAGS, Operand::imm(0, 1), r0l), &mut ctx, &mut mem);
        assert!(!ctx.get_flag(Flag::C).unwrap());

        run(&make_bit_op(Mnemonic::Bor, InstrFlags::SETS_FLAGS, Operand::imm(1, 1), r0l), &mut ctx, &mut mem);
        assert!(ctx.get_flag(Flag::C).unwrap());

        run(&make_bit_op(Mnemonic::Bxor, InstrFlags::SETS_FLAGS, Operand::imm(1, 1), r0l), &mut ctx, &mut mem);
        assert!(!ctx.get_flag(Flag::C).unwrap());
    }

    #[test]
    fn test_undefined_target_poisons_flags() {
        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0, 0x10);
        ctx.set(crate::interpreter::state::RegisterId::ER3, Value::Undefined);
        let op = make_bit_op(Mnemonic::Btst, InstrFlags::SETS_FLAGS, Operand::imm(0, 1), Operand::reg(Field::rl(3)));
        run(&op, &mut ctx, &mut mem);
        assert!(ctx.ccr().is_undefined());
    }
}
