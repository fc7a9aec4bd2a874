//! Data movement and CCR operations.

use crate::interpreter::operation::{InstrFlags, Mnemonic, Operand, Operation, SizeClass};
use crate::interpreter::state::{Field, RegisterContext, RegisterId, Value};
use crate::interpreter::traits::{ExecuteResult, FlagMask, Memory};

use super::addressing::{Addressing, Transfer};
use super::alu::logic_flags;
use super::{commit, one_operand, src_dst, width, HandlerResult};

/// Executes MOV, EEPMOV, LDM/STM and the CCR operations.
pub struct TransferUnit;

impl TransferUnit {
    /// MOV (including PUSH/POP): N and Z from the moved value, V cleared.
    pub fn mov(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let width = width(op)?;
        let (src, dst) = src_dst(op)?;
        let value = addr.read(src, ctx, mem)?;
        addr.write_back(dst, ctx, mem, value)?;
        match value {
            Value::Known(v) => commit(op, ctx, logic_flags(v, width), FlagMask::NZV),
            Value::Undefined if op.flags.contains(InstrFlags::SETS_FLAGS) => ctx.undefine_flags(),
            Value::Undefined => {}
        }
        Ok(ExecuteResult::Continue)
    }

    /// EEPMOV.B/W: block copy from @ER5+ to @ER6+, counted down in R4L
    /// (byte form) or R4 (word form).
    pub fn eepmov(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let count_reg = match op.size {
            SizeClass::Word => Field::r(4),
            _ => Field::rl(4),
        };
        let Value::Known(count) = ctx.get_field(count_reg) else {
            log::debug!("eepmov at {:06X}: undefined count", op.address);
            ctx.set(RegisterId::er(5), Value::Undefined);
            ctx.set(RegisterId::er(6), Value::Undefined);
            return Ok(ExecuteResult::Continue);
        };

        let src = Operand::post_increment(RegisterId::er(5), 1);
        let dst = Operand::post_increment(RegisterId::er(6), 1);
        for _ in 0..count {
            let byte = addr.read(&src, ctx, mem)?;
            addr.write_back(&dst, ctx, mem, byte)?;
        }
        ctx.set_field(count_reg, Value::Known(0));
        Ok(ExecuteResult::Continue)
    }

    /// LDM/STM. Loading PC ends the block.
    pub fn multiple(
        op: &Operation,
        direction: Transfer,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let list = one_operand(op)?;
        if addr.transfer_list(list, direction, ctx, mem)? {
            return Ok(ExecuteResult::Branch { target: ctx.pc() });
        }
        Ok(ExecuteResult::Continue)
    }

    /// LDC: load CCR from a byte register, an immediate, or the upper
    /// byte of a word in memory.
    pub fn ldc(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let (src, _) = src_dst(op)?;
        let value = addr.read(src, ctx, mem)?;
        let ccr = if src.is_memory() { value.map(|w| w >> 8) } else { value };
        ctx.set(RegisterId::CCR, ccr.map(|c| c & 0xFF));
        Ok(ExecuteResult::Continue)
    }

    /// STC: the inverse of [`ldc`](Self::ldc).
    pub fn stc(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let (_, dst) = src_dst(op)?;
        let ccr = ctx.ccr();
        let value = if dst.is_memory() { ccr.map(|c| c << 8) } else { ccr };
        addr.write_back(dst, ctx, mem, value)?;
        Ok(ExecuteResult::Continue)
    }

    /// ANDC/ORC/XORC.
    pub fn ccr_logic(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let (src, _) = src_dst(op)?;
        let imm = addr.read(src, ctx, mem)?;
        let updated = ctx.ccr().zip_with(imm, |ccr, imm| match op.mnemonic {
            Mnemonic::Andc => ccr & imm,
            Mnemonic::Orc => ccr | imm,
            _ => ccr ^ imm,
        });
        if updated.is_undefined() {
            log::debug!("{} at {:06X}: CCR stays undefined", op.name(), op.address);
        }
        ctx.set(RegisterId::CCR, updated);
        Ok(ExecuteResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FlatMemory;
    use crate::interpreter::mode::CpuMode;
    use crate::interpreter::operation::AbsoluteForm;
    use crate::interpreter::state::Flag;

    fn make_env() -> (Addressing, RegisterContext, FlatMemory) {
        (Addressing::new(CpuMode::Advanced), RegisterContext::new(), FlatMemory::new(0, 0x2000))
    }

    fn make_op(mnemonic: Mnemonic, size: SizeClass, flags: InstrFlags, operands: &[Operand]) -> Operation {
        operands
            .iter()
            .fold(Operation::new(0x100, mnemonic, 2, size, flags), |op, o| op.with_operand(*o))
    }

    #[test]
    fn test_mov_sets_nz_clears_v() {
        let (addr, mut ctx, mut mem) = make_env();
        ctx.set_flag(Flag::V, true);
        ctx.set_flag(Flag::C, true);
        let op = make_op(
            Mnemonic::Mov,
            SizeClass::Byte,
            InstrFlags::SETS_FLAGS,
            &[Operand::imm(0x80, 1), Operand::reg(Field::rl(0))],
        );
        TransferUnit::mov(&op, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.get_field(Field::rl(0)), Value::Known(0x80));
        assert!(ctx.get_flag(Flag::N).unwrap());
        assert!(!ctx.get_flag(Flag::Z).unwrap());
        assert!(!ctx.get_flag(Flag::V).unwrap());
        assert!(ctx.get_flag(Flag::C).unwrap());
    }

    #[test]
    fn test_push_pop_as_mov() {
        let (addr, mut ctx, mut mem) = make_env();
        ctx.set_sp(0x1000);
        ctx.set_known(RegisterId::er(3), 0xCAFE_F00D);

        let push = make_op(
            Mnemonic::Mov,
            SizeClass::Long,
            InstrFlags::SETS_FLAGS,
            &[Operand::reg(Field::er(3)), Operand::pre_decrement(RegisterId::SP, 4)],
        );
        TransferUnit::mov(&push, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.sp(), Value::Known(0x0FFC));
        assert_eq!(mem.read_value(0x0FFC, 4).unwrap(), 0xCAFE_F00D);

        let pop = make_op(
            Mnemonic::Mov,
            SizeClass::Long,
            InstrFlags::SETS_FLAGS,
            &[Operand::post_increment(RegisterId::SP, 4), Operand::reg(Field::er(4))],
        );
        TransferUnit::mov(&pop, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.get(RegisterId::er(4)), Value::Known(0xCAFE_F00D));
        assert_eq!(ctx.sp(), Value::Known(0x1000));
        assert!(ctx.get_flag(Flag::N).unwrap());
    }

    #[test]
    fn test_mov_undefined_source() {
        let (addr, mut ctx, mut mem) = make_env();
        ctx.set(RegisterId::er(1), Value::Undefined);
        let op = make_op(
            Mnemonic::Mov,
            SizeClass::Word,
            InstrFlags::SETS_FLAGS,
            &[Operand::reg(Field::r(1)), Operand::reg(Field::r(2))],
        );
        TransferUnit::mov(&op, &mut ctx, &mut mem, &addr).unwrap();
        assert!(ctx.get(RegisterId::er(2)).is_undefined());
        assert!(ctx.ccr().is_undefined());
    }

    #[test]
    fn test_eepmov_byte() {
        let (addr, mut ctx, mut mem) = make_env();
        mem.load(0x100, b"hello").unwrap();
        ctx.set_known(RegisterId::er(5), 0x100);
        ctx.set_known(RegisterId::er(6), 0x200);
        ctx.set_field(Field::rl(4), Value::Known(5));

        let op = make_op(Mnemonic::Eepmov, SizeClass::Byte, InstrFlags::empty(), &[]);
        TransferUnit::eepmov(&op, &mut ctx, &mut mem, &addr).unwrap();

        let mut copied = [0u8; 5];
        mem.read(0x200, &mut copied).unwrap();
        assert_eq!(&copied, b"hello");
        assert_eq!(ctx.get(RegisterId::er(5)), Value::Known(0x105));
        assert_eq!(ctx.get(RegisterId::er(6)), Value::Known(0x205));
        assert_eq!(ctx.get_field(Field::rl(4)), Value::Known(0));
    }

    #[test]
    fn test_ldm_with_pc_branches() {
        let (addr, mut ctx, mut mem) = make_env();
        ctx.set_known(RegisterId::er(6), 0x400);
        mem.write_value(0x400, 4, 0x1111).unwrap();
        mem.write_value(0x404, 4, 0x0000_0800).unwrap();

        // er0 and pc
        let list = Operand::register_list(RegisterId::er(6), 0b1_0000_0001, false, true, true, 4);
        let op = make_op(Mnemonic::Ldm, SizeClass::Long, InstrFlags::empty(), &[list]);
        let result = TransferUnit::multiple(&op, Transfer::Load, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x800 });
        assert_eq!(ctx.get(RegisterId::er(0)), Value::Known(0x1111));
        assert_eq!(ctx.get(RegisterId::er(6)), Value::Known(0x408));
    }

    #[test]
    fn test_ldm_ascending() {
        let (addr, mut ctx, mut mem) = make_env();
        ctx.set_known(RegisterId::er(6), 0x1000);
        for (i, value) in [0xA0u32, 0xA2, 0xA5].iter().enumerate() {
            mem.write_value(0x1000 + 4 * i as u32, 4, *value).unwrap();
        }
        let list = Operand::register_list(RegisterId::er(6), 0b10_0101, false, true, true, 4);
        let op = make_op(Mnemonic::Ldm, SizeClass::Long, InstrFlags::empty(), &[list]);
        let result = TransferUnit::multiple(&op, Transfer::Load, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Continue);
        assert_eq!(ctx.get(RegisterId::er(0)), Value::Known(0xA0));
        assert_eq!(ctx.get(RegisterId::er(2)), Value::Known(0xA2));
        assert_eq!(ctx.get(RegisterId::er(5)), Value::Known(0xA5));
        assert_eq!(ctx.get(RegisterId::er(6)), Value::Known(0x100C));
    }

    #[test]
    fn test_ldc_stc_memory_use_upper_byte() {
        let (addr, mut ctx, mut mem) = make_env();
        mem.write_value(0x300, 2, 0x8A00).unwrap();
        let at = Operand::absolute(0x300, AbsoluteForm::Short16, 2);

        let ldc = make_op(Mnemonic::Ldc, SizeClass::Word, InstrFlags::empty(), &[at, Operand::reg(Field::CCR)]);
        TransferUnit::ldc(&ldc, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.ccr(), Value::Known(0x8A));

        ctx.set_sp(0x1000);
        let push = Operand::pre_decrement(RegisterId::SP, 2);
        let stc = make_op(Mnemonic::Stc, SizeClass::Word, InstrFlags::empty(), &[Operand::reg(Field::CCR), push]);
        TransferUnit::stc(&stc, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(mem.read_value(0x0FFE, 2).unwrap(), 0x8A00);
    }

    #[test]
    fn test_ccr_logic() {
        let (addr, mut ctx, mut mem) = make_env();
        ctx.set_known(RegisterId::CCR, 0x0F);
        let ccr = Operand::reg(Field::CCR);

        let orc = make_op(Mnemonic::Orc, SizeClass::Byte, InstrFlags::empty(), &[Operand::imm(0x80, 1), ccr]);
        TransferUnit::ccr_logic(&orc, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.ccr(), Value::Known(0x8F));

        let andc = make_op(Mnemonic::Andc, SizeClass::Byte, InstrFlags::empty(), &[Operand::imm(0x7E, 1), ccr]);
        TransferUnit::ccr_logic(&andc, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.ccr(), Value::Known(0x0E));

        let xorc = make_op(Mnemonic::Xorc, SizeClass::Byte, InstrFlags::empty(), &[Operand::imm(0x03, 1), ccr]);
        TransferUnit::ccr_logic(&xorc, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(ctx.ccr(), Value::Known(0x0D));
    }
}
