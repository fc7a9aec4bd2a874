//! The H8/300H executor.
//!
//! Executes one decoded operation against a register context and memory.
//! Every mnemonic is routed by a single `match`; mnemonics that decode but
//! have no handler (DAA, DAS) share one fallback arm.
//!
//! # Writes to PC
//!
//! A non-branch operation whose destination is PC ends the block with a
//! `Branch` to the written value. A flag-setting operation may not target
//! PC at all.

use crate::interpreter::mode::CpuMode;
use crate::interpreter::operation::{InstrFlags, Mnemonic, Operation};
use crate::interpreter::state::RegisterContext;
use crate::interpreter::traits::{ExecError, ExecuteResult, Executor, Memory};

use super::addressing::{Addressing, Transfer};
use super::alu::{ArithOp, ArithUnit, ShiftOp};
use super::bit::BitUnit;
use super::control::ControlUnit;
use super::coprocessor::{Coprocessor, CoprocessorTable};
use super::transfer::TransferUnit;
use super::HandlerResult;

/// Executes operations in a given CPU mode.
#[derive(Debug)]
pub struct H8Executor {
    addressing: Addressing,
    coprocessors: CoprocessorTable,
}

impl H8Executor {
    pub fn new(mode: CpuMode) -> Self {
        Self {
            addressing: Addressing::new(mode),
            coprocessors: CoprocessorTable::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> CpuMode {
        self.addressing.mode()
    }

    /// Install a coprocessor in slot `number` (0-15), returning the one it replaces.
    pub fn attach_coprocessor(
        &mut self,
        number: usize,
        coprocessor: Box<dyn Coprocessor>,
    ) -> Result<Option<Box<dyn Coprocessor>>, ExecError> {
        self.coprocessors.attach(number, coprocessor)
    }

    pub fn coprocessors_mut(&mut self) -> &mut CoprocessorTable {
        &mut self.coprocessors
    }

    fn dispatch(
        &mut self,
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> HandlerResult {
        let addr = &self.addressing;
        match op.mnemonic {
            // Data transfer
            Mnemonic::Mov => TransferUnit::mov(op, ctx, mem, addr),
            Mnemonic::Eepmov => TransferUnit::eepmov(op, ctx, mem, addr),
            Mnemonic::Ldm => TransferUnit::multiple(op, Transfer::Load, ctx, mem, addr),
            Mnemonic::Stm => TransferUnit::multiple(op, Transfer::Store, ctx, mem, addr),

            // Arithmetic
            Mnemonic::Add => ArithUnit::add_sub(op, ArithOp::Add, ctx, mem, addr),
            Mnemonic::Sub => ArithUnit::add_sub(op, ArithOp::Sub, ctx, mem, addr),
            Mnemonic::Cmp => ArithUnit::cmp(op, ctx, mem, addr),
            Mnemonic::Inc => ArithUnit::inc_dec(op, ArithOp::Add, ctx, mem, addr),
            Mnemonic::Dec => ArithUnit::inc_dec(op, ArithOp::Sub, ctx, mem, addr),
            Mnemonic::Neg => ArithUnit::neg(op, ctx, mem, addr),
            Mnemonic::Extu => ArithUnit::extend(op, false, ctx, mem, addr),
            Mnemonic::Exts => ArithUnit::extend(op, true, ctx, mem, addr),
            Mnemonic::Mulxu => ArithUnit::multiply(op, false, ctx, mem, addr),
            Mnemonic::Mulxs => ArithUnit::multiply(op, true, ctx, mem, addr),
            Mnemonic::Divxu => ArithUnit::divide(op, false, ctx, mem, addr),
            Mnemonic::Divxs => ArithUnit::divide(op, true, ctx, mem, addr),

            // Logic
            Mnemonic::And => ArithUnit::logic(op, |a, b| a & b, ctx, mem, addr),
            Mnemonic::Or => ArithUnit::logic(op, |a, b| a | b, ctx, mem, addr),
            Mnemonic::Xor => ArithUnit::logic(op, |a, b| a ^ b, ctx, mem, addr),
            Mnemonic::Not => ArithUnit::not(op, ctx, mem, addr),
            Mnemonic::Andc | Mnemonic::Orc | Mnemonic::Xorc => TransferUnit::ccr_logic(op, ctx, mem, addr),
            Mnemonic::Ldc => TransferUnit::ldc(op, ctx, mem, addr),
            Mnemonic::Stc => TransferUnit::stc(op, ctx, mem, addr),

            // Shift
            Mnemonic::Shal => ArithUnit::shift(op, ShiftOp::Shal, ctx, mem, addr),
            Mnemonic::Shar => ArithUnit::shift(op, ShiftOp::Shar, ctx, mem, addr),
            Mnemonic::Shll => ArithUnit::shift(op, ShiftOp::Shll, ctx, mem, addr),
            Mnemonic::Shlr => ArithUnit::shift(op, ShiftOp::Shlr, ctx, mem, addr),
            Mnemonic::Rotl => ArithUnit::shift(op, ShiftOp::Rotl, ctx, mem, addr),
            Mnemonic::Rotr => ArithUnit::shift(op, ShiftOp::Rotr, ctx, mem, addr),
            Mnemonic::Rotxl => ArithUnit::shift(op, ShiftOp::Rotxl, ctx, mem, addr),
            Mnemonic::Rotxr => ArithUnit::shift(op, ShiftOp::Rotxr, ctx, mem, addr),

            // Bit manipulation
            Mnemonic::Bset
            | Mnemonic::Bclr
            | Mnemonic::Bnot
            | Mnemonic::Btst
            | Mnemonic::Bld
            | Mnemonic::Bst
            | Mnemonic::Band
            | Mnemonic::Bor
            | Mnemonic::Bxor => BitUnit::execute(op, ctx, mem, addr),

            // Branch
            Mnemonic::Bcc(cond) => ControlUnit::branch(op, cond, ctx, mem, addr),
            Mnemonic::Bsr | Mnemonic::Jsr => ControlUnit::call(op, ctx, mem, addr),
            Mnemonic::Jmp => ControlUnit::jump(op, ctx, mem, addr),
            Mnemonic::Rts => ControlUnit::ret(op, ctx, mem, addr),
            Mnemonic::Rte => ControlUnit::rte(op, ctx, mem, addr),
            Mnemonic::Trapa => ControlUnit::trap(op, ctx, mem, addr),

            // System
            Mnemonic::Nop => Ok(ExecuteResult::Continue),
            Mnemonic::Sleep => ControlUnit::sleep(ctx),
            Mnemonic::Coprocessor(_) => self.coprocessors.dispatch(op, ctx, mem),

            Mnemonic::Daa | Mnemonic::Das => {
                log::debug!("no handler for {} at {:06X}", op.name(), op.address);
                Err(ExecError::Unsupported { mnemonic: op.name(), address: op.address })
            }
        }
    }
}

impl Default for H8Executor {
    fn default() -> Self {
        Self::new(CpuMode::default())
    }
}

impl Executor for H8Executor {
    fn execute(
        &mut self,
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<ExecuteResult, ExecError> {
        let writes_pc = !op.mnemonic.is_branch() && op.dest().is_some_and(|d| d.is_pc());
        if writes_pc && op.flags.contains(InstrFlags::SETS_FLAGS) {
            return Err(ExecError::InvalidOperation(format!(
                "{} at {:06X} sets flags but targets pc",
                op.name(),
                op.address
            )));
        }

        match self.dispatch(op, ctx, mem)? {
            ExecuteResult::Continue if writes_pc => Ok(ExecuteResult::Branch { target: ctx.pc() }),
            result => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FlatMemory;
    use crate::interpreter::decode::InstructionDecoder;
    use crate::interpreter::operation::{Operand, SizeClass};
    use crate::interpreter::state::{Field, Flag, RegisterId, Value};
    use crate::interpreter::traits::Decoder;

    fn make_env() -> (H8Executor, RegisterContext, FlatMemory) {
        let mut ctx = RegisterContext::new();
        ctx.set_sp(0x1000);
        (H8Executor::default(), ctx, FlatMemory::new(0, 0x2000))
    }

    fn run(bytes: &[u8], exec: &mut H8Executor, ctx: &mut RegisterContext, mem: &mut FlatMemory) -> HandlerResult {
        let op = InstructionDecoder::new().decode(bytes, 0x100).unwrap();
        exec.execute(&op, ctx, mem)
    }

    #[test]
    fn test_addx_keeps_z_sticky() {
        let (mut exec, mut ctx, mut mem) = make_env();

        // 0x00FF + 0x0001 as two bytes: add.b r0l,r1l ; addx r0h,r1h
        ctx.set_field(Field::rl(0), Value::Known(0x01));
        ctx.set_field(Field::rl(1), Value::Known(0xFF));
        ctx.set_field(Field::rh(0), Value::Known(0x00));
        ctx.set_field(Field::rh(1), Value::Known(0x00));

        run(&[0x08, 0x89], &mut exec, &mut ctx, &mut mem).unwrap();
        assert!(ctx.get_flag(Flag::Z).unwrap());
        assert!(ctx.get_flag(Flag::C).unwrap());

        run(&[0x0E, 0x01], &mut exec, &mut ctx, &mut mem).unwrap();
        assert_eq!(ctx.get_field(Field::r(1)), Value::Known(0x0100));
        assert!(!ctx.get_flag(Flag::Z).unwrap());
        assert!(!ctx.get_flag(Flag::C).unwrap());

        // A zero high byte cannot set Z once it was cleared
        ctx.set_flag(Flag::Z, false);
        ctx.set_field(Field::rh(2), Value::Known(0));
        run(&[0x92, 0x00], &mut exec, &mut ctx, &mut mem).unwrap(); // addx #0,r2h
        assert!(!ctx.get_flag(Flag::Z).unwrap());
    }

    #[test]
    fn test_undefined_and_poisons_flags() {
        let (mut exec, mut ctx, mut mem) = make_env();
        ctx.set(RegisterId::er(0), Value::Undefined);
        ctx.set_field(Field::rl(1), Value::Known(0xF0));

        run(&[0x16, 0x89], &mut exec, &mut ctx, &mut mem).unwrap(); // and.b r0l,r1l
        assert!(ctx.get_field(Field::rl(1)).is_undefined());
        assert!(ctx.ccr().is_undefined());
        assert_eq!(ctx.get_flag(Flag::Z), Err(ExecError::UndefinedFlag { flag: "Z" }));

        // A conditional branch can no longer be taken
        assert_eq!(
            run(&[0x47, 0x02], &mut exec, &mut ctx, &mut mem),
            Err(ExecError::UndefinedFlag { flag: "Z" })
        );
    }

    #[test]
    fn test_divxu_by_zero() {
        let (mut exec, mut ctx, mut mem) = make_env();
        ctx.set_field(Field::r(1), Value::Known(0x1234));
        ctx.set_field(Field::rl(0), Value::Known(0));

        run(&[0x51, 0x81], &mut exec, &mut ctx, &mut mem).unwrap(); // divxu.b r0l,r1
        assert!(ctx.get_field(Field::r(1)).is_undefined());
        assert!(ctx.get_flag(Flag::Z).unwrap());
    }

    #[test]
    fn test_divxu() {
        let (mut exec, mut ctx, mut mem) = make_env();
        ctx.set_field(Field::r(1), Value::Known(100));
        ctx.set_field(Field::rl(0), Value::Known(7));

        run(&[0x51, 0x81], &mut exec, &mut ctx, &mut mem).unwrap();
        // remainder 2 in r1h, quotient 14 in r1l
        assert_eq!(ctx.get_field(Field::r(1)), Value::Known(0x020E));
        assert!(!ctx.get_flag(Flag::Z).unwrap());
    }

    #[test]
    fn test_jsr_memory_indirect_and_rts() {
        let (mut exec, mut ctx, mut mem) = make_env();
        mem.write_value(0x40, 4, 0x0000_0600).unwrap();

        let result = run(&[0x5F, 0x40], &mut exec, &mut ctx, &mut mem).unwrap(); // jsr @@0x40
        assert_eq!(result, ExecuteResult::Branch { target: 0x600 });
        assert_eq!(mem.read_value(0x0FFC, 4).unwrap(), 0x102);

        let result = run(&[0x54, 0x70], &mut exec, &mut ctx, &mut mem).unwrap(); // rts
        assert_eq!(result, ExecuteResult::Branch { target: 0x102 });
    }

    #[test]
    fn test_branch_not_taken() {
        let (mut exec, mut ctx, mut mem) = make_env();
        ctx.set_flag(Flag::Z, false);
        assert_eq!(run(&[0x47, 0x10], &mut exec, &mut ctx, &mut mem), Ok(ExecuteResult::Continue)); // beq
        assert_eq!(
            run(&[0x46, 0xFE], &mut exec, &mut ctx, &mut mem), // bne .
            Ok(ExecuteResult::Branch { target: 0x100 })
        );
    }

    #[test]
    fn test_daa_is_unsupported() {
        let (mut exec, mut ctx, mut mem) = make_env();
        assert_eq!(
            run(&[0x0F, 0x08], &mut exec, &mut ctx, &mut mem),
            Err(ExecError::Unsupported { mnemonic: "daa", address: 0x100 })
        );
    }

    #[test]
    fn test_sleep() {
        let (mut exec, mut ctx, mut mem) = make_env();
        assert_eq!(run(&[0x01, 0x80], &mut exec, &mut ctx, &mut mem), Ok(ExecuteResult::Sleep));
        assert!(ctx.sleeping);
    }

    #[test]
    fn test_write_to_pc_branches() {
        let (mut exec, mut ctx, mut mem) = make_env();
        let to_pc = |flags| {
            Operation::new(0x100, Mnemonic::Mov, 6, SizeClass::Long, flags)
                .with_operand(Operand::imm(0x0000_4000, 4))
                .with_operand(Operand::reg(Field::PC))
        };

        let result = exec.execute(&to_pc(InstrFlags::empty()), &mut ctx, &mut mem).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x4000 });

        assert!(matches!(
            exec.execute(&to_pc(InstrFlags::SETS_FLAGS), &mut ctx, &mut mem),
            Err(ExecError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_normal_mode_call_pushes_word() {
        let mut exec = H8Executor::new(CpuMode::Normal);
        let mut ctx = RegisterContext::new();
        ctx.set_sp(0x1000);
        let mut mem = FlatMemory::new(0, 0x2000);

        let result = run(&[0x55, 0x10], &mut exec, &mut ctx, &mut mem).unwrap(); // bsr .+0x10
        assert_eq!(result, ExecuteResult::Branch { target: 0x112 });
        assert_eq!(ctx.sp(), Value::Known(0x0FFE));
        assert_eq!(mem.read_value(0x0FFE, 2).unwrap(), 0x102);
    }
}
