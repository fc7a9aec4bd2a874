//! Control flow: branches, calls, returns and exceptions.
//!
//! # Stack frames
//!
//! | Instruction | Advanced mode | Normal mode |
//! |-------------|---------------|-------------|
//! | BSR/JSR | PC (32 bits) | PC (16 bits) |
//! | TRAPA | CCR:PC (8:24 bits) | PC word, then CCR word (CCR in the upper byte) |
//!
//! A branch target that depends on Undefined data is an error rather than
//! a guess; the program counter never becomes Undefined.

use crate::interpreter::operation::{Condition, Operation};
use crate::interpreter::state::{Flag, RegisterContext, RegisterId, Value};
use crate::interpreter::traits::{ExecError, ExecuteResult, Memory};

use crate::interpreter::mode::CpuMode;

use super::addressing::Addressing;
use super::{one_operand, HandlerResult};

/// TRAPA #n uses exception vector 8 + n.
const TRAP_VECTOR_BASE: u32 = 8;

/// Evaluate a branch condition.
///
/// BRA and BRN never read CCR, so they work even when it is Undefined.
pub fn evaluate_condition(cond: Condition, ctx: &RegisterContext) -> Result<bool, ExecError> {
    let flag = |f: Flag| ctx.get_flag(f);
    Ok(match cond {
        Condition::True => true,
        Condition::False => false,
        Condition::Hi => !(flag(Flag::C)? || flag(Flag::Z)?),
        Condition::Ls => flag(Flag::C)? || flag(Flag::Z)?,
        Condition::Hs => !flag(Flag::C)?,
        Condition::Lo => flag(Flag::C)?,
        Condition::Ne => !flag(Flag::Z)?,
        Condition::Eq => flag(Flag::Z)?,
        Condition::Vc => !flag(Flag::V)?,
        Condition::Vs => flag(Flag::V)?,
        Condition::Pl => !flag(Flag::N)?,
        Condition::Mi => flag(Flag::N)?,
        Condition::Ge => flag(Flag::N)? == flag(Flag::V)?,
        Condition::Lt => flag(Flag::N)? != flag(Flag::V)?,
        Condition::Gt => !(flag(Flag::Z)? || flag(Flag::N)? != flag(Flag::V)?),
        Condition::Le => flag(Flag::Z)? || flag(Flag::N)? != flag(Flag::V)?,
    })
}

/// Control unit for branch, call, return and exception operations.
pub struct ControlUnit;

impl ControlUnit {
    /// Bcc.
    pub fn branch(
        op: &Operation,
        cond: Condition,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        if !evaluate_condition(cond, ctx)? {
            return Ok(ExecuteResult::Continue);
        }
        let target = addr.jump_target(one_operand(op)?, op, ctx, mem)?;
        Ok(ExecuteResult::Branch { target })
    }

    /// JMP.
    pub fn jump(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let target = addr.jump_target(one_operand(op)?, op, ctx, mem)?;
        Ok(ExecuteResult::Branch { target })
    }

    /// BSR/JSR: push the return address, then jump.
    pub fn call(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let target = addr.jump_target(one_operand(op)?, op, ctx, mem)?;
        let size = addr.mode().pointer_size();
        addr.push(ctx, mem, size, Value::Known(op.next_address()))?;
        Ok(ExecuteResult::Branch { target })
    }

    /// RTS.
    pub fn ret(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let size = addr.mode().pointer_size();
        let target = addr
            .pop(ctx, mem, size)?
            .known()
            .ok_or(ExecError::UndefinedTarget { address: op.address })?;
        Ok(ExecuteResult::Branch { target: target & addr.mode().address_mask() })
    }

    /// TRAPA #n: stack PC and CCR, set I, vector through 8 + n.
    pub fn trap(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let number = match addr.read(one_operand(op)?, ctx, mem)? {
            Value::Known(n) if n < 4 => n,
            other => {
                return Err(ExecError::InvalidOperation(format!("trapa #{:?}", other)));
            }
        };
        let Value::Known(ccr) = ctx.ccr() else {
            return Err(ExecError::UndefinedFlag { flag: Flag::I.name() });
        };
        let return_pc = op.next_address();

        match addr.mode() {
            CpuMode::Advanced => {
                addr.push(ctx, mem, 4, Value::Known((ccr << 24) | return_pc))?;
            }
            CpuMode::Normal => {
                addr.push(ctx, mem, 2, Value::Known(return_pc & 0xFFFF))?;
                addr.push(ctx, mem, 2, Value::Known(ccr << 8))?;
            }
        }
        ctx.set_flag(Flag::I, true);

        let vector = addr.mode().vector_address(TRAP_VECTOR_BASE + number);
        let target = addr.read_pointer(mem, vector)?;
        log::debug!("trapa #{} at {:06X} -> {:06X}", number, op.address, target);
        Ok(ExecuteResult::Branch { target })
    }

    /// RTE: restore CCR and PC from the exception frame.
    pub fn rte(
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        addr: &Addressing,
    ) -> HandlerResult {
        let (ccr, pc) = match addr.mode() {
            CpuMode::Advanced => {
                let frame = addr.pop(ctx, mem, 4)?;
                (frame.map(|f| f >> 24), frame)
            }
            CpuMode::Normal => {
                let ccr = addr.pop(ctx, mem, 2)?.map(|w| w >> 8);
                (ccr, addr.pop(ctx, mem, 2)?)
            }
        };
        let target = pc.known().ok_or(ExecError::UndefinedTarget { address: op.address })?;
        ctx.set(RegisterId::CCR, ccr);
        Ok(ExecuteResult::Branch { target: target & addr.mode().address_mask() })
    }

    /// SLEEP: mark the context asleep.
    pub fn sleep(ctx: &mut RegisterContext) -> HandlerResult {
        ctx.sleeping = true;
        Ok(ExecuteResult::Sleep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FlatMemory;
    use crate::interpreter::operation::{AbsoluteForm, InstrFlags, Mnemonic, Operand, SizeClass};

    fn make_env(mode: CpuMode) -> (Addressing, RegisterContext, FlatMemory) {
        let mut ctx = RegisterContext::new();
        ctx.set_sp(0x1000);
        (Addressing::new(mode), ctx, FlatMemory::new(0, 0x2000))
    }

    fn make_op(address: u32, mnemonic: Mnemonic, length: u8, operand: Option<Operand>) -> Operation {
        let op = Operation::new(address, mnemonic, length, SizeClass::Unsized, InstrFlags::empty());
        match operand {
            Some(o) => op.with_operand(o),
            None => op,
        }
    }

    #[test]
    fn test_conditions() {
        let mut ctx = RegisterContext::new();
        ctx.set_flag(Flag::Z, true);
        assert!(evaluate_condition(Condition::Eq, &ctx).unwrap());
        assert!(evaluate_condition(Condition::Ls, &ctx).unwrap());
        assert!(!evaluate_condition(Condition::Hi, &ctx).unwrap());
        assert!(evaluate_condition(Condition::Le, &ctx).unwrap());

        ctx.set_flag(Flag::Z, false);
        ctx.set_flag(Flag::N, true);
        assert!(evaluate_condition(Condition::Lt, &ctx).unwrap());
        assert!(!evaluate_condition(Condition::Gt, &ctx).unwrap());
        ctx.set_flag(Flag::V, true);
        assert!(evaluate_condition(Condition::Ge, &ctx).unwrap());
        assert!(evaluate_condition(Condition::Gt, &ctx).unwrap());
    }

    #[test]
    fn test_bra_brn_ignore_undefined_ccr() {
        let mut ctx = RegisterContext::new();
        ctx.undefine_flags();
        assert!(evaluate_condition(Condition::True, &ctx).unwrap());
        assert!(!evaluate_condition(Condition::False, &ctx).unwrap());
        assert_eq!(
            evaluate_condition(Condition::Ne, &ctx),
            Err(ExecError::UndefinedFlag { flag: "Z" })
        );
    }

    #[test]
    fn test_bsr_rts_round_trip() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Advanced);
        let bsr = make_op(0x200, Mnemonic::Bsr, 2, Some(Operand::pc_relative(0x10)));
        let result = ControlUnit::call(&bsr, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x212 });
        assert_eq!(ctx.sp(), Value::Known(0x0FFC));
        assert_eq!(mem.read_value(0x0FFC, 4).unwrap(), 0x202);

        let rts = make_op(0x212, Mnemonic::Rts, 2, None);
        let result = ControlUnit::ret(&rts, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x202 });
        assert_eq!(ctx.sp(), Value::Known(0x1000));
    }

    #[test]
    fn test_jsr_memory_indirect() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Advanced);
        mem.write_value(0x80, 4, 0x0000_1234).unwrap();
        let jsr = make_op(0x300, Mnemonic::Jsr, 2, Some(Operand::memory_indirect(0x80)));
        let result = ControlUnit::call(&jsr, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x1234 });
        assert_eq!(mem.read_value(0x0FFC, 4).unwrap(), 0x302);
    }

    #[test]
    fn test_jmp_undefined_register() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Advanced);
        ctx.set(RegisterId::ER2, Value::Undefined);
        let jmp = make_op(0x400, Mnemonic::Jmp, 2, Some(Operand::indirect(RegisterId::ER2, 0)));
        assert_eq!(
            ControlUnit::jump(&jmp, &mut ctx, &mut mem, &addr),
            Err(ExecError::UndefinedTarget { address: 0x400 })
        );
    }

    #[test]
    fn test_trapa_rte_advanced() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Advanced);
        mem.write_value(0x28, 4, 0x0000_0800).unwrap(); // vector 10
        ctx.set_known(RegisterId::CCR, 0x05);

        let trapa = make_op(0x500, Mnemonic::Trapa, 2, Some(Operand::imm(2, 1)));
        let result = ControlUnit::trap(&trapa, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x800 });
        assert_eq!(mem.read_value(0x0FFC, 4).unwrap(), 0x0500_0502);
        assert!(ctx.get_flag(Flag::I).unwrap());

        let rte = make_op(0x800, Mnemonic::Rte, 2, None);
        let result = ControlUnit::rte(&rte, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x502 });
        assert_eq!(ctx.ccr(), Value::Known(0x05));
        assert_eq!(ctx.sp(), Value::Known(0x1000));
    }

    #[test]
    fn test_trapa_rte_normal() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Normal);
        mem.write_value(0x16, 2, 0x0900).unwrap(); // vector 11
        ctx.set_known(RegisterId::CCR, 0x08);

        let trapa = make_op(0x600, Mnemonic::Trapa, 2, Some(Operand::imm(3, 1)));
        let result = ControlUnit::trap(&trapa, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x900 });
        assert_eq!(mem.read_value(0x0FFE, 2).unwrap(), 0x602);
        assert_eq!(mem.read_value(0x0FFC, 2).unwrap(), 0x0800);

        let rte = make_op(0x900, Mnemonic::Rte, 2, None);
        let result = ControlUnit::rte(&rte, &mut ctx, &mut mem, &addr).unwrap();
        assert_eq!(result, ExecuteResult::Branch { target: 0x602 });
        assert_eq!(ctx.ccr(), Value::Known(0x08));
    }

    #[test]
    fn test_trapa_needs_defined_ccr() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Advanced);
        ctx.undefine_flags();
        let trapa = make_op(0x500, Mnemonic::Trapa, 2, Some(Operand::imm(0, 1)));
        assert_eq!(
            ControlUnit::trap(&trapa, &mut ctx, &mut mem, &addr),
            Err(ExecError::UndefinedFlag { flag: "I" })
        );
    }

    #[test]
    fn test_jump_absolute_is_masked() {
        let (addr, mut ctx, mut mem) = make_env(CpuMode::Normal);
        let jmp = make_op(0x10, Mnemonic::Jmp, 4, Some(Operand::absolute(0x01_2345, AbsoluteForm::Long24, 0)));
        assert_eq!(
            ControlUnit::jump(&jmp, &mut ctx, &mut mem, &addr).unwrap(),
            ExecuteResult::Branch { target: 0x2345 }
        );
    }
}
