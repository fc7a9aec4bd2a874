//! H8 calling convention.
//!
//! Used by analysis hosts rather than by the step loop: read the
//! arguments of a call that is about to be made, or finish a function by
//! synthesizing its return.
//!
//! The first three arguments travel in ER0, ER1 and ER2. The rest sit in
//! 4-byte stack slots above the return address, the first at the lowest
//! address. The return value goes in ER0.

use crate::interpreter::execute::Addressing;
use crate::interpreter::mode::CpuMode;
use crate::interpreter::state::{RegisterContext, RegisterId, Value};
use crate::interpreter::traits::{ExecError, Memory};

/// Number of register-passed arguments.
pub const ARGUMENT_REGISTERS: usize = 3;

/// Size of one stacked argument slot.
pub const STACK_SLOT: u32 = 4;

/// Argument extraction and return synthesis for one CPU mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct H8CallingConvention {
    mode: CpuMode,
}

impl H8CallingConvention {
    pub fn new(mode: CpuMode) -> Self {
        Self { mode }
    }

    /// The first `count` arguments of a call, with SP at the return address.
    ///
    /// Stack arguments read while SP is Undefined come back Undefined.
    pub fn call_arguments(
        &self,
        ctx: &RegisterContext,
        mem: &dyn Memory,
        count: usize,
    ) -> Result<Vec<Value>, ExecError> {
        let addr = Addressing::new(self.mode);
        let first_slot = ctx.sp().map(|sp| sp.wrapping_add(self.mode.pointer_size() as u32));

        (0..count)
            .map(|i| {
                if i < ARGUMENT_REGISTERS {
                    return Ok(ctx.get(RegisterId::er(i as u8)));
                }
                let slot = (i - ARGUMENT_REGISTERS) as u32;
                match first_slot {
                    Value::Known(base) => {
                        let address = addr.effective(base.wrapping_add(slot * STACK_SLOT), 4);
                        Ok(Value::Known(mem.read_value(address, 4)?))
                    }
                    Value::Undefined => Ok(Value::Undefined),
                }
            })
            .collect()
    }

    /// Return from the current function with `value`.
    ///
    /// Pops the return address, releases `cleanup_slots` argument slots,
    /// stores `value` in ER0 and jumps to the return address.
    pub fn execute_return(
        &self,
        ctx: &mut RegisterContext,
        mem: &dyn Memory,
        value: Value,
        cleanup_slots: u32,
    ) -> Result<(), ExecError> {
        let addr = Addressing::new(self.mode);
        let target = addr
            .pop(ctx, mem, self.mode.pointer_size())?
            .known()
            .ok_or(ExecError::UndefinedTarget { address: ctx.pc() })?;

        let sp = ctx.sp().map(|sp| sp.wrapping_add(cleanup_slots * STACK_SLOT));
        ctx.set(RegisterId::SP, sp);
        ctx.set(RegisterId::er(0), value);
        ctx.set_pc(target & self.mode.address_mask());
        log::debug!("synthesized return to {:06X}", ctx.pc());
        Ok(())
    }
}
