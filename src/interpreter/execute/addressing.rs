//! Operand resolution against a context and memory.
//!
//! # Addressing
//!
//! | Operand | Effective address | Side effect |
//! |---------|-------------------|-------------|
//! | `@ERn` | ERn | - |
//! | `@-ERn` | ERn - size | ERn updated before the access |
//! | `@ERn+` | ERn | ERn updated after the access |
//! | `@(d,ERn)` | ERn + d | - |
//! | `@aa` | aa (already extended) | - |
//! | `@@aa:8` | pointer stored at aa | - |
//!
//! Every address is masked to the mode's address width, and word/long
//! accesses ignore address bit 0.
//!
//! # Partial data
//!
//! An Undefined base register gives an unknown address. Reads through it
//! yield Undefined and writes through it are dropped, as are writes of
//! Undefined values: memory has no way to mark a byte unknown.

use crate::interpreter::mode::CpuMode;
use crate::interpreter::operation::{Operand, OperandKind, Operation, Step};
use crate::interpreter::state::{Field, RegisterContext, RegisterId, Value};
use crate::interpreter::traits::{ExecError, Memory};

/// A resolved operand: where it lives (if in memory and known) and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub address: Option<u32>,
    pub value: Value,
}

impl Resolved {
    fn value(value: Value) -> Self {
        Self { address: None, value }
    }

    fn unknown() -> Self {
        Self { address: None, value: Value::Undefined }
    }
}

/// Direction of a multi-register transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Memory to registers (LDM).
    Load,
    /// Registers to memory (STM).
    Store,
}

/// Operand resolution for one CPU mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addressing {
    mode: CpuMode,
}

impl Addressing {
    pub fn new(mode: CpuMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CpuMode {
        self.mode
    }

    /// Mask an address to the mode width and align it for `tsize`.
    #[inline]
    pub fn effective(&self, address: u32, tsize: u8) -> u32 {
        let address = address & self.mode.address_mask();
        if tsize >= 2 {
            address & !1
        } else {
            address
        }
    }

    /// Read an operand, applying any pre-decrement/post-increment.
    pub fn resolve(
        &self,
        operand: &Operand,
        ctx: &mut RegisterContext,
        mem: &dyn Memory,
    ) -> Result<Resolved, ExecError> {
        let tsize = operand.tsize;
        let address = match operand.kind {
            OperandKind::Immediate(value) => return Ok(Resolved::value(Value::Known(value))),
            OperandKind::Register(field) => return Ok(Resolved::value(ctx.get_field(field))),
            OperandKind::Indirect { base, step, writeback } => {
                match self.step_base(ctx, base, step, writeback, tsize) {
                    Some(address) => address,
                    None => return Ok(Resolved::unknown()),
                }
            }
            OperandKind::Displacement { base, disp } => match ctx.get(base) {
                Value::Known(b) => b.wrapping_add(disp as u32),
                Value::Undefined => return Ok(Resolved::unknown()),
            },
            OperandKind::Absolute { address, .. } => address,
            OperandKind::MemoryIndirect { address } => {
                let pointer = self.read_pointer(mem, address)?;
                return Ok(Resolved { address: Some(address), value: Value::Known(pointer) });
            }
            OperandKind::PcRelative { .. } | OperandKind::RegisterList { .. } => {
                return Err(ExecError::InvalidOperation(format!(
                    "{:?} has no single value",
                    operand.kind
                )));
            }
        };

        let address = self.effective(address, tsize);
        if tsize == 0 {
            return Ok(Resolved { address: Some(address), value: Value::Undefined });
        }
        let value = mem.read_value(address, tsize)?;
        Ok(Resolved { address: Some(address), value: Value::Known(value) })
    }

    /// Read an operand's value, discarding its address.
    #[inline]
    pub fn read(
        &self,
        operand: &Operand,
        ctx: &mut RegisterContext,
        mem: &dyn Memory,
    ) -> Result<Value, ExecError> {
        Ok(self.resolve(operand, ctx, mem)?.value)
    }

    /// Store to an operand that was not read first, applying its step.
    pub fn write_back(
        &self,
        operand: &Operand,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        value: Value,
    ) -> Result<(), ExecError> {
        let tsize = operand.tsize;
        let address = match operand.kind {
            OperandKind::Register(field) => return set_register(ctx, field, value),
            OperandKind::Indirect { base, step, writeback } => {
                self.step_base(ctx, base, step, writeback, tsize)
            }
            OperandKind::Displacement { base, disp } => {
                ctx.get(base).known().map(|b| b.wrapping_add(disp as u32))
            }
            OperandKind::Absolute { address, .. } => Some(address),
            _ => {
                return Err(ExecError::InvalidOperation(format!(
                    "cannot store to {:?}",
                    operand.kind
                )));
            }
        };
        self.store_at(mem, address.map(|a| self.effective(a, tsize)), tsize, value)
    }

    /// Complete a read-modify-write of an operand returned by [`resolve`].
    ///
    /// [`resolve`]: Addressing::resolve
    pub fn update(
        &self,
        operand: &Operand,
        resolved: &Resolved,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        value: Value,
    ) -> Result<(), ExecError> {
        match operand.kind {
            OperandKind::Register(field) => set_register(ctx, field, value),
            _ if operand.is_memory() => self.store_at(mem, resolved.address, operand.tsize, value),
            _ => Err(ExecError::InvalidOperation(format!(
                "cannot store to {:?}",
                operand.kind
            ))),
        }
    }

    /// Write `tsize` bytes at an already-resolved address.
    pub fn store_at(
        &self,
        mem: &mut dyn Memory,
        address: Option<u32>,
        tsize: u8,
        value: Value,
    ) -> Result<(), ExecError> {
        match (address, value) {
            (Some(address), Value::Known(v)) => Ok(mem.write_value(address, tsize, v)?),
            (None, _) => {
                log::debug!("skipping {} byte store to unknown address", tsize);
                Ok(())
            }
            (Some(address), Value::Undefined) => {
                log::debug!("skipping undefined {} byte store at {:06X}", tsize, address);
                Ok(())
            }
        }
    }

    /// Target of a control transfer.
    ///
    /// `@ERn`, `@aa:24` and PC-relative operands name the target directly;
    /// `@@aa:8` reads it from the vector at `aa`.
    pub fn jump_target(
        &self,
        operand: &Operand,
        op: &Operation,
        ctx: &RegisterContext,
        mem: &dyn Memory,
    ) -> Result<u32, ExecError> {
        let target = match operand.kind {
            OperandKind::Indirect { base, .. } => ctx
                .get(base)
                .known()
                .ok_or(ExecError::UndefinedTarget { address: op.address })?,
            OperandKind::Absolute { address, .. } => address,
            OperandKind::PcRelative { disp } => op.next_address().wrapping_add(disp as u32),
            OperandKind::MemoryIndirect { address } => self.read_pointer(mem, address)?,
            OperandKind::Register(field) => ctx
                .get_field(field)
                .known()
                .ok_or(ExecError::UndefinedTarget { address: op.address })?,
            _ => {
                return Err(ExecError::InvalidOperation(format!(
                    "{} cannot jump through {:?}",
                    op.name(),
                    operand.kind
                )));
            }
        };
        Ok(target & self.mode.address_mask())
    }

    /// Read a code pointer (vector or `@@aa:8` slot).
    pub fn read_pointer(&self, mem: &dyn Memory, address: u32) -> Result<u32, ExecError> {
        let size = self.mode.pointer_size();
        let pointer = mem.read_value(self.effective(address, size), size)?;
        Ok(pointer & self.mode.address_mask())
    }

    // ========================================================================
    // Stack
    // ========================================================================

    /// Decrement SP by `tsize`, then store `value` there.
    pub fn push(
        &self,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        tsize: u8,
        value: Value,
    ) -> Result<(), ExecError> {
        let address = self.step_base(ctx, RegisterId::SP, Some(Step::PreDecrement), true, tsize);
        self.store_at(mem, address.map(|a| self.effective(a, tsize)), tsize, value)
    }

    /// Load `tsize` bytes at SP, then increment SP.
    pub fn pop(
        &self,
        ctx: &mut RegisterContext,
        mem: &dyn Memory,
        tsize: u8,
    ) -> Result<Value, ExecError> {
        let Some(address) =
            self.step_base(ctx, RegisterId::SP, Some(Step::PostIncrement), true, tsize)
        else {
            return Ok(Value::Undefined);
        };
        Ok(Value::Known(mem.read_value(self.effective(address, tsize), tsize)?))
    }

    // ========================================================================
    // Register lists
    // ========================================================================

    /// Move every register in a list operand to or from memory.
    ///
    /// Registers go in ascending index order. Returns whether PC was loaded.
    pub fn transfer_list(
        &self,
        operand: &Operand,
        direction: Transfer,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<bool, ExecError> {
        let OperandKind::RegisterList { base, mask, before, increment, writeback } = operand.kind
        else {
            return Err(ExecError::InvalidOperation(format!(
                "expected a register list, got {:?}",
                operand.kind
            )));
        };
        let tsize = operand.tsize;
        let registers = (0..RegisterId::COUNT)
            .filter(|i| mask & (1 << i) != 0)
            .filter_map(RegisterId::from_index);

        let Value::Known(mut address) = ctx.get(base) else {
            log::debug!("register list base {} is undefined", base);
            let mut pc_loaded = false;
            if direction == Transfer::Load {
                for reg in registers {
                    if reg == RegisterId::PC {
                        pc_loaded = true;
                    } else {
                        ctx.set(reg, Value::Undefined);
                    }
                }
            }
            if pc_loaded {
                return Err(ExecError::UndefinedTarget { address: ctx.pc() });
            }
            return Ok(false);
        };

        let advance = |a: u32| {
            if increment {
                a.wrapping_add(tsize as u32)
            } else {
                a.wrapping_sub(tsize as u32)
            }
        };

        let mut pc_loaded = false;
        for reg in registers {
            if before {
                address = advance(address);
            }
            let at = self.effective(address, tsize);
            match direction {
                Transfer::Load => {
                    let value = mem.read_value(at, tsize)?;
                    ctx.set(reg, Value::Known(value));
                    pc_loaded |= reg == RegisterId::PC;
                }
                Transfer::Store => self.store_at(mem, Some(at), tsize, ctx.get(reg))?,
            }
            if !before {
                address = advance(address);
            }
        }

        if writeback {
            ctx.set(base, Value::Known(address));
        }
        Ok(pc_loaded)
    }

    /// Apply a step to `base` and return the address to access.
    fn step_base(
        &self,
        ctx: &mut RegisterContext,
        base: RegisterId,
        step: Option<Step>,
        writeback: bool,
        tsize: u8,
    ) -> Option<u32> {
        let current = ctx.get(base).known()?;
        match step {
            None => Some(current),
            Some(Step::PreDecrement) => {
                let address = current.wrapping_sub(tsize as u32);
                if writeback {
                    ctx.set_known(base, address);
                }
                Some(address)
            }
            Some(Step::PostIncrement) => {
                if writeback {
                    ctx.set_known(base, current.wrapping_add(tsize as u32));
                }
                Some(current)
            }
        }
    }
}

/// Write a register operand. PC only accepts concrete values.
fn set_register(ctx: &mut RegisterContext, field: Field, value: Value) -> Result<(), ExecError> {
    if field.backing() == RegisterId::PC && value.is_undefined() {
        return Err(ExecError::UndefinedTarget { address: ctx.pc() });
    }
    ctx.set_field(field, value);
    Ok(())
}
