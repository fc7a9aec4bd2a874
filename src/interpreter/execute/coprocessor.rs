//! Host-attached coprocessors.
//!
//! The H8/300H opcode map has no coprocessor encodings, so operations with
//! [`Mnemonic::Coprocessor`] are built by the host rather than decoded.
//! Operand 0 is always an immediate selecting one of 16 slots; the rest are
//! passed through untouched.

use std::fmt;

use crate::interpreter::operation::{CoprocessorOp, Mnemonic, Operand, OperandKind, Operation};
use crate::interpreter::state::RegisterContext;
use crate::interpreter::traits::{ExecError, ExecuteResult, Memory};

use super::HandlerResult;

/// Number of coprocessor slots.
pub const COPROCESSOR_SLOTS: usize = 16;

/// A device answering coprocessor operations.
///
/// Each entry point receives the operand list after the slot selector.
pub trait Coprocessor: Send {
    fn store_to_memory(
        &mut self,
        operands: &[Operand],
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<(), ExecError>;

    fn load_from_memory(
        &mut self,
        operands: &[Operand],
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<(), ExecError>;

    fn data_operation(
        &mut self,
        operands: &[Operand],
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<(), ExecError>;

    fn move_to_register(
        &mut self,
        operands: &[Operand],
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<(), ExecError>;

    fn move_register_pair(
        &mut self,
        operands: &[Operand],
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<(), ExecError>;
}

/// Coprocessor slots indexed by number.
pub struct CoprocessorTable {
    slots: [Option<Box<dyn Coprocessor>>; COPROCESSOR_SLOTS],
}

impl CoprocessorTable {
    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| None) }
    }

    /// Install a coprocessor, returning the one it replaces.
    ///
    /// Fails if `number` is not below [`COPROCESSOR_SLOTS`].
    pub fn attach(
        &mut self,
        number: usize,
        coprocessor: Box<dyn Coprocessor>,
    ) -> Result<Option<Box<dyn Coprocessor>>, ExecError> {
        let slot = self.slots.get_mut(number).ok_or_else(|| {
            ExecError::InvalidOperation(format!(
                "coprocessor slot {} out of range (0-{})",
                number,
                COPROCESSOR_SLOTS - 1
            ))
        })?;
        Ok(slot.replace(coprocessor))
    }

    /// Remove and return the coprocessor in a slot.
    pub fn detach(&mut self, number: usize) -> Option<Box<dyn Coprocessor>> {
        self.slots.get_mut(number).and_then(Option::take)
    }

    pub fn is_attached(&self, number: usize) -> bool {
        matches!(self.slots.get(number), Some(Some(_)))
    }

    /// Route a coprocessor operation to its slot.
    pub fn dispatch(
        &mut self,
        op: &Operation,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> HandlerResult {
        let Mnemonic::Coprocessor(kind) = op.mnemonic else {
            return Err(ExecError::InvalidOperation(format!("{} is not a coprocessor operation", op.name())));
        };
        let number = match op.operands.first().map(|o| o.kind) {
            Some(OperandKind::Immediate(n)) => n as usize,
            other => {
                return Err(ExecError::InvalidOperation(format!(
                    "coprocessor number must be an immediate, got {:?}",
                    other
                )));
            }
        };
        let unsupported = || ExecError::Unsupported { mnemonic: op.name(), address: op.address };
        let coprocessor = self
            .slots
            .get_mut(number)
            .and_then(|slot| slot.as_deref_mut())
            .ok_or_else(unsupported)?;

        log::debug!("{} at {:06X} -> coprocessor {}", op.name(), op.address, number);
        let operands = &op.operands[1..];
        match kind {
            CoprocessorOp::StoreToMemory => coprocessor.store_to_memory(operands, ctx, mem)?,
            CoprocessorOp::LoadFromMemory => coprocessor.load_from_memory(operands, ctx, mem)?,
            CoprocessorOp::DataOperation => coprocessor.data_operation(operands, ctx, mem)?,
            CoprocessorOp::MoveToRegister => coprocessor.move_to_register(operands, ctx, mem)?,
            CoprocessorOp::MoveRegisterPair => coprocessor.move_register_pair(operands, ctx, mem)?,
        }
        Ok(ExecuteResult::Continue)
    }
}

impl Default for CoprocessorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CoprocessorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attached: Vec<_> = (0..COPROCESSOR_SLOTS).filter(|&n| self.is_attached(n)).collect();
        f.debug_struct("CoprocessorTable").field("attached", &attached).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FlatMemory;
    use crate::interpreter::operation::{InstrFlags, SizeClass};
    use crate::interpreter::state::{Field, Value};

    /// Records which entry point ran; `data_operation` writes 42 to its
    /// register operand.
    #[derive(Default)]
    struct Recorder {
        calls: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Recorder {
        fn log(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
        }
    }

    impl Coprocessor for Recorder {
        fn store_to_memory(&mut self, _: &[Operand], _: &mut RegisterContext, _: &mut dyn Memory) -> Result<(), ExecError> {
            self.log("store");
            Ok(())
        }

        fn load_from_memory(&mut self, _: &[Operand], _: &mut RegisterContext, _: &mut dyn Memory) -> Result<(), ExecError> {
            self.log("load");
            Ok(())
        }

        fn data_operation(&mut self, operands: &[Operand], ctx: &mut RegisterContext, _: &mut dyn Memory) -> Result<(), ExecError> {
            self.log("data");
            if let Some(field) = operands.first().and_then(|o| o.register()) {
                ctx.set_field(field, Value::Known(42));
            }
            Ok(())
        }

        fn move_to_register(&mut self, _: &[Operand], _: &mut RegisterContext, _: &mut dyn Memory) -> Result<(), ExecError> {
            self.log("mrc");
            Ok(())
        }

        fn move_register_pair(&mut self, _: &[Operand], _: &mut RegisterContext, _: &mut dyn Memory) -> Result<(), ExecError> {
            self.log("mrrc");
            Ok(())
        }
    }

    fn make_cop_op(kind: CoprocessorOp, number: u32) -> Operation {
        Operation::new(0x100, Mnemonic::Coprocessor(kind), 4, SizeClass::Unsized, InstrFlags::empty())
            .with_operand(Operand::imm(number, 1))
            .with_operand(Operand::reg(Field::er(1)))
    }

    #[test]
    fn test_dispatch_to_attached_slot() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let mut table = CoprocessorTable::new();
        assert!(table.attach(3, Box::new(recorder)).unwrap().is_none());

        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0, 0x10);
        let result = table.dispatch(&make_cop_op(CoprocessorOp::DataOperation, 3), &mut ctx, &mut mem);
        assert_eq!(result, Ok(ExecuteResult::Continue));
        assert_eq!(ctx.get_field(Field::er(1)), Value::Known(42));

        table.dispatch(&make_cop_op(CoprocessorOp::MoveRegisterPair, 3), &mut ctx, &mut mem).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["data", "mrrc"]);
    }

    #[test]
    fn test_empty_slot_is_unsupported() {
        let mut table = CoprocessorTable::new();
        let mut ctx = RegisterContext::new();
        let mut mem = FlatMemory::new(0, 0x10);
        let result = table.dispatch(&make_cop_op(CoprocessorOp::StoreToMemory, 7), &mut ctx, &mut mem);
        assert!(matches!(result, Err(ExecError::Unsupported { address: 0x100, .. })));

        // Out of range behaves like an empty slot
        let result = table.dispatch(&make_cop_op(CoprocessorOp::StoreToMemory, 99), &mut ctx, &mut mem);
        assert!(matches!(result, Err(ExecError::Unsupported { .. })));
    }

    #[test]
    fn test_detach() {
        let mut table = CoprocessorTable::new();
        table.attach(0, Box::new(Recorder::default())).unwrap();
        assert!(table.is_attached(0));
        assert!(table.detach(0).is_some());
        assert!(!table.is_attached(0));
        assert!(table.detach(42).is_none());
    }

    #[test]
    fn test_attach_out_of_range() {
        let mut table = CoprocessorTable::new();
        let result = table.attach(COPROCESSOR_SLOTS, Box::new(Recorder::default()));
        assert!(matches!(result, Err(ExecError::InvalidOperation(_))));
        assert!(table.attach(COPROCESSOR_SLOTS - 1, Box::new(Recorder::default())).unwrap().is_none());
        assert!(!table.is_attached(COPROCESSOR_SLOTS));
    }
}
