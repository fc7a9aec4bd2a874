//! Emulator implementation.
//!
//! Owns the register context, the memory and the core interpreter of one
//! emulated CPU.

use crate::config::Config;
use crate::device::FlatMemory;
use crate::interpreter::core::{CoreInterpreter, StepResult};
use crate::interpreter::execute::{Addressing, Coprocessor};
use crate::interpreter::mode::CpuMode;
use crate::interpreter::operation::Operation;
use crate::interpreter::state::RegisterContext;
use crate::interpreter::traits::{ExecError, ExecuteResult, Executor, Memory, StepError};

/// Emulator execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    /// Reset, nothing executed yet.
    #[default]
    Ready,
    /// At least one instruction has retired.
    Running,
    /// The CPU executed SLEEP.
    Sleeping,
    /// The last step failed.
    Error,
}

/// One emulated H8/300H processor.
pub struct Emulator<M: Memory = FlatMemory> {
    /// Core interpreter (decoder + executor).
    interpreter: CoreInterpreter,
    /// Architectural state.
    context: RegisterContext,
    /// Memory the CPU executes against.
    memory: M,
    mode: CpuMode,
    /// PC used when the reset vector is unreadable.
    reset_pc: u32,
    /// SP loaded at reset.
    initial_sp: u32,
    /// Instruction limit for [`Emulator::run`].
    max_steps: u64,
    status: EngineStatus,
}

impl Emulator<FlatMemory> {
    /// Build an emulator with a zeroed [`FlatMemory`] sized by `config`.
    pub fn from_config(config: &Config) -> Self {
        let memory = FlatMemory::new(config.memory_base(), config.memory_size() as usize);
        let mut emulator = Self::with_settings(config.mode(), memory, config);
        emulator.reset();
        emulator
    }

    /// Build an emulator from the cached global configuration.
    ///
    /// See [`Config::get`] for the files and environment variables consulted.
    pub fn from_env() -> Self {
        Self::from_config(Config::get())
    }
}

impl<M: Memory> Emulator<M> {
    /// Create an emulator over `memory` with default settings, then reset it.
    pub fn new(mode: CpuMode, memory: M) -> Self {
        let config = Config { mode: Some(mode), ..Config::default() };
        let mut emulator = Self::with_settings(mode, memory, &config);
        emulator.reset();
        emulator
    }

    fn with_settings(mode: CpuMode, memory: M, config: &Config) -> Self {
        Self {
            interpreter: CoreInterpreter::for_mode(mode),
            context: RegisterContext::new(),
            memory,
            mode,
            reset_pc: config.reset_pc(),
            initial_sp: config.initial_sp(),
            max_steps: config.max_steps(),
            status: EngineStatus::Ready,
        }
    }

    pub fn mode(&self) -> CpuMode {
        self.mode
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn context(&self) -> &RegisterContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RegisterContext {
        &mut self.context
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn interpreter(&self) -> &CoreInterpreter {
        &self.interpreter
    }

    /// Override the stack pointer loaded by [`Emulator::reset`].
    pub fn set_initial_sp(&mut self, sp: u32) {
        self.initial_sp = sp;
    }

    /// Override the fallback PC used by [`Emulator::reset`].
    pub fn set_reset_pc(&mut self, pc: u32) {
        self.reset_pc = pc;
    }

    pub fn set_max_steps(&mut self, max_steps: u64) {
        self.max_steps = max_steps;
    }

    /// Install a coprocessor in slot `number` (0-15), returning the one it replaces.
    pub fn attach_coprocessor(
        &mut self,
        number: usize,
        coprocessor: Box<dyn Coprocessor>,
    ) -> Result<Option<Box<dyn Coprocessor>>, ExecError> {
        self.interpreter.executor_mut().attach_coprocessor(number, coprocessor)
    }

    /// Power-on reset.
    ///
    /// Clears the context, loads PC from vector 0 (or the configured reset
    /// PC if the vector cannot be read) and SP from the initial stack.
    /// Memory is left untouched.
    pub fn reset(&mut self) {
        self.context.reset();
        self.interpreter.reset();

        let addressing = Addressing::new(self.mode);
        let pc = match addressing.read_pointer(&self.memory, self.mode.vector_address(0)) {
            Ok(pc) => pc,
            Err(e) => {
                log::debug!("reset vector unreadable ({}), using {:06X}", e, self.reset_pc);
                self.reset_pc
            }
        };
        self.context.set_pc(pc & self.mode.address_mask());
        self.context.set_sp(self.initial_sp & self.mode.address_mask());
        self.status = EngineStatus::Ready;
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<StepResult, StepError> {
        let result = self.interpreter.step(&mut self.context, &mut self.memory);
        self.settle(result.as_ref().ok().copied());
        result
    }

    /// Run until SLEEP, an error, or the configured instruction limit.
    ///
    /// Returns the last step result and the number of instructions retired.
    pub fn run(&mut self) -> Result<(StepResult, u64), StepError> {
        let result = self.interpreter.run(&mut self.context, &mut self.memory, self.max_steps);
        self.settle(result.as_ref().ok().map(|(step, _)| *step));
        result
    }

    /// Execute a host-built operation against this CPU's state.
    ///
    /// Used for operations that have no encoding, such as coprocessor
    /// requests. PC is not advanced; the caller applies the result.
    pub fn execute(&mut self, op: &Operation) -> Result<ExecuteResult, ExecError> {
        self.interpreter.executor_mut().execute(op, &mut self.context, &mut self.memory)
    }

    /// Leave the sleep state; the next step fetches at PC.
    pub fn wake(&mut self) {
        self.interpreter.wake(&mut self.context);
        if self.status == EngineStatus::Sleeping {
            self.status = EngineStatus::Running;
        }
    }

    /// Copy of the current register context.
    pub fn snapshot(&self) -> RegisterContext {
        self.context.clone()
    }

    /// Replace the register context with a snapshot.
    pub fn restore(&mut self, snapshot: &RegisterContext) {
        self.context = snapshot.clone();
        self.interpreter.reset();
        self.status = if self.context.sleeping { EngineStatus::Sleeping } else { EngineStatus::Ready };
    }

    fn settle(&mut self, outcome: Option<StepResult>) {
        self.status = match outcome {
            Some(StepResult::Continue) => EngineStatus::Running,
            Some(StepResult::Sleep) => EngineStatus::Sleeping,
            None => EngineStatus::Error,
        };
    }
}
