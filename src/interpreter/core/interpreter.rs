//! Core interpreter implementation.
//!
//! The interpreter manages the fetch-decode-execute loop for one H8/300H CPU.

use smallvec::SmallVec;

use crate::interpreter::decode::InstructionDecoder;
use crate::interpreter::execute::H8Executor;
use crate::interpreter::mode::CpuMode;
use crate::interpreter::operation::Operation;
use crate::interpreter::state::RegisterContext;
use crate::interpreter::traits::{Decoder, ExecuteResult, Executor, Memory, StepError};

/// Core execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreStatus {
    /// Ready to fetch the instruction at PC.
    #[default]
    Fetching,
    /// Decoded, executing.
    Executing,
    /// SLEEP executed; steps do nothing until woken.
    Sleeping,
    /// The last step failed.
    Error,
}

/// Result of a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// An instruction retired; PC holds the next one.
    Continue,
    /// The CPU is asleep.
    Sleep,
}

/// Per-CPU interpreter.
///
/// Couples a decoder and an executor. The default configuration uses
/// [`InstructionDecoder`] and an advanced-mode [`H8Executor`].
pub struct CoreInterpreter<D = InstructionDecoder, E = H8Executor>
where
    D: Decoder,
    E: Executor,
{
    /// Instruction decoder.
    decoder: D,
    /// Execution unit.
    executor: E,
    /// Current core status.
    status: CoreStatus,
    /// Last decoded operation (for debugging).
    last_operation: Option<Operation>,
    /// Address mask for instruction fetch and PC updates.
    address_mask: u32,
}

impl CoreInterpreter<InstructionDecoder, H8Executor> {
    /// Create an interpreter with the standard decoder and an executor for `mode`.
    pub fn for_mode(mode: CpuMode) -> Self {
        Self::new(InstructionDecoder::new(), H8Executor::new(mode)).with_mode(mode)
    }
}

impl Default for CoreInterpreter<InstructionDecoder, H8Executor> {
    fn default() -> Self {
        Self::for_mode(CpuMode::default())
    }
}

impl<D, E> CoreInterpreter<D, E>
where
    D: Decoder,
    E: Executor,
{
    /// Create a new interpreter with the given decoder and executor.
    pub fn new(decoder: D, executor: E) -> Self {
        Self {
            decoder,
            executor,
            status: CoreStatus::Fetching,
            last_operation: None,
            address_mask: CpuMode::default().address_mask(),
        }
    }

    /// Wrap fetches and PC updates at the address width of `mode`.
    pub fn with_mode(mut self, mode: CpuMode) -> Self {
        self.address_mask = mode.address_mask();
        self
    }

    pub fn status(&self) -> CoreStatus {
        self.status
    }

    pub fn is_sleeping(&self) -> bool {
        self.status == CoreStatus::Sleeping
    }

    /// Get the last decoded operation (for debugging).
    pub fn last_operation(&self) -> Option<&Operation> {
        self.last_operation.as_ref()
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Fetch, decode and execute the instruction at PC.
    ///
    /// Fetches up to the decoder's maximum instruction length, stopping at
    /// the first unreadable byte; only an unreadable first byte is an error
    /// here; a short fetch surfaces as `Incomplete` from the decoder.
    pub fn step(&mut self, ctx: &mut RegisterContext, mem: &mut dyn Memory) -> Result<StepResult, StepError> {
        if ctx.sleeping {
            self.status = CoreStatus::Sleeping;
            return Ok(StepResult::Sleep);
        }

        let pc = ctx.pc();
        let mut bytes: SmallVec<[u8; 16]> = SmallVec::new();
        for i in 0..self.decoder.max_instruction_len() as u32 {
            let mut byte = [0u8];
            match mem.read(pc.wrapping_add(i) & self.address_mask, &mut byte) {
                Ok(()) => bytes.push(byte[0]),
                Err(e) if i == 0 => {
                    self.status = CoreStatus::Error;
                    return Err(e.into());
                }
                Err(_) => break,
            }
        }

        self.step_bytes(&bytes, ctx, mem)
    }

    /// Decode and execute caller-supplied bytes as the instruction at PC.
    pub fn step_bytes(
        &mut self,
        bytes: &[u8],
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
    ) -> Result<StepResult, StepError> {
        let pc = ctx.pc();
        self.status = CoreStatus::Fetching;

        let op = match self.decoder.decode(bytes, pc) {
            Ok(op) => op,
            Err(e) => {
                log::debug!("decode failed at {:06X}: {}", pc, e);
                self.status = CoreStatus::Error;
                return Err(e.into());
            }
        };
        log::trace!("{:06X}: {} {:?}", pc, op.name(), op.operands);

        self.status = CoreStatus::Executing;
        let result = self.executor.execute(&op, ctx, mem);
        let length = op.length as u32;
        self.last_operation = Some(op);

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                self.status = CoreStatus::Error;
                return Err(e.into());
            }
        };

        ctx.record_instruction();
        match result {
            ExecuteResult::Continue => {
                ctx.set_pc(ctx.pc().wrapping_add(length) & self.address_mask);
                self.status = CoreStatus::Fetching;
                Ok(StepResult::Continue)
            }

            ExecuteResult::Branch { target } => {
                ctx.set_pc(target & self.address_mask);
                self.status = CoreStatus::Fetching;
                Ok(StepResult::Continue)
            }

            ExecuteResult::Sleep => {
                ctx.set_pc(ctx.pc().wrapping_add(length) & self.address_mask);
                self.status = CoreStatus::Sleeping;
                Ok(StepResult::Sleep)
            }
        }
    }

    /// Run up to `max_steps` instructions, stopping early on SLEEP.
    ///
    /// Returns the last step result and the number of instructions retired.
    pub fn run(
        &mut self,
        ctx: &mut RegisterContext,
        mem: &mut dyn Memory,
        max_steps: u64,
    ) -> Result<(StepResult, u64), StepError> {
        let start = ctx.instructions;

        for _ in 0..max_steps {
            if let StepResult::Sleep = self.step(ctx, mem)? {
                return Ok((StepResult::Sleep, ctx.instructions - start));
            }
        }

        Ok((StepResult::Continue, ctx.instructions - start))
    }

    /// Leave the sleep state.
    pub fn wake(&mut self, ctx: &mut RegisterContext) {
        ctx.sleeping = false;
        self.status = CoreStatus::Fetching;
    }

    /// Reset the interpreter state.
    pub fn reset(&mut self) {
        self.status = CoreStatus::Fetching;
        self.last_operation = None;
    }
}
