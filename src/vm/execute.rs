//! Intcode execution engine.
//!
//! Implements the fetch-decode-execute cycle as an explicit step function.
//! The engine suspends only at input and output instructions; every step
//! reports a [`Step`] so callers can drive any number of engines from one
//! thread, or give each engine its own worker.

use crate::vm::channel::Channel;
use crate::vm::decode::{self, DecodeError, Instruction, Mode, Opcode};
use crate::vm::memory::Memory;
use crate::vm::registers::Registers;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// What an input instruction does when its channel is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputPolicy {
    /// Report `NeedsInput` without advancing; the read is retried on resume.
    #[default]
    Suspend,
    /// Fail with `InputStarved`.
    Strict,
    /// Store `fallback` and carry on. After `idle_after` consecutive empty
    /// reads the step reports `NeedsInput` as an idle signal; the read itself
    /// has already completed.
    Poll { fallback: i64, idle_after: u32 },
    /// Wait up to `timeout` for another thread to push a value, then behave
    /// like `Suspend`.
    Block { timeout: Duration },
}

impl InputPolicy {
    /// The switched-network convention: read `-1` when no packet is queued,
    /// idle on the second empty read in a row.
    pub const fn network() -> Self {
        InputPolicy::Poll { fallback: -1, idle_after: 2 }
    }
}

/// Engine execution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Constructed or between steps, ready to execute.
    Ready,
    /// Inside `step`.
    Running,
    /// Suspended on an input instruction.
    AwaitingInput,
    /// Executed the halt instruction.
    Halted,
    /// Stopped by a fatal error.
    Failed(EngineError),
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// An instruction completed without I/O.
    Continued,
    /// An output instruction emitted this value.
    Produced(i64),
    /// The engine needs input before it can continue.
    NeedsInput,
    /// The engine has halted.
    Halted,
    /// The engine stopped with a fatal error.
    Failed(EngineError),
}

impl Step {
    /// True for `Halted` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Halted | Step::Failed(_))
    }
}

/// The Intcode engine.
pub struct Engine {
    /// Engine registers.
    regs: Registers,
    /// Private memory.
    mem: Memory,
    /// Current execution state.
    state: EngineState,
    /// Input policy.
    policy: InputPolicy,
    input: Channel,
    output: Channel,
    /// Completed instruction count.
    cycles: u64,
    /// Consecutive empty reads under the poll policy.
    empty_reads: u32,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Engine {
    /// Create an engine with fresh input and output channels.
    pub fn new(program: &[i64]) -> Self {
        Self::with_channels(program, Channel::new(), Channel::new())
    }

    /// Create an engine bound to existing channels.
    pub fn with_channels(program: &[i64], input: Channel, output: Channel) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(program),
            state: EngineState::Ready,
            policy: InputPolicy::default(),
            input,
            output,
            cycles: 0,
            empty_reads: 0,
            last_instr: None,
        }
    }

    /// Select the input policy.
    pub fn with_policy(mut self, policy: InputPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Change the input policy of a constructed engine.
    pub fn set_policy(&mut self, policy: InputPolicy) {
        self.policy = policy;
    }

    /// Handle to the input channel.
    pub fn input(&self) -> &Channel {
        &self.input
    }

    /// Handle to the output channel.
    pub fn output(&self) -> &Channel {
        &self.output
    }

    /// Queue an input value.
    pub fn push_input(&self, value: i64) {
        self.input.push(value);
    }

    /// Take every value waiting on the output channel.
    pub fn drain_output(&self) -> Vec<i64> {
        self.output.drain()
    }

    /// Execute a single instruction, or perform one suspension.
    pub fn step(&mut self) -> Step {
        match &self.state {
            EngineState::Halted => return Step::Halted,
            EngineState::Failed(err) => return Step::Failed(err.clone()),
            _ => {}
        }

        self.state = EngineState::Running;
        let step = match self.execute() {
            Ok(step) => step,
            Err(err) => Step::Failed(err),
        };

        self.state = match &step {
            Step::Continued | Step::Produced(_) => EngineState::Ready,
            Step::NeedsInput => EngineState::AwaitingInput,
            Step::Halted => EngineState::Halted,
            Step::Failed(err) => {
                log::debug!("engine failed at pc={}: {}", self.regs.pc, err);
                EngineState::Failed(err.clone())
            }
        };
        step
    }

    /// Step until something other than `Continued` happens.
    pub fn run_until_suspend(&mut self) -> Step {
        loop {
            match self.step() {
                Step::Continued => continue,
                other => return other,
            }
        }
    }

    /// Run until halt, leaving all outputs on the output channel.
    ///
    /// Returns the number of instructions executed. Needing input that is not
    /// queued is reported as `InputStarved` since nobody can supply it.
    pub fn run_to_halt(&mut self) -> Result<u64, EngineError> {
        let start_cycles = self.cycles;

        loop {
            match self.run_until_suspend() {
                Step::Produced(_) | Step::Continued => {}
                Step::Halted => return Ok(self.cycles - start_cycles),
                Step::NeedsInput => return Err(EngineError::InputStarved { pc: self.regs.pc }),
                Step::Failed(err) => return Err(err),
            }
        }
    }

    /// Execute the instruction at PC.
    fn execute(&mut self) -> Result<Step, EngineError> {
        let pc = self.regs.pc;
        let word = self.mem.read(pc);
        let instr = decode::decode(word).map_err(|source| EngineError::Decode { pc, source })?;

        log::trace!("pc={:<6} rb={:<6} {:?} {:?}", pc, self.regs.relative_base, instr.opcode, instr.modes);

        let mut jump = None;
        let step = match instr.opcode {
            // ==================== Arithmetic ====================
            Opcode::Add => {
                let (a, b) = (self.operand(&instr, 0)?, self.operand(&instr, 1)?);
                let sum = a.checked_add(b).ok_or(EngineError::Overflow { pc })?;
                self.store(&instr, 2, sum)?;
                Step::Continued
            }

            Opcode::Mul => {
                let (a, b) = (self.operand(&instr, 0)?, self.operand(&instr, 1)?);
                let product = a.checked_mul(b).ok_or(EngineError::Overflow { pc })?;
                self.store(&instr, 2, product)?;
                Step::Continued
            }

            // ==================== I/O ====================
            Opcode::Input => {
                let dst = self.write_address(&instr, 0)?;
                match self.read_input(pc) {
                    Ok(value) => {
                        self.mem.write(dst, value);
                        Step::Continued
                    }
                    Err(Starved::Suspend) => return Ok(Step::NeedsInput),
                    Err(Starved::Fallback { value, idle }) => {
                        self.mem.write(dst, value);
                        self.retire(instr, None);
                        return Ok(if idle { Step::NeedsInput } else { Step::Continued });
                    }
                    Err(Starved::Fatal(err)) => return Err(err),
                }
            }

            Opcode::Output => {
                let value = self.operand(&instr, 0)?;
                self.output.push(value);
                // An engine that just sent something is not idle.
                self.empty_reads = 0;
                Step::Produced(value)
            }

            // ==================== Control Flow ====================
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let cond = self.operand(&instr, 0)?;
                let target = self.operand(&instr, 1)?;
                if (cond != 0) == (instr.opcode == Opcode::JumpIfTrue) {
                    jump = Some(to_address(pc, target)?);
                }
                Step::Continued
            }

            // ==================== Comparison ====================
            Opcode::LessThan => {
                let (a, b) = (self.operand(&instr, 0)?, self.operand(&instr, 1)?);
                self.store(&instr, 2, (a < b) as i64)?;
                Step::Continued
            }

            Opcode::Equals => {
                let (a, b) = (self.operand(&instr, 0)?, self.operand(&instr, 1)?);
                self.store(&instr, 2, (a == b) as i64)?;
                Step::Continued
            }

            // ==================== Special ====================
            Opcode::AdjustBase => {
                let delta = self.operand(&instr, 0)?;
                self.regs.adjust_base(delta).ok_or(EngineError::Overflow { pc })?;
                Step::Continued
            }

            // PC stays on the halt instruction.
            Opcode::Halt => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                return Ok(Step::Halted);
            }
        };

        self.retire(instr, jump);
        Ok(step)
    }

    /// Count an instruction as executed and move to the next one.
    fn retire(&mut self, instr: Instruction, jump: Option<usize>) {
        self.cycles += 1;
        self.last_instr = Some(instr);
        match jump {
            Some(addr) => self.regs.jump(addr),
            None => self.regs.advance(instr.width()),
        }
    }

    /// Pull the next input value according to the input policy.
    fn read_input(&mut self, pc: usize) -> Result<i64, Starved> {
        let value = match self.policy {
            InputPolicy::Block { timeout } => self.input.pop_timeout(timeout),
            _ => self.input.pop(),
        };

        if let Some(value) = value {
            self.empty_reads = 0;
            return Ok(value);
        }

        match self.policy {
            InputPolicy::Suspend | InputPolicy::Block { .. } => Err(Starved::Suspend),
            InputPolicy::Strict => Err(Starved::Fatal(EngineError::InputStarved { pc })),
            InputPolicy::Poll { fallback, idle_after } => {
                self.empty_reads = self.empty_reads.saturating_add(1);
                Err(Starved::Fallback {
                    value: fallback,
                    idle: self.empty_reads >= idle_after,
                })
            }
        }
    }

    /// Raw operand word `index` (zero based) of the current instruction.
    fn raw_operand(&self, index: usize) -> Result<i64, EngineError> {
        let pc = self.regs.pc;
        let addr = pc.checked_add(1 + index).ok_or(EngineError::AddressRange {
            pc,
            address: i64::try_from(pc).unwrap_or(i64::MAX).saturating_add(1 + index as i64),
        })?;
        Ok(self.mem.read(addr))
    }

    /// Resolve a read operand according to its mode.
    fn operand(&self, instr: &Instruction, index: usize) -> Result<i64, EngineError> {
        let raw = self.raw_operand(index)?;
        match instr.mode(index) {
            Mode::Immediate => Ok(raw),
            mode => {
                let addr = self
                    .regs
                    .effective_address(raw, mode)
                    .ok_or(EngineError::Overflow { pc: self.regs.pc })?;
                Ok(self.mem.read(to_address(self.regs.pc, addr)?))
            }
        }
    }

    /// Resolve a write operand to an address.
    fn write_address(&self, instr: &Instruction, index: usize) -> Result<usize, EngineError> {
        let pc = self.regs.pc;
        let raw = self.raw_operand(index)?;
        match instr.mode(index) {
            Mode::Immediate => Err(EngineError::InvalidWriteTarget { pc, opcode: instr.opcode }),
            mode => {
                let addr = self
                    .regs
                    .effective_address(raw, mode)
                    .ok_or(EngineError::Overflow { pc })?;
                to_address(pc, addr)
            }
        }
    }

    fn store(&mut self, instr: &Instruction, index: usize, value: i64) -> Result<(), EngineError> {
        let addr = self.write_address(instr, index)?;
        self.mem.write(addr, value);
        Ok(())
    }

    /// Current execution state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Current register values.
    pub fn registers(&self) -> Registers {
        self.regs
    }

    /// Program counter.
    pub fn pc(&self) -> usize {
        self.regs.pc
    }

    /// Relative base.
    pub fn relative_base(&self) -> i64 {
        self.regs.relative_base
    }

    /// Read-only view of memory.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Completed instruction count.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Input policy in effect.
    pub fn policy(&self) -> InputPolicy {
        self.policy
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the engine has halted.
    pub fn is_halted(&self) -> bool {
        self.state == EngineState::Halted
    }

    /// Check if the engine can still make progress.
    pub fn is_live(&self) -> bool {
        !matches!(self.state, EngineState::Halted | EngineState::Failed(_))
    }

    /// Serializable report of the engine's state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state.clone(),
            registers: self.regs,
            cycles: self.cycles,
            policy: self.policy,
            pending_input: self.input.peek_all(),
            pending_output: self.output.peek_all(),
            memory: self.mem.slice(0, self.mem.program_len()),
            overflow: self.mem.overflow_cells(),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Outcome of an input read that found the channel empty.
enum Starved {
    Suspend,
    Fallback { value: i64, idle: bool },
    Fatal(EngineError),
}

fn to_address(pc: usize, addr: i64) -> Result<usize, EngineError> {
    if addr < 0 {
        return Err(EngineError::Address { pc, address: addr });
    }
    usize::try_from(addr).map_err(|_| EngineError::AddressRange { pc, address: addr })
}

/// Point-in-time report of an engine, for display and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub registers: Registers,
    pub cycles: u64,
    pub policy: InputPolicy,
    pub pending_input: Vec<i64>,
    pub pending_output: Vec<i64>,
    /// Contents of the program region.
    pub memory: Vec<i64>,
    /// Non-zero cells beyond the program region.
    pub overflow: Vec<(usize, i64)>,
}

/// Errors that stop an engine. All are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("decode error at pc={pc}: {source}")]
    Decode { pc: usize, source: DecodeError },

    #[error("{opcode:?} at pc={pc} writes through an immediate operand")]
    InvalidWriteTarget { pc: usize, opcode: Opcode },

    #[error("input starved at pc={pc}")]
    InputStarved { pc: usize },

    #[error("negative address {address} at pc={pc}")]
    Address { pc: usize, address: i64 },

    #[error("address {address} out of range at pc={pc}")]
    AddressRange { pc: usize, address: i64 },

    #[error("arithmetic overflow at pc={pc}")]
    Overflow { pc: usize },
}
