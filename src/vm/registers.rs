//! Intcode registers.
//!
//! An Intcode machine has two registers:
//! - PC: the program counter, an absolute address
//! - RB: the relative base, added to relative-mode operands

use crate::vm::decode::Mode;
use serde::{Deserialize, Serialize};

/// The Intcode register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter.
    pub pc: usize,

    /// Relative base, only changed by the adjust-base instruction.
    pub relative_base: i64,
}

impl Registers {
    /// Create a register file with PC and relative base at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset both registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the program counter past an instruction of `width` words.
    pub fn advance(&mut self, width: usize) {
        self.pc += width;
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: usize) {
        self.pc = addr;
    }

    /// Shift the relative base. Returns `None` on overflow, leaving it unchanged.
    pub fn adjust_base(&mut self, delta: i64) -> Option<i64> {
        let base = self.relative_base.checked_add(delta)?;
        self.relative_base = base;
        Some(base)
    }

    /// Compute the signed effective address of a memory operand.
    ///
    /// - `Position`: the raw operand is the address
    /// - `Relative`: the raw operand is an offset from the relative base
    ///
    /// Immediate operands have no address and yield `None`, as does overflow.
    pub fn effective_address(&self, raw: i64, mode: Mode) -> Option<i64> {
        match mode {
            Mode::Position => Some(raw),
            Mode::Relative => raw.checked_add(self.relative_base),
            Mode::Immediate => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_address() {
        let mut regs = Registers::new();
        regs.relative_base = 10;

        assert_eq!(regs.effective_address(50, Mode::Position), Some(50));
        assert_eq!(regs.effective_address(50, Mode::Relative), Some(60));
        assert_eq!(regs.effective_address(-15, Mode::Relative), Some(-5));
        assert_eq!(regs.effective_address(50, Mode::Immediate), None);
    }

    #[test]
    fn test_adjust_base() {
        let mut regs = Registers::new();
        assert_eq!(regs.adjust_base(19), Some(19));
        assert_eq!(regs.adjust_base(-7), Some(12));

        regs.relative_base = i64::MAX;
        assert_eq!(regs.adjust_base(1), None);
        assert_eq!(regs.relative_base, i64::MAX);
    }

    #[test]
    fn test_advance_and_jump() {
        let mut regs = Registers::new();
        regs.advance(4);
        assert_eq!(regs.pc, 4);
        regs.jump(99);
        assert_eq!(regs.pc, 99);
        regs.reset();
        assert_eq!(regs, Registers::default());
    }
}
