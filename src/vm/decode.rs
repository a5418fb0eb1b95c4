//! Instruction decoder for Intcode.
//!
//! An instruction word packs the opcode in its two low decimal digits and
//! one parameter mode per operand in the digits above, least significant
//! first. `1002` is therefore `mul` with modes (positional, immediate,
//! positional).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Operand is `memory[value]` (digit 0)
    #[default]
    Position,
    /// Operand is `value` itself (digit 1)
    Immediate,
    /// Operand is `memory[value + relative_base]` (digit 2)
    Relative,
}

impl Mode {
    /// Create from a mode digit.
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }

    /// Convert to a mode digit.
    pub fn to_digit(self) -> i64 {
        match self {
            Mode::Position => 0,
            Mode::Immediate => 1,
            Mode::Relative => 2,
        }
    }
}

/// Intcode operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    // ==================== Arithmetic ====================
    /// `dst = a + b`
    Add,
    /// `dst = a * b`
    Mul,

    // ==================== I/O ====================
    /// `dst = next input value`
    Input,
    /// emit `a`
    Output,

    // ==================== Control Flow ====================
    /// `pc = b` if `a != 0`
    JumpIfTrue,
    /// `pc = b` if `a == 0`
    JumpIfFalse,

    // ==================== Comparison ====================
    /// `dst = (a < b) as i64`
    LessThan,
    /// `dst = (a == b) as i64`
    Equals,

    // ==================== Special ====================
    /// `relative_base += a`
    AdjustBase,
    /// Stop execution
    Halt,
}

impl Opcode {
    /// Look up an opcode by its numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Opcode::Add,
            2 => Opcode::Mul,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustBase,
            99 => Opcode::Halt,
            _ => return None,
        })
    }

    /// Numeric code stored in the two low digits of the word.
    pub fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Mul => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of operands following the opcode word.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Total instruction width in words, opcode included.
    pub fn width(self) -> usize {
        self.arity() + 1
    }

    /// Index of the operand written by this instruction, if any.
    pub fn write_operand(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => Some(2),
            Opcode::Input => Some(0),
            _ => None,
        }
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustBase => "ARB",
            Opcode::Halt => "HLT",
        }
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Modes for operands 1..=3; positions past the arity are positional.
    pub modes: [Mode; 3],
}

impl Instruction {
    /// Mode of operand `index` (zero based).
    pub fn mode(&self, index: usize) -> Mode {
        self.modes.get(index).copied().unwrap_or_default()
    }

    /// Instruction width in words.
    pub fn width(&self) -> usize {
        self.opcode.width()
    }
}

/// Decode a raw instruction word.
pub fn decode(word: i64) -> Result<Instruction, DecodeError> {
    if word < 0 {
        return Err(DecodeError::Malformed(word));
    }

    let code = word % 100;
    let opcode = Opcode::from_code(code).ok_or(DecodeError::UnknownOpcode { word, opcode: code })?;

    let mut mode_digits = word / 100;
    if mode_digits >= 1000 {
        return Err(DecodeError::Malformed(word));
    }

    // Digits past the arity are never consulted.
    let mut modes = [Mode::Position; 3];
    for mode in modes.iter_mut().take(opcode.arity()) {
        let digit = mode_digits % 10;
        *mode = Mode::from_digit(digit).ok_or(DecodeError::UnknownMode { word, mode: digit })?;
        mode_digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}

/// Encode an instruction back to its word.
pub fn encode(instr: &Instruction) -> i64 {
    let modes = instr
        .modes
        .iter()
        .rev()
        .fold(0, |acc, mode| acc * 10 + mode.to_digit());
    modes * 100 + instr.opcode.code()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecodeError {
    #[error("unknown opcode {opcode} in word {word}")]
    UnknownOpcode { word: i64, opcode: i64 },

    #[error("unknown parameter mode {mode} in word {word}")]
    UnknownMode { word: i64, mode: i64 },

    #[error("malformed instruction word {0}")]
    Malformed(i64),
}
