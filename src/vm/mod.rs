//! Intcode virtual machine.
//!
//! This module implements the complete Intcode machine:
//! - sparse, unbounded integer memory
//! - 2 registers: PC and the relative base
//! - 10-instruction set with positional, immediate and relative operands
//! - integer channels for input and output

pub mod memory;
pub mod registers;
pub mod decode;
pub mod channel;
pub mod execute;

pub use memory::Memory;
pub use registers::Registers;
pub use decode::{decode, encode, DecodeError, Instruction, Mode, Opcode};
pub use channel::Channel;
pub use execute::{Engine, EngineError, EngineSnapshot, EngineState, InputPolicy, Step};
