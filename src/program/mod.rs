//! Program text handling for Intcode.
//!
//! This module provides:
//! - A loader for comma-separated program text
//! - A disassembler (memory → readable text)

pub mod loader;
pub mod disasm;

pub use loader::{format_program, load_program, parse_program, parse_values, ProgramError};
pub use disasm::{disassemble, disassemble_at};
