//! Intcode program text.
//!
//! Programs are stored as a single comma-separated list of signed integers.
//! Whitespace and newlines around values are ignored, as are empty entries
//! (a trailing comma is common).

use std::path::Path;
use thiserror::Error;

/// Parse comma-separated program text.
pub fn parse_program(text: &str) -> Result<Vec<i64>, ProgramError> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token.parse::<i64>().map_err(|e| ProgramError::ParseError {
                index,
                token: token.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Render a program as comma-separated text.
pub fn format_program(program: &[i64]) -> String {
    program
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Load a program from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<i64>, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
    let program = parse_program(&text)?;
    if program.is_empty() {
        return Err(ProgramError::Empty);
    }
    Ok(program)
}

/// Parse a comma-separated list of values given on the command line.
pub fn parse_values(text: &str) -> Result<Vec<i64>, ProgramError> {
    parse_program(text)
}

/// Errors that can occur while loading program text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("bad value {token:?} at position {index}: {message}")]
    ParseError { index: usize, token: String, message: String },

    #[error("program is empty")]
    Empty,
}
