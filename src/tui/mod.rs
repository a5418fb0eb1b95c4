//! TUI debugger for Intcode programs.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and engine state view
//! - Memory view
//! - Step/run/breakpoint controls and an input prompt
//! - Disassembly and output views

mod app;
mod ui;

pub use app::{run_debugger, DebuggerApp};
