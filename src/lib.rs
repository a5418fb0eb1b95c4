//! # Intcode VM
//!
//! An interpreter for Intcode, a small self-modifying integer machine, plus
//! the interconnects used to wire several machines together.
//!
//! An [`Engine`] never blocks on its own: it runs until it produces a value,
//! needs input, halts or fails, and reports which. Multi-engine patterns in
//! [`net`] are built purely from stepping engines and moving values between
//! [`Channel`]s.

pub mod vm;
pub mod net;
pub mod program;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use vm::{Channel, Engine, EngineError, EngineState, InputPolicy, Memory, Registers, Step};
pub use vm::{DecodeError, Instruction, Mode, Opcode};
pub use net::{FeedbackRing, NetworkConfig, NetworkPacket, SwitchedNetwork, Transcript};
pub use program::{disassemble, load_program, parse_program, ProgramError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
