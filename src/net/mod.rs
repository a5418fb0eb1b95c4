//! Interconnects built from engines and channels.
//!
//! - [`duplex`]: one engine driven by a synchronous controller
//! - [`ring`]: feedback rings and the phase-setting search
//! - [`switched`]: addressed packet network with an idle monitor
//! - [`ascii`]: the character-code protocol with out-of-band signals
//!
//! None of these reach into an engine's memory or registers; they only step
//! engines and move values through channels.

pub mod duplex;
pub mod ring;
pub mod switched;
pub mod ascii;

pub use duplex::{run_duplex, Controller, DuplexOutcome, FnController};
pub use ring::{max_signal, max_signal_threaded, FeedbackRing, MaxSignal, Permutations, RingError};
pub use switched::{NetworkConfig, NetworkError, NetworkPacket, SteadyState, SwitchedNetwork};
pub use ascii::{encode_line, AsciiDecoder, AsciiEvent, AsciiSession, Transcript};
