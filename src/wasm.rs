//! WebAssembly bindings for the Intcode engine.
//!
//! This module provides JavaScript-friendly wrappers around the core engine.

use crate::program::disasm::disassemble_at;
use crate::program::parse_program;
use crate::{Engine, Step};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly engine wrapper.
#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
    program: Vec<i64>,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Create an engine with an empty program.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            engine: Engine::new(&[]),
            program: Vec::new(),
        }
    }

    /// Load a program from comma-separated text.
    #[wasm_bindgen]
    pub fn load(&mut self, source: &str) -> Result<usize, JsError> {
        let program = parse_program(source).map_err(|e| JsError::new(&e.to_string()))?;
        let len = program.len();
        self.engine = Engine::new(&program);
        self.program = program;
        Ok(len)
    }

    /// Queue an input value.
    #[wasm_bindgen]
    pub fn push_input(&mut self, value: i64) {
        self.engine.push_input(value);
    }

    /// Queue a line of ASCII input.
    #[wasm_bindgen]
    pub fn push_line(&mut self, line: &str) {
        self.engine.input().extend(crate::net::encode_line(line));
    }

    /// Step once. Returns the step kind as a string.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        match self.engine.step() {
            Step::Continued => Ok("continued".into()),
            Step::Produced(_) => Ok("produced".into()),
            Step::NeedsInput => Ok("needs_input".into()),
            Step::Halted => Ok("halted".into()),
            Step::Failed(err) => Err(JsError::new(&err.to_string())),
        }
    }

    /// Run until the engine suspends or `max_cycles` instructions execute.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> u64 {
        let limit = self.engine.cycles() + u64::from(max_cycles);
        while self.engine.cycles() < limit {
            match self.engine.step() {
                Step::Continued | Step::Produced(_) => {}
                _ => break,
            }
        }
        self.engine.cycles()
    }

    /// Reset engine to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.engine = Engine::new(&self.program);
    }

    /// Take all pending outputs.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> js_sys::Array {
        self.engine
            .drain_output()
            .into_iter()
            .map(|v| JsValue::from(js_sys::BigInt::from(v)))
            .collect()
    }

    /// Check if the engine has halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.engine.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.engine.cycles()
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.engine.pc()
    }

    /// Get relative base.
    #[wasm_bindgen]
    pub fn relative_base(&self) -> i64 {
        self.engine.relative_base()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.engine.state())
    }

    /// Get memory cell value at address.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> i64 {
        self.engine.memory().read(addr)
    }

    /// Get `count` memory cells starting at `start`.
    #[wasm_bindgen]
    pub fn memory_range(&self, start: usize, count: usize) -> Vec<i64> {
        self.engine.memory().slice(start, count)
    }

    /// Disassemble the instruction at an address.
    #[wasm_bindgen]
    pub fn disassemble_at(&self, addr: usize) -> String {
        disassemble_at(self.engine.memory(), addr).0
    }

    /// Get registers and state as a JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        let snapshot = self.engine.snapshot();
        serde_json::to_string(&serde_json::json!({
            "pc": snapshot.registers.pc,
            "relative_base": snapshot.registers.relative_base,
            "state": snapshot.state,
            "cycles": snapshot.cycles,
            "pending_input": snapshot.pending_input,
        }))
        .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Disassemble a whole program given as comma-separated text.
#[wasm_bindgen]
pub fn wasm_disassemble(source: &str) -> Result<String, JsError> {
    let program = parse_program(source).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(crate::program::disassemble(&program))
}
