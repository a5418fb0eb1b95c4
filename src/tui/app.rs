//! Debugger application state and logic.

use crate::program::disasm::listing;
use crate::{Engine, Step};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The engine being debugged.
    pub engine: Engine,
    /// Original program for reset.
    pub program: Vec<i64>,
    /// Input queued at start and after every reset.
    pub initial_input: Vec<i64>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
    /// Everything the engine has output.
    pub outputs: Vec<i64>,
    /// Input being typed, when the input prompt is open.
    pub input_buffer: Option<String>,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<i64>, initial_input: Vec<i64>) -> Self {
        let engine = Engine::new(&program);
        engine.input().extend(initial_input.iter().copied());

        Self {
            engine,
            program,
            initial_input,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'i' to enter input, 'q' to quit.".into(),
            mem_scroll: 0,
            outputs: Vec::new(),
            input_buffer: None,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.engine.is_live() {
            self.status = format!("Engine stopped: {:?}", self.engine.state());
            self.running = false;
            return;
        }

        let pc = self.engine.pc();
        match self.engine.step() {
            Step::Continued => {
                self.status = format!("PC={:05}", pc);
            }
            Step::Produced(value) => {
                self.outputs.extend(self.engine.drain_output());
                self.status = format!("PC={:05}: output {}", pc, value);
            }
            Step::NeedsInput => {
                self.running = false;
                self.status = format!("PC={:05}: waiting for input (press 'i')", pc);
            }
            Step::Halted => {
                self.running = false;
                self.status = format!("Halted after {} cycles", self.engine.cycles());
            }
            Step::Failed(err) => {
                self.running = false;
                self.status = format!("Error: {}", err);
            }
        }
    }

    /// Run until halt, breakpoint, input wait or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        self.step();
    }

    /// Run up to `budget` instructions while continuous execution is on.
    ///
    /// Execution stops on arriving at a breakpoint, so resuming from one
    /// always executes at least the instruction under it.
    pub fn tick_many(&mut self, budget: usize) {
        for _ in 0..budget {
            if !self.running {
                break;
            }
            self.tick();
            if self.running && self.breakpoints.contains(&self.engine.pc()) {
                self.running = false;
                self.status = format!("Breakpoint at PC={}", self.engine.pc());
            }
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.engine.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Open the input prompt.
    pub fn begin_input(&mut self) {
        self.running = false;
        self.input_buffer = Some(String::new());
        self.status = "Input: type a number, Enter to send, Esc to cancel".into();
    }

    /// Add a character to the input prompt.
    pub fn input_char(&mut self, c: char) {
        if let Some(buffer) = self.input_buffer.as_mut() {
            if c.is_ascii_digit() || (c == '-' && buffer.is_empty()) {
                buffer.push(c);
            }
        }
    }

    /// Remove the last character from the input prompt.
    pub fn input_backspace(&mut self) {
        if let Some(buffer) = self.input_buffer.as_mut() {
            buffer.pop();
        }
    }

    /// Send the typed value to the engine.
    pub fn submit_input(&mut self) {
        let Some(buffer) = self.input_buffer.take() else {
            return;
        };
        match buffer.parse::<i64>() {
            Ok(value) => {
                self.engine.push_input(value);
                self.status = format!("Queued input {}", value);
            }
            Err(_) => {
                self.status = format!("Not a number: {:?}", buffer);
            }
        }
    }

    /// Close the input prompt without sending.
    pub fn cancel_input(&mut self) {
        self.input_buffer = None;
        self.status = "Input cancelled.".into();
    }

    /// Reset engine to initial state.
    pub fn reset(&mut self) {
        self.engine = Engine::new(&self.program);
        self.engine.input().extend(self.initial_input.iter().copied());
        self.outputs.clear();
        self.running = false;
        self.input_buffer = None;
        self.status = "Reset. Ready.".into();
    }

    /// Disassembly lines around the current PC: (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let pc = self.engine.pc();
        // Instructions are at most 4 words wide.
        let start = pc.saturating_sub(lines.saturating_mul(2));
        let end = pc.saturating_add(lines.saturating_mul(4));

        let all = listing(self.engine.memory(), start, end);
        let current = all.iter().position(|(addr, _)| *addr >= pc).unwrap_or(0);
        let first = current.saturating_sub(lines / 2);

        all.into_iter()
            .skip(first)
            .take(lines)
            .map(|(addr, text)| (addr, text, addr == pc))
            .collect()
    }

    /// Outputs rendered as text if they are all ASCII.
    pub fn output_text(&self) -> Option<String> {
        let bytes: Option<Vec<u8>> = self
            .outputs
            .iter()
            .map(|&v| u8::try_from(v).ok().filter(u8::is_ascii))
            .collect();
        bytes.and_then(|b| String::from_utf8(b).ok())
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<i64>, initial_input: Vec<i64>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, initial_input);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.input_buffer.is_some() {
                        match key.code {
                            KeyCode::Enter => app.submit_input(),
                            KeyCode::Esc => app.cancel_input(),
                            KeyCode::Backspace => app.input_backspace(),
                            KeyCode::Char(c) => app.input_char(c),
                            _ => {}
                        }
                    } else {
                        match key.code {
                            KeyCode::Char('q') => app.should_quit = true,
                            KeyCode::Char('s') => {
                                app.running = false;
                                app.step();
                            }
                            KeyCode::Char('r') => app.run(),
                            KeyCode::Char('p') => {
                                app.running = false;
                                app.status = "Paused.".into();
                            }
                            KeyCode::Char('b') => app.toggle_breakpoint(),
                            KeyCode::Char('i') => app.begin_input(),
                            KeyCode::Char('x') => app.reset(),
                            KeyCode::Up => {
                                app.mem_scroll = app.mem_scroll.saturating_sub(1);
                            }
                            KeyCode::Down => {
                                app.mem_scroll = app.mem_scroll.saturating_add(1);
                            }
                            KeyCode::PageDown => {
                                app.mem_scroll = app.mem_scroll.saturating_add(16);
                            }
                            KeyCode::PageUp => {
                                app.mem_scroll = app.mem_scroll.saturating_sub(16);
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick_many(256);
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_collects_output() {
        let mut app = DebuggerApp::new(vec![104, 72, 104, 105, 99], Vec::new());
        app.step();
        app.step();
        assert_eq!(app.outputs, vec![72, 105]);
        assert_eq!(app.output_text().as_deref(), Some("Hi"));
        app.step();
        assert!(app.engine.is_halted());
    }

    #[test]
    fn test_input_prompt() {
        let mut app = DebuggerApp::new(vec![3, 0, 4, 0, 99], Vec::new());
        app.step();
        assert!(app.status.contains("waiting for input"));

        app.begin_input();
        for c in "-12x".chars() {
            app.input_char(c);
        }
        app.submit_input();
        app.run();
        app.tick_many(10);
        assert_eq!(app.outputs, vec![-12]);
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = DebuggerApp::new(vec![1101, 1, 1, 0, 1101, 2, 2, 0, 99], Vec::new());
        app.breakpoints.insert(4);
        app.run();
        app.tick_many(10);
        assert!(!app.running);
        assert_eq!(app.engine.pc(), 4);
        assert_eq!(app.engine.memory().read(0), 2);
    }

    #[test]
    fn test_reset_restores_initial_input() {
        let mut app = DebuggerApp::new(vec![3, 0, 4, 0, 99], vec![5]);
        app.run();
        app.tick_many(10);
        assert_eq!(app.outputs, vec![5]);

        app.reset();
        assert!(app.outputs.is_empty());
        assert_eq!(app.engine.input().peek_all(), vec![5]);
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let app = DebuggerApp::new(vec![1101, 1, 1, 0, 99], Vec::new());
        let lines = app.get_disassembly(4);
        assert_eq!(lines[0], (0, "ADD 1, 1, [0]".to_string(), true));
        assert_eq!(lines[1], (4, "HLT".to_string(), false));
    }
}
