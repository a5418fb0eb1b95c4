//! Intcode VM - CLI Entry Point
//!
//! Commands:
//! - `intcode run <program>` - Run a program to halt
//! - `intcode debug <program>` - Interactive debugger
//! - `intcode disasm <program>` - Disassemble a program
//! - `intcode amplify <program>` - Search phase settings of a feedback ring
//! - `intcode network <program>` - Run a switched network
//! - `intcode ascii <program> <script>` - Run an ASCII session

use clap::{Parser, Subcommand};
use intcode::net::{max_signal, max_signal_threaded, MaxSignal, Transcript};
use intcode::program::{load_program, parse_values};
use intcode::{Engine, NetworkConfig, Step, SwitchedNetwork};
use log::{LevelFilter, Log, Metadata, Record};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "intcode")]
#[command(version = "0.1.0")]
#[command(about = "An Intcode virtual machine with feedback rings and switched networks")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program file
        program: String,
        /// Comma-separated input values
        #[arg(short, long, default_value = "")]
        input: String,
        /// Maximum number of instructions to execute
        #[arg(short, long, default_value = "100000000")]
        max_cycles: u64,
        /// Log every instruction
        #[arg(short, long)]
        trace: bool,
        /// Decode output as ASCII text
        #[arg(long)]
        ascii: bool,
        /// Print a JSON report instead of plain output
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the program file
        program: String,
        /// Comma-separated input values queued at start
        #[arg(short, long, default_value = "")]
        input: String,
    },
    /// Disassemble a program to readable text
    Disasm {
        /// Path to the program file
        program: String,
    },
    /// Find the phase setting that maximizes a feedback ring's output
    Amplify {
        /// Path to the program file
        program: String,
        /// Comma-separated phase values to permute
        #[arg(short, long, default_value = "5,6,7,8,9")]
        phases: String,
        /// Value fed to the first engine
        #[arg(short, long, default_value = "0")]
        seed: i64,
        /// Run each engine on its own thread
        #[arg(long)]
        threaded: bool,
        /// Per-read timeout in milliseconds for threaded runs
        #[arg(long, default_value = "1000")]
        timeout_ms: u64,
    },
    /// Run a switched packet network
    Network {
        /// Path to the program file
        program: String,
        /// Number of engines
        #[arg(short, long)]
        size: Option<usize>,
        /// Stop at the first packet sent to the controller
        #[arg(long)]
        first: bool,
        /// JSON network configuration
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Run an ASCII session, feeding script lines from a file
    Ascii {
        /// Path to the program file
        program: String,
        /// Script file, one command per line
        script: Option<String>,
    },
    /// Run the built-in self-test
    Test,
}

/// Minimal stderr logger. The level lives in `log::max_level`.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(verbose: u8, trace: bool) {
    let level = match (verbose, trace) {
        (_, true) | (2.., _) => LevelFilter::Trace,
        (1, _) => LevelFilter::Debug,
        _ => LevelFilter::Warn,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let cli = Cli::parse();
    let trace = matches!(cli.command, Some(Commands::Run { trace: true, .. }));
    init_logger(cli.verbose, trace);

    match cli.command {
        Some(Commands::Run { program, input, max_cycles, trace: _, ascii, json }) => {
            run_program(&program, &input, max_cycles, ascii, json);
        }
        Some(Commands::Debug { program, input }) => {
            debug_program(&program, &input);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Amplify { program, phases, seed, threaded, timeout_ms }) => {
            amplify(&program, &phases, seed, threaded, Duration::from_millis(timeout_ms));
        }
        Some(Commands::Network { program, size, first, config }) => {
            run_network(&program, size, first, config.as_deref());
        }
        Some(Commands::Ascii { program, script }) => {
            run_ascii(&program, script.as_deref());
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Intcode VM v0.1.0");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

fn read_program(path: &str) -> Vec<i64> {
    match load_program(path) {
        Ok(program) => {
            log::debug!("loaded {} words from {}", program.len(), path);
            program
        }
        Err(e) => fail(format!("Failed to load {}: {}", path, e)),
    }
}

fn read_values(text: &str, what: &str) -> Vec<i64> {
    parse_values(text).unwrap_or_else(|e| fail(format!("Bad {}: {}", what, e)))
}

fn run_program(path: &str, input: &str, max_cycles: u64, ascii: bool, json: bool) {
    let program = read_program(path);
    let mut engine = Engine::new(&program);
    engine.input().extend(read_values(input, "input"));

    let mut outputs = Vec::new();
    let mut limited = false;
    loop {
        if engine.cycles() >= max_cycles {
            limited = true;
            break;
        }
        match engine.step() {
            Step::Continued => {}
            Step::Produced(_) => outputs.extend(engine.drain_output()),
            Step::NeedsInput => {
                eprintln!("⚠️  Program is waiting for input at PC={}", engine.pc());
                break;
            }
            Step::Halted => break,
            Step::Failed(e) => {
                eprintln!("❌ Engine error: {}", e);
                break;
            }
        }
    }

    if json {
        let report = serde_json::json!({
            "outputs": outputs,
            "limited": limited,
            "snapshot": engine.snapshot(),
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
    } else if ascii {
        let transcript = Transcript::decode(outputs.iter().copied());
        print!("{}", transcript.text());
        if transcript.partial.is_some() {
            println!();
        }
        for signal in &transcript.signals {
            println!("signal: {}", signal);
        }
    } else {
        for value in &outputs {
            println!("{}", value);
        }
    }

    if limited {
        eprintln!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
    if !engine.is_halted() {
        std::process::exit(1);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, input: &str) {
    let program = read_program(path);
    let initial_input = read_values(input, "input");

    if let Err(e) = intcode::tui::run_debugger(program, initial_input) {
        fail(format!("Debugger error: {}", e));
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _input: &str) {
    fail("This build was compiled without the `tui` feature");
}

fn disassemble_file(path: &str) {
    let program = read_program(path);
    println!("{}", intcode::disassemble(&program));
}

fn amplify(path: &str, phases: &str, seed: i64, threaded: bool, timeout: Duration) {
    let program = read_program(path);
    let phases = read_values(phases, "phases");

    let result = if threaded {
        max_signal_threaded(&program, &phases, seed, timeout)
    } else {
        max_signal(&program, &phases, seed)
    };

    match result {
        Ok(best) => {
            println!("Phases: {:?}", best.phases);
            println!("Signal: {}", best.signal);
        }
        Err(e) => fail(format!("Ring error: {}", e)),
    }
}

fn run_network(path: &str, size: Option<usize>, first: bool, config: Option<&str>) {
    let program = read_program(path);
    let mut config = match config {
        Some(file) => NetworkConfig::load(file).unwrap_or_else(|e| fail(e)),
        None => NetworkConfig::default(),
    };
    if let Some(size) = size {
        config.size = size;
    }

    let mut network = SwitchedNetwork::new(&program, config).unwrap_or_else(|e| fail(e));
    if first {
        match network.first_controller_packet() {
            Ok(packet) => println!("First controller packet: x={} y={}", packet.x, packet.y),
            Err(e) => fail(format!("Network error: {}", e)),
        }
    } else {
        match network.run_until_steady() {
            Ok(steady) => {
                println!("Injected: {:?}", steady.injected);
                println!("Repeated y: {}", steady.y);
            }
            Err(e) => fail(format!("Network error: {}", e)),
        }
    }
}

fn run_ascii(path: &str, script: Option<&str>) {
    let program = read_program(path);
    let lines: Vec<String> = match script {
        Some(file) => match std::fs::read_to_string(file) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(e) => fail(format!("Failed to read {}: {}", file, e)),
        },
        None => Vec::new(),
    };

    let mut session = intcode::net::AsciiSession::new(Engine::new(&program));
    session.send_script(&lines);
    match session.run() {
        Ok(transcript) => {
            print!("{}", transcript.text());
            if transcript.partial.is_some() {
                println!();
            }
            if let Some(signal) = transcript.last_signal() {
                println!("Signal: {}", signal);
            }
        }
        Err(e) => fail(format!("Engine error: {}", e)),
    }
}

fn check(name: &str, ok: bool, passed: &mut u32, failed: &mut u32) {
    print!("{}... ", name);
    if ok {
        println!("✓");
        *passed += 1;
    } else {
        println!("✗");
        *failed += 1;
    }
}

fn run_self_test() {
    println!("━━━ Intcode VM Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut engine = Engine::new(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
    let ok = engine.run_to_halt().is_ok() && engine.memory().read(0) == 3500;
    check("Positional add/multiply", ok, &mut passed, &mut failed);

    let compare = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
    let ok = [(8, 1), (7, 0)].iter().all(|&(input, expected)| {
        let mut engine = Engine::new(&compare);
        engine.push_input(input);
        engine.run_to_halt().is_ok() && engine.drain_output() == vec![expected]
    });
    check("Equality comparison", ok, &mut passed, &mut failed);

    let quine = [109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];
    let mut engine = Engine::new(&quine);
    let ok = engine.run_to_halt().is_ok() && engine.drain_output() == quine;
    check("Relative-mode quine", ok, &mut passed, &mut failed);

    let mut engine = Engine::new(&[104, 1125899906842624, 99]);
    let ok = engine.run_to_halt().is_ok() && engine.drain_output() == vec![1125899906842624];
    check("Large values", ok, &mut passed, &mut failed);

    let mut engine = Engine::new(&[3, 0, 99]);
    let ok = engine.step() == Step::NeedsInput && engine.pc() == 0;
    check("Suspend on empty input", ok, &mut passed, &mut failed);

    let serial = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];
    let ok = matches!(
        max_signal(&serial, &[0, 1, 2, 3, 4], 0),
        Ok(MaxSignal { signal: 43210, .. })
    );
    check("Serial ring search", ok, &mut passed, &mut failed);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_installs_and_filters() {
        init_logger(1, false);
        assert_eq!(log::max_level(), LevelFilter::Debug);

        let debug = Metadata::builder().level(log::Level::Debug).build();
        let trace = Metadata::builder().level(log::Level::Trace).build();
        assert!(LOGGER.enabled(&debug));
        assert!(!LOGGER.enabled(&trace));

        // A second install keeps the first logger and its level.
        init_logger(0, true);
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
