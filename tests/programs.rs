//! End-to-end runs of complete programs through the public API.

use intcode::program::{disassemble, format_program, parse_program};
use intcode::{Engine, EngineError, EngineState, Step};

const QUINE: [i64; 16] = [109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];

/// Outputs 999 below 8, 1000 at 8, 1001 above 8.
const COMPARE_TO_EIGHT: &str = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
    1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,\
    999,1105,1,46,1101,1000,1,20,4,20,1105,1,46,98,99";

fn run(program: &[i64], input: &[i64]) -> Vec<i64> {
    let mut engine = Engine::new(program);
    engine.input().extend(input.iter().copied());
    engine.run_to_halt().unwrap();
    engine.drain_output()
}

#[test]
fn quine_reproduces_itself() {
    assert_eq!(run(&QUINE, &[]), QUINE.to_vec());
}

#[test]
fn sixteen_digit_product() {
    let out = run(&[1102, 34915192, 34915192, 7, 4, 7, 99, 0], &[]);
    assert_eq!(out, vec![1219070632396864]);
    assert_eq!(out[0].to_string().len(), 16);
}

#[test]
fn compare_to_eight_from_text() {
    let program = parse_program(COMPARE_TO_EIGHT).unwrap();
    assert_eq!(run(&program, &[7]), vec![999]);
    assert_eq!(run(&program, &[8]), vec![1000]);
    assert_eq!(run(&program, &[9]), vec![1001]);
}

#[test]
fn program_text_round_trip_runs_the_same() {
    let text = format_program(&QUINE);
    let program = parse_program(&text).unwrap();
    assert_eq!(run(&program, &[]), QUINE.to_vec());
}

#[test]
fn suspended_engine_resumes_where_it_stopped() {
    // Echo two values, suspending before each.
    let mut engine = Engine::new(&[3, 20, 4, 20, 3, 20, 4, 20, 99]);

    assert_eq!(engine.run_until_suspend(), Step::NeedsInput);
    assert_eq!(engine.pc(), 0);
    assert_eq!(engine.state(), &EngineState::AwaitingInput);

    engine.push_input(11);
    assert_eq!(engine.run_until_suspend(), Step::Produced(11));
    assert_eq!(engine.run_until_suspend(), Step::NeedsInput);
    assert_eq!(engine.pc(), 4);

    engine.push_input(-3);
    assert_eq!(engine.run_until_suspend(), Step::Produced(-3));
    assert_eq!(engine.run_until_suspend(), Step::Halted);
    assert_eq!(engine.drain_output(), vec![11, -3]);
}

#[test]
fn run_to_halt_reports_starvation() {
    let mut engine = Engine::new(&[3, 0, 99]);
    assert_eq!(engine.run_to_halt(), Err(EngineError::InputStarved { pc: 0 }));
}

#[test]
fn self_modifying_program() {
    // Rewrites its own word 6 from 0 into 99 before reaching it.
    let mut engine = Engine::new(&[1101, 99, 0, 6, 104, 5, 0]);
    engine.run_to_halt().unwrap();
    assert_eq!(engine.drain_output(), vec![5]);
    assert_eq!(engine.memory().read(6), 99);
}

#[test]
fn snapshot_serializes_to_json() {
    let mut engine = Engine::new(&[109, 7, 204, 0, 99]);
    engine.run_to_halt().unwrap();

    let json = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(json["state"], "Halted");
    assert_eq!(json["registers"]["relative_base"], 7);
    assert_eq!(json["cycles"], 3);
    assert_eq!(json["pending_output"], serde_json::json!([0]));
}

#[test]
fn disassembly_of_quine() {
    let text = disassemble(&QUINE);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "; Intcode Disassembly");
    assert!(lines.contains(&"00000: ARB 1"));
    assert!(lines.contains(&"00002: OUT [rb-1]"));
    assert!(lines.contains(&"00004: ADD [100], 1, [100]"));
    assert!(text.contains("HLT"));
}
