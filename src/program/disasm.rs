//! Disassembler for Intcode programs.
//!
//! Intcode freely mixes code and data, so a linear sweep is only a best
//! effort: words that do not decode are shown as `DATA`, and operands of a
//! decoded instruction are consumed even if they are really data.

use crate::vm::decode::{decode, Instruction, Mode};
use crate::vm::Memory;

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the number of words consumed.
pub fn disassemble_at(mem: &Memory, addr: usize) -> (String, usize) {
    let word = mem.read(addr);
    match decode(word) {
        Ok(instr) => {
            let operands: Vec<String> = (0..instr.opcode.arity())
                .map(|i| format_operand(mem.read(addr + 1 + i), instr.mode(i)))
                .collect();
            (format_instruction(&instr, &operands), instr.width())
        }
        Err(_) => (format!("DATA {}", word), 1),
    }
}

/// Disassemble a whole program with a linear sweep.
pub fn disassemble(program: &[i64]) -> String {
    let mem = Memory::new(program);
    let mut output = String::new();
    output.push_str("; Intcode Disassembly\n");
    output.push_str("; -------------------\n\n");

    for (addr, text) in listing(&mem, 0, program.len()) {
        output.push_str(&format!("{:05}: {}\n", addr, text));
    }

    output
}

/// Sweep `[start, end)` and return one line per instruction or data word.
pub fn listing(mem: &Memory, start: usize, end: usize) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut addr = start;
    while addr < end {
        let (text, width) = disassemble_at(mem, addr);
        // An instruction that straddles the end is data as far as we know.
        if addr + width > end {
            lines.push((addr, format!("DATA {}", mem.read(addr))));
            addr += 1;
            continue;
        }
        lines.push((addr, text));
        addr += width;
    }
    lines
}

fn format_instruction(instr: &Instruction, operands: &[String]) -> String {
    if operands.is_empty() {
        instr.opcode.mnemonic().to_string()
    } else {
        format!("{} {}", instr.opcode.mnemonic(), operands.join(", "))
    }
}

/// Format an operand with its addressing mode.
fn format_operand(raw: i64, mode: Mode) -> String {
    match mode {
        Mode::Position => format!("[{}]", raw),
        Mode::Immediate => format!("{}", raw),
        Mode::Relative if raw < 0 => format!("[rb-{}]", raw.unsigned_abs()),
        Mode::Relative => format!("[rb+{}]", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_add() {
        let mem = Memory::new(&[1, 9, 10, 3, 99]);
        assert_eq!(disassemble_at(&mem, 0), ("ADD [9], [10], [3]".to_string(), 4));
        assert_eq!(disassemble_at(&mem, 4), ("HLT".to_string(), 1));
    }

    #[test]
    fn test_disassemble_modes() {
        let mem = Memory::new(&[21101, 3, -4, 7, 204, -1]);
        assert_eq!(disassemble_at(&mem, 0).0, "ADD 3, -4, [rb+7]");
        assert_eq!(disassemble_at(&mem, 4).0, "OUT [rb-1]");
    }

    #[test]
    fn test_listing_marks_data() {
        let program = [104, 5, 99, 42, 1];
        let lines = listing(&Memory::new(&program), 0, program.len());
        assert_eq!(
            lines,
            vec![
                (0, "OUT 5".to_string()),
                (2, "HLT".to_string()),
                (3, "DATA 42".to_string()),
                (4, "DATA 1".to_string()),
            ]
        );
    }

    #[test]
    fn test_disassemble_header() {
        let text = disassemble(&[99]);
        assert!(text.starts_with("; Intcode Disassembly"));
        assert!(text.contains("00000: HLT"));
    }
}
