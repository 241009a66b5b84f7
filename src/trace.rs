//! Disassembly and a bounded execution log, for debugging only.
use crate::alu::{Instruction, DEST_A, DEST_D, DEST_M};
use crate::memory::Word;
use std::collections::VecDeque;
use std::fmt;

/// Render an instruction in assembler syntax: `@n` or `dest=comp;jump`.
pub fn disassemble(instruction: Instruction) -> String {
    if !instruction.is_compute() {
        return format!("@{}", instruction.literal());
    }
    let mut out = String::new();
    let dest = instruction.dest();
    if dest != 0 {
        for (bit, name) in [(DEST_A, 'A'), (DEST_M, 'M'), (DEST_D, 'D')] {
            if dest & bit != 0 {
                out.push(name);
            }
        }
        out.push('=');
    }
    out.push_str(&comp_mnemonic(instruction.uses_memory(), instruction.comp()));
    let jump = JUMP_MNEMONICS[usize::from(instruction.jump())];
    if !jump.is_empty() {
        out.push(';');
        out.push_str(jump);
    }
    out
}

const JUMP_MNEMONICS: [&str; 8] = ["", "JGT", "JEQ", "JGE", "JLT", "JNE", "JLE", "JMP"];

/// the 18 functions an assembler emits; `Y` stands for A or M
const COMP_MNEMONICS: [(u8, &str); 18] = [
    (0b101010, "0"),
    (0b111111, "1"),
    (0b111010, "-1"),
    (0b001100, "D"),
    (0b110000, "Y"),
    (0b001101, "!D"),
    (0b110001, "!Y"),
    (0b001111, "-D"),
    (0b110011, "-Y"),
    (0b011111, "D+1"),
    (0b110111, "Y+1"),
    (0b001110, "D-1"),
    (0b110010, "Y-1"),
    (0b000010, "D+Y"),
    (0b010011, "D-Y"),
    (0b000111, "Y-D"),
    (0b000000, "D&Y"),
    (0b010101, "D|Y"),
];

fn comp_mnemonic(uses_memory: bool, comp: u8) -> String {
    let y = if uses_memory { "M" } else { "A" };
    COMP_MNEMONICS
        .iter()
        .find(|(bits, _)| *bits == comp)
        .map(|(_, name)| name.replace('Y', y))
        .unwrap_or_else(|| format!("alu(a={},c={comp:06b})", u8::from(uses_memory)))
}

/// machine state just before one instruction ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub pc: u16,
    pub instruction: Instruction,
    pub a: Word,
    pub d: Word,
    pub m: Word,
}

impl TraceEntry {
    pub fn mnemonic(&self) -> String {
        disassemble(self.instruction)
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5}: {:016b}  {:<16} A={} D={} M={}",
            self.pc,
            self.instruction.bits(),
            self.mnemonic(),
            self.a,
            self.d,
            self.m
        )
    }
}

/// Ring buffer of the most recent instructions. A capacity of zero turns
/// recording off.
#[derive(Debug, Clone)]
pub struct Trace {
    entries: VecDeque<TraceEntry>,
    capacity: usize,
}

impl Trace {
    pub fn new(capacity: usize) -> Self {
        Trace {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// append, dropping the oldest entry once full
    pub fn record(&mut self, entry: TraceEntry) {
        if !self.is_enabled() {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dis(bits: u16) -> String {
        disassemble(Instruction::from(bits))
    }

    #[test]
    fn test_a_instruction() {
        assert_eq!(dis(0), "@0");
        assert_eq!(dis(0b0111_1111_1111_1111), "@32767");
    }

    #[test]
    fn test_c_instructions() {
        assert_eq!(dis(0b1110_1100_0001_0000), "D=A");
        assert_eq!(dis(0b1111_1100_0001_0000), "D=M");
        assert_eq!(dis(0b1110_1010_1000_0111), "0;JMP");
        assert_eq!(dis(0b1111_1101_1110_1000), "AM=M+1");
        assert_eq!(dis(0b1110_0011_0000_0010), "D;JEQ");
        assert_eq!(dis(0b1111_0100_1101_1101), "MD=D-M;JNE");
        assert_eq!(dis(0b1110_1110_1011_1000), "AMD=-1");
        assert_eq!(dis(0b1110_0000_0000_0000), "D&A");
    }

    #[test]
    fn test_non_canonical_comp() {
        assert_eq!(dis(0b1111_1011_1101_0001), "D=alu(a=1,c=101111);JGT");
    }

    #[test]
    fn test_trace_is_bounded() {
        let mut trace = Trace::new(3);
        for pc in 0..10 {
            trace.record(TraceEntry {
                pc,
                instruction: Instruction::from(pc),
                a: 0,
                d: 0,
                m: 0,
            });
        }
        assert_eq!(trace.len(), 3);
        let pcs: Vec<u16> = trace.entries().map(|e| e.pc).collect();
        assert_eq!(pcs, vec![7, 8, 9]);
    }

    #[test]
    fn test_disabled_trace() {
        let mut trace = Trace::new(0);
        trace.record(TraceEntry {
            pc: 1,
            instruction: Instruction::from(1u16),
            a: 0,
            d: 0,
            m: 0,
        });
        assert!(trace.is_empty());
    }

    #[test]
    fn test_entry_display() {
        let entry = TraceEntry {
            pc: 12,
            instruction: Instruction::from(0b1110_1100_0001_0000u16),
            a: 3,
            d: -1,
            m: 9,
        };
        assert_eq!(
            entry.to_string(),
            "   12: 1110110000010000  D=A              A=3 D=-1 M=9"
        );
    }
}
