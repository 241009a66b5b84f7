//! Instruction decoding and the ALU.
//!
//! A-instruction:
//! ```text
//!  15__14_____________________0_
//! | 0 |          value          |
//!  -----------------------------
//! ```
//! C-instruction:
//! ```text
//!  15__14_13__12__11______6__5___3__2___0_
//! | 1 | x x | a |   comp   | dest | jump |
//!  ---------------------------------------
//! ```
use crate::memory::{address, Word};
use std::fmt::{Debug, Formatter};

/// comp control bits, MSB first
pub const ZX: u8 = 0b10_0000;
pub const NX: u8 = 0b01_0000;
pub const ZY: u8 = 0b00_1000;
pub const NY: u8 = 0b00_0100;
pub const F: u8 = 0b00_0010;
pub const NO: u8 = 0b00_0001;

/// dest bits
pub const DEST_A: u8 = 0b100;
pub const DEST_D: u8 = 0b010;
pub const DEST_M: u8 = 0b001;

/// jump bits
pub const JLT: u8 = 0b100;
pub const JEQ: u8 = 0b010;
pub const JGT: u8 = 0b001;

/// Wrapper for a raw 16 bit Hack instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Instruction(Word);

impl Instruction {
    /// Gives the value of only the specified bit range.
    ///
    /// `to` is inclusive and must not be less than `from`.
    pub fn get_bit_range(self, from: u8, to: u8) -> u16 {
        debug_assert!(to >= from, "wrong direction of from: {from} and to: {to}");
        debug_assert!(to < 16, "index {to} is past the top of a 16 bit word");
        let width = to - from + 1;
        let mask = if width == 16 { u16::MAX } else { (1 << width) - 1 };
        (self.bits() >> from) & mask
    }

    pub fn get_bit(self, index: u8) -> bool {
        self.get_bit_range(index, index) == 1
    }

    pub fn bits(self) -> u16 {
        self.0 as u16
    }

    pub fn word(self) -> Word {
        self.0
    }

    /// top bit set: ALU computation rather than an address literal
    pub fn is_compute(self) -> bool {
        self.get_bit(15)
    }

    /// the 15 bit literal of an A-instruction
    pub fn literal(self) -> Word {
        self.get_bit_range(0, 14) as Word
    }

    /// `a` bit: the y operand is M rather than A
    pub fn uses_memory(self) -> bool {
        self.get_bit(12)
    }

    pub fn comp(self) -> u8 {
        self.get_bit_range(6, 11) as u8
    }

    pub fn dest(self) -> u8 {
        self.get_bit_range(3, 5) as u8
    }

    pub fn jump(self) -> u8 {
        self.get_bit_range(0, 2) as u8
    }
}

impl From<Word> for Instruction {
    fn from(word: Word) -> Self {
        Instruction(word)
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Instruction(bits as Word)
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_compute() {
            write!(
                f,
                "C a: {}, comp: {:06b}, dest: {:03b}, jump: {:03b}",
                u8::from(self.uses_memory()),
                self.comp(),
                self.dest(),
                self.jump()
            )
        } else {
            write!(f, "A {}", self.literal())
        }
    }
}

/// Run the ALU. Every one of the 64 `comp` patterns is defined by the control
/// bits, not only the 18 an assembler emits.
pub fn compute(comp: u8, x: Word, y: Word) -> Word {
    let mut x = if comp & ZX != 0 { 0 } else { x };
    if comp & NX != 0 {
        x = !x;
    }
    let mut y = if comp & ZY != 0 { 0 } else { y };
    if comp & NY != 0 {
        y = !y;
    }
    let out = if comp & F != 0 { x.wrapping_add(y) } else { x & y };
    if comp & NO != 0 {
        !out
    } else {
        out
    }
}

/// does `out` satisfy any of the enabled jump conditions
pub fn should_jump(jump: u8, out: Word) -> bool {
    (jump & JLT != 0 && out < 0) || (jump & JEQ != 0 && out == 0) || (jump & JGT != 0 && out > 0)
}

/// Everything one instruction wants to change, worked out from the state as it
/// was before the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedOp {
    /// A after the instruction
    pub a: Word,
    /// D after the instruction
    pub d: Word,
    /// address (from the old A) and value of the memory write, if any
    pub write: Option<(u16, Word)>,
    /// new PC if the jump is taken
    pub jump: Option<u16>,
}

/// Decode and evaluate `instruction` against the current `a`, `d` and `m`
/// (the memory word A points at).
pub fn decode(instruction: Instruction, a: Word, d: Word, m: Word) -> DecodedOp {
    if !instruction.is_compute() {
        return DecodedOp {
            a: instruction.literal(),
            d,
            write: None,
            jump: None,
        };
    }

    let y = if instruction.uses_memory() { m } else { a };
    let out = compute(instruction.comp(), d, y);
    let dest = instruction.dest();
    DecodedOp {
        a: if dest & DEST_A != 0 { out } else { a },
        d: if dest & DEST_D != 0 { out } else { d },
        write: (dest & DEST_M != 0).then(|| (address(a), out)),
        jump: should_jump(instruction.jump(), out).then(|| address(a)),
    }
}
