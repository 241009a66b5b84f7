/// # interpreter
///
/// The Hack CPU has three registers:
///  * PC, the 15 bit program counter into the instruction store
///  * A, the address register; doubles as a data register and as the pointer
///    for M (the RAM word it addresses) and for jumps
///  * D, the data register
///
/// Each `step` fetches one instruction, evaluates it with `alu::decode`
/// against the registers as they were before the instruction, then commits
/// the result in one go.
use crate::alu::{self, Instruction};
use crate::memory::{KeyboardRegister, MemoryMap, Ram, Rom, Word, ADDRESS_MASK};
use crate::trace::{Trace, TraceEntry};
use std::sync::Arc;

/// the register file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub a: Word,
    pub d: Word,
}

/// All emulated state: program, registers, memory and the optional trace.
#[derive(Debug)]
pub struct Machine {
    rom: Rom,
    ram: Ram,
    registers: Registers,
    trace: Trace,
}

impl Machine {
    /// zeroed machine with an empty program
    pub fn new(keyboard: Arc<KeyboardRegister>, trace_capacity: usize) -> Self {
        Machine {
            rom: Rom::new(),
            ram: Ram::new(keyboard),
            registers: Registers::default(),
            trace: Trace::new(trace_capacity),
        }
    }

    /// swap in a new program and start it from the top; RAM is left alone
    pub fn load_rom(&mut self, rom: Rom) {
        self.rom = rom;
        self.registers = Registers::default();
    }

    /// execute exactly one instruction
    pub fn step(&mut self) -> Instruction {
        let Registers { pc, a, d } = self.registers;
        let instruction = Instruction::from(self.rom.read(pc));
        let m = self.ram.read_at(a);
        self.trace.record(TraceEntry {
            pc,
            instruction,
            a,
            d,
            m,
        });

        let op = alu::decode(instruction, a, d, m);
        if let Some((addr, value)) = op.write {
            self.ram.write(addr, value);
        }
        self.registers = Registers {
            pc: op.jump.unwrap_or_else(|| pc.wrapping_add(1) & ADDRESS_MASK),
            a: op.a,
            d: op.d,
        };
        log::trace!("{pc:#06x}: {instruction:?} -> {:?}", self.registers);
        instruction
    }

    /// Zero the registers and, if asked, blank the screen. The program and
    /// general RAM survive.
    pub fn reset(&mut self, clear_screen: bool) {
        self.registers = Registers::default();
        if clear_screen {
            self.ram.clear_screen();
        }
    }

    pub fn registers(&self) -> Registers {
        self.registers
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// M, the RAM word A currently points at
    pub fn m(&self) -> Word {
        self.ram.read_at(self.registers.a)
    }

    /// read any RAM word
    pub fn peek(&self, addr: u16) -> Word {
        self.ram.read(addr)
    }

    /// the instruction PC currently points at
    pub fn current_instruction(&self) -> Instruction {
        Instruction::from(self.rom.read(self.registers.pc))
    }
}
