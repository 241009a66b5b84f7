use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

// NB. addresses are u16 and always pass through `address()` first; lengths are
// usize to stop endless casting

/// every register, RAM cell and ROM cell holds one of these
pub type Word = i16;

/// how many instructions the instruction store holds
pub const ROM_SIZE: usize = 32768;

/// general RAM + screen + keyboard cell
pub const RAM_SIZE: usize = 24577;

/// first word of the screen bitmap
pub const SCREEN_ADDR: u16 = 16384;

/// 512x256 pixels, 16 pixels per word
pub const SCREEN_WORDS: usize = 8192;

/// the single keyboard cell, straight after the screen
pub const KEYBOARD_ADDR: u16 = 24576;

/// A is 16 bits wide but only ever addresses 15 bits worth of memory
pub const ADDRESS_MASK: u16 = 0x7fff;

/// Reinterpret a register value as a memory/instruction address. The top bit
/// is dropped, so every result is a valid ROM index and either a RAM index or
/// part of the unmapped hole above the keyboard.
pub fn address(value: Word) -> u16 {
    value as u16 & ADDRESS_MASK
}

/// Represents the Hack memory map:
///   0x0000-0x3fff  general purpose RAM
///   0x4000-0x5fff  screen (512x256, 1bpp, 32 words per row)
///   0x6000         keyboard
///   0x6001-0x7fff  unmapped; reads give 0, writes are dropped
pub trait MemoryMap {
    /// read a single word
    fn read(&self, addr: u16) -> Word;

    /// read the word the A register currently points at
    fn read_at(&self, a: Word) -> Word {
        self.read(address(a))
    }

    /// get a r/o slice of the underlying words
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[Word];
}

/// Read-only store holding the loaded program. Anything past the end of the
/// program is zero, which executes as `@0`.
#[derive(Clone)]
pub struct Rom {
    words: Box<[Word]>,
    program_len: usize,
}

impl Rom {
    /// an empty store; every instruction is `@0`
    pub fn new() -> Self {
        Rom {
            words: vec![0; ROM_SIZE].into_boxed_slice(),
            program_len: 0,
        }
    }

    /// build a store from a program; anything past `ROM_SIZE` is dropped
    pub fn from_words(program: &[Word]) -> Self {
        let mut rom = Rom::new();
        let len = program.len().min(ROM_SIZE);
        rom.words[..len].copy_from_slice(&program[..len]);
        rom.program_len = len;
        rom
    }

    /// how many words were actually loaded
    pub fn program_len(&self) -> usize {
        self.program_len
    }

    /// the loaded part of the store
    pub fn program(&self) -> &[Word] {
        &self.words[..self.program_len]
    }
}

impl Default for Rom {
    fn default() -> Self {
        Rom::new()
    }
}

impl Debug for Rom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rom {{ program_len: {} }}", self.program_len)
    }
}

impl MemoryMap for Rom {
    fn read(&self, addr: u16) -> Word {
        self.words[usize::from(addr & ADDRESS_MASK)]
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> &[Word] {
        let a = usize::from(addr);
        &self.words[a..(a + len)]
    }
}

/// The keyboard cell. It is written by whoever owns the input device and read
/// by the running program, so it lives outside the RAM lock as an atomic.
#[derive(Debug, Default)]
pub struct KeyboardRegister(AtomicI16);

impl KeyboardRegister {
    pub fn new() -> Self {
        KeyboardRegister(AtomicI16::new(0))
    }

    /// latch a key code; the last press wins
    pub fn press(&self, code: Word) {
        self.0.store(code, Ordering::Release);
    }

    /// no key held
    pub fn release(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn get(&self) -> Word {
        self.0.load(Ordering::Acquire)
    }
}

/// bounded, de-duplicated set of screen words written since the last drain
struct DirtyWords {
    bits: [u64; SCREEN_WORDS / 64],
    list: Vec<u16>,
}

impl DirtyWords {
    fn new() -> Self {
        DirtyWords {
            bits: [0; SCREEN_WORDS / 64],
            list: Vec::new(),
        }
    }

    fn mark(&mut self, offset: u16) {
        let (slot, bit) = (usize::from(offset) / 64, offset % 64);
        if self.bits[slot] & (1 << bit) == 0 {
            self.bits[slot] |= 1 << bit;
            self.list.push(offset);
        }
    }

    fn drain(&mut self) -> Vec<u16> {
        self.bits = [0; SCREEN_WORDS / 64];
        std::mem::take(&mut self.list)
    }
}

/// The memory bank: general RAM, the screen bitmap and the keyboard cell.
pub struct Ram {
    words: Box<[Word]>,
    keyboard: Arc<KeyboardRegister>,
    dirty: DirtyWords,
}

impl Ram {
    /// zeroed RAM wired up to a keyboard cell
    pub fn new(keyboard: Arc<KeyboardRegister>) -> Self {
        Ram {
            words: vec![0; usize::from(KEYBOARD_ADDR)].into_boxed_slice(),
            keyboard,
            dirty: DirtyWords::new(),
        }
    }

    /// Write a single word; screen writes are remembered for the renderer.
    /// The keyboard register is read only from this side.
    pub fn write(&mut self, addr: u16, value: Word) {
        let addr = addr & ADDRESS_MASK;
        match addr {
            KEYBOARD_ADDR => {
                log::trace!("dropped write of {value} to the keyboard register");
            }
            a if usize::from(a) >= RAM_SIZE => {
                log::trace!("dropped write of {value} to unmapped address {a:#06x}");
            }
            a => {
                self.words[usize::from(a)] = value;
                if a >= SCREEN_ADDR {
                    self.dirty.mark(a - SCREEN_ADDR);
                }
            }
        }
    }

    /// write to wherever the A register points
    pub fn write_at(&mut self, a: Word, value: Word) {
        self.write(address(a), value)
    }

    /// the 8192 screen words, row-major
    pub fn screen(&self) -> &[Word] {
        self.get_ro_slice(SCREEN_ADDR, SCREEN_WORDS)
    }

    /// blank the screen; every word is reported dirty
    pub fn clear_screen(&mut self) {
        let start = usize::from(SCREEN_ADDR);
        self.words[start..start + SCREEN_WORDS].fill(0);
        for offset in 0..SCREEN_WORDS as u16 {
            self.dirty.mark(offset);
        }
    }

    /// hand over the screen words written since the last call, as offsets
    /// from `SCREEN_ADDR`
    pub fn take_dirty_screen_words(&mut self) -> Vec<u16> {
        self.dirty.drain()
    }

    pub fn keyboard(&self) -> &Arc<KeyboardRegister> {
        &self.keyboard
    }
}

impl MemoryMap for Ram {
    fn read(&self, addr: u16) -> Word {
        match addr & ADDRESS_MASK {
            KEYBOARD_ADDR => self.keyboard.get(),
            a if usize::from(a) >= RAM_SIZE => 0,
            a => self.words[usize::from(a)],
        }
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> &[Word] {
        let a = usize::from(addr);
        &self.words[a..(a + len)]
    }
}

impl Debug for Ram {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ram {{ keyboard: {}, dirty_screen_words: {} }}",
            self.keyboard.get(),
            self.dirty.list.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram() -> Ram {
        Ram::new(Arc::new(KeyboardRegister::new()))
    }

    #[test]
    fn test_memory_zeroed() {
        let m = ram();
        assert_eq!(m.get_ro_slice(0, usize::from(KEYBOARD_ADDR)), &[0; 24576][..]);
        assert_eq!(m.read(KEYBOARD_ADDR), 0);
    }

    #[test]
    fn test_write_read_word() {
        let mut m = ram();
        m.write(100, -7);
        assert_eq!(m.read(100), -7);
        assert_eq!(m.read_at(100), -7);
    }

    #[test]
    fn test_address_masks_top_bit() {
        assert_eq!(address(-1), 0x7fff);
        assert_eq!(address(i16::MIN | 5), 5);
        let mut m = ram();
        m.write_at(i16::MIN | 5, 42);
        assert_eq!(m.read(5), 42);
    }

    #[test]
    fn test_unmapped_hole() {
        let mut m = ram();
        m.write(0x6001, 99);
        m.write(0x7fff, 99);
        assert_eq!(m.read(0x6001), 0);
        assert_eq!(m.read(0x7fff), 0);
        // nothing aliased back into RAM
        assert_eq!(m.read(0), 0);
        assert_eq!(m.read(1), 0);
    }

    #[test]
    fn test_keyboard_cell_shared() {
        let kbd = Arc::new(KeyboardRegister::new());
        let mut m = Ram::new(Arc::clone(&kbd));
        kbd.press(65);
        assert_eq!(m.read(KEYBOARD_ADDR), 65);
        m.write(KEYBOARD_ADDR, 3);
        assert_eq!(kbd.get(), 65);
        assert_eq!(m.read(KEYBOARD_ADDR), 65);
        kbd.release();
        assert_eq!(m.read(KEYBOARD_ADDR), 0);
    }

    #[test]
    fn test_screen_writes_tracked_once() {
        let mut m = ram();
        m.write(SCREEN_ADDR, 1);
        m.write(SCREEN_ADDR, 2);
        m.write(SCREEN_ADDR + 31, 3);
        m.write(10, 3);
        assert_eq!(m.take_dirty_screen_words(), vec![0, 31]);
        assert!(m.take_dirty_screen_words().is_empty());
        assert_eq!(m.screen()[0], 2);
        assert_eq!(m.screen()[31], 3);
    }

    #[test]
    fn test_clear_screen() {
        let mut m = ram();
        m.write(SCREEN_ADDR + 5, -1);
        m.write(5, -1);
        let _ = m.take_dirty_screen_words();
        m.clear_screen();
        assert_eq!(m.screen(), &[0; SCREEN_WORDS][..]);
        assert_eq!(m.read(5), -1);
        assert_eq!(m.take_dirty_screen_words().len(), SCREEN_WORDS);
    }

    #[test]
    fn test_rom_from_words() {
        let rom = Rom::from_words(&[1, 2, 3]);
        assert_eq!(rom.program_len(), 3);
        assert_eq!(rom.program(), &[1, 2, 3]);
        assert_eq!(rom.read(2), 3);
        assert_eq!(rom.read(3), 0);
        assert_eq!(rom.get_ro_slice(0, 4), &[1, 2, 3, 0]);
    }

    #[test]
    fn test_rom_truncates_oversized_program() {
        let program = vec![1; ROM_SIZE + 10];
        let rom = Rom::from_words(&program);
        assert_eq!(rom.program_len(), ROM_SIZE);
        assert_eq!(rom.read(0x7fff), 1);
    }
}
