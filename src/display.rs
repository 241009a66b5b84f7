use crate::memory::{Ram, Word, SCREEN_WORDS};
use crossterm::{cursor, execute, terminal};
use std::io;
use tui::backend::CrosstermBackend;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const SCREEN_WIDTH: usize = 512;
pub const SCREEN_HEIGHT: usize = 256;
pub const WORDS_PER_ROW: usize = SCREEN_WIDTH / 16;

/// Pixel view of the screen region, kept in step with RAM one dirty word at a
/// time.
///
/// Bit `b` of a screen word lights pixel `15 - b` of its 16 pixel group, so
/// `0x0001` at the start of a row lights x = 15.
#[derive(Clone)]
pub struct Framebuffer {
    pixels: Box<[bool]>,
}

impl Framebuffer {
    /// all pixels off
    pub fn new() -> Self {
        Framebuffer {
            pixels: vec![false; SCREEN_WIDTH * SCREEN_HEIGHT].into_boxed_slice(),
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y * SCREEN_WIDTH + x]
    }

    /// recompute the 16 pixels covered by one screen word
    pub fn update_word(&mut self, offset: u16, word: Word) {
        let offset = usize::from(offset);
        debug_assert!(offset < SCREEN_WORDS, "screen word {offset} out of range");
        let y = offset / WORDS_PER_ROW;
        let x0 = (offset % WORDS_PER_ROW) * 16;
        let row = &mut self.pixels[y * SCREEN_WIDTH + x0..y * SCREEN_WIDTH + x0 + 16];
        for (i, px) in row.iter_mut().enumerate() {
            *px = (word as u16) & (1 << (15 - i)) != 0;
        }
    }

    /// Pick up every screen word written since the last sync. Returns how many
    /// words were redrawn.
    pub fn sync(&mut self, ram: &mut Ram) -> usize {
        let dirty = ram.take_dirty_screen_words();
        let screen = ram.screen();
        for &offset in &dirty {
            self.update_word(offset, screen[usize::from(offset)]);
        }
        dirty.len()
    }

    /// rebuild from scratch, dropping any pending dirty words
    pub fn refresh(&mut self, ram: &mut Ram) {
        let _ = ram.take_dirty_screen_words();
        for (offset, &word) in ram.screen().iter().enumerate() {
            self.update_word(offset as u16, word);
        }
    }

    /// coordinates of every lit pixel, y growing downwards
    pub fn lit_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .filter(|&(_, &lit)| lit)
            .map(|(i, _)| (i % SCREEN_WIDTH, i / SCREEN_WIDTH))
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new()
    }
}

/// Display is used by the front end to draw the screen. It should abstract
/// the implementation details, so a variety of kinds of screen would work.
pub trait Display {
    /// draw the framebuffer, with a one line status
    fn draw(&mut self, frame: &Framebuffer, status: &str) -> Result<(), io::Error>;
}

// store useful metadata about the canvas
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of the lit pixels; the canvas y axis points up
    fn points_from_frame(&self, frame: &Framebuffer) -> Vec<(f64, f64)> {
        frame
            .lit_pixels()
            .map(|(x, y)| (x as f64, -1.0 * y as f64))
            .collect()
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(SCREEN_WIDTH, SCREEN_HEIGHT),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show) {
            log::error!("could not restore terminal: {e}");
        }
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer, status: &str) -> Result<(), io::Error> {
        let coords = self.resolution.points_from_frame(frame);
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();

        // braille packs 2x4 pixels into a cell, so a 256x64 cell terminal
        // shows the whole screen 1:1
        self.terminal.draw(|f| {
            let size = f.size();
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(status)
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Braille)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &coords,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last_status: String,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, _frame: &Framebuffer, status: &str) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_status = status.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{KeyboardRegister, SCREEN_ADDR};
    use std::sync::Arc;

    fn ram() -> Ram {
        Ram::new(Arc::new(KeyboardRegister::new()))
    }

    #[test]
    fn test_bounds() {
        let r = Resolution(SCREEN_WIDTH, SCREEN_HEIGHT);
        assert_eq!(r.x_bounds(), [0.0, 511.0]);
        assert_eq!(r.y_bounds(), [-255.0, 0.0]);
    }

    #[test]
    fn test_bit_zero_is_pixel_fifteen() {
        let mut ram = ram();
        let mut fb = Framebuffer::new();
        ram.write(SCREEN_ADDR, 0x0001);
        assert_eq!(fb.sync(&mut ram), 1);
        for x in 0..16 {
            assert_eq!(fb.pixel(x, 0), x == 15, "x = {x}");
        }
        assert_eq!(fb.lit_pixels().collect::<Vec<_>>(), vec![(15, 0)]);
    }

    #[test]
    fn test_word_position() {
        let mut fb = Framebuffer::new();
        // second row, third word, top bit
        fb.update_word(32 + 2, i16::MIN);
        assert_eq!(fb.lit_pixels().collect::<Vec<_>>(), vec![(32, 1)]);
        fb.update_word(32 + 2, 0);
        assert_eq!(fb.lit_pixels().count(), 0);
    }

    #[test]
    fn test_sync_only_touches_dirty_words() {
        let mut ram = ram();
        let mut fb = Framebuffer::new();
        ram.write(SCREEN_ADDR + 8191, -1);
        ram.write(100, -1);
        assert_eq!(fb.sync(&mut ram), 1);
        assert_eq!(fb.lit_pixels().count(), 16);
        assert!(fb.pixel(511, 255));
        assert_eq!(fb.sync(&mut ram), 0);
    }

    #[test]
    fn test_refresh() {
        let mut ram = ram();
        ram.write(SCREEN_ADDR + 1, 0b11);
        let mut fb = Framebuffer::new();
        fb.refresh(&mut ram);
        assert_eq!(fb.lit_pixels().collect::<Vec<_>>(), vec![(30, 0), (31, 0)]);
        assert_eq!(fb.sync(&mut ram), 0);
    }

    #[test]
    fn test_points_flip_y() {
        let mut fb = Framebuffer::new();
        fb.update_word(32, 1);
        let r = Resolution(SCREEN_WIDTH, SCREEN_HEIGHT);
        assert_eq!(r.points_from_frame(&fb), vec![(15.0, -1.0)]);
    }

    #[test]
    fn test_dummy_display() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        d.draw(&Framebuffer::new(), "paused")?;
        assert_eq!(d.frames, 1);
        assert_eq!(d.last_status, "paused");
        Ok(())
    }

    #[test]
    #[ignore]
    // NB. needs a real terminal
    fn test_draw_blank_screen() -> Result<(), io::Error> {
        let mut d = MonoTermDisplay::new()?;
        d.draw(&Framebuffer::new(), "test")
    }
}
