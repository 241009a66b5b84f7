use crate::memory::Word;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::io;
use std::time::{Duration, Instant};

/// A key as the Hack keyboard sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// printable ASCII
    Char(u8),
    Enter,
    Backspace,
    Left,
    Up,
    Right,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Escape,
    /// F1 to F12
    F(u8),
}

impl Key {
    /// The code a program reads from the keyboard register. ASCII passes
    /// through unchanged, named keys start at 128. `None` for keys the
    /// machine has no code for.
    pub fn code(self) -> Option<Word> {
        let code = match self {
            Key::Char(c) if c < 128 => Word::from(c),
            Key::Char(_) => return None,
            Key::Enter => 128,
            Key::Backspace => 129,
            Key::Left => 130,
            Key::Up => 131,
            Key::Right => 132,
            Key::Down => 133,
            Key::Home => 134,
            Key::End => 135,
            Key::PageUp => 136,
            Key::PageDown => 137,
            Key::Insert => 138,
            Key::Delete => 139,
            Key::Escape => 140,
            Key::F(n @ 1..=12) => 140 + Word::from(n),
            Key::F(_) => return None,
        };
        Some(code)
    }
}

/// map a terminal key to a Hack key
fn key_from_terminal(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Char(c) if c.is_ascii() && !c.is_ascii_control() => Key::Char(c as u8),
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Left => Key::Left,
        KeyCode::Up => Key::Up,
        KeyCode::Right => Key::Right,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::Esc => Key::Escape,
        KeyCode::F(n) => Key::F(n),
        _ => return None,
    })
}

/// Everything the host front end reacts to, whatever it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    KeyDown(Key),
    KeyUp,
    Paint,
    Resize(u16, u16),
    TogglePause,
    Step,
    Reset,
    Quit,
}

/// reads keypresses and other host events
pub trait Input {
    /// everything that happened since the last call, without blocking
    fn poll_events(&mut self) -> Result<Vec<HostEvent>, io::Error>;
}

/// terminals only report presses, so a key counts as released once it stops
/// auto-repeating for this long
const RELEASE_AFTER: Duration = Duration::from_millis(100);

/// Input from the terminal, using crossterm. Ctrl-C quits, Ctrl-P pauses and
/// resumes, Ctrl-S single steps and Ctrl-R resets; every other key goes to
/// the program.
pub struct StdinInput {
    held: Option<(Key, Instant)>,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput { held: None })
    }

    fn translate(&mut self, evt: KeyEvent, now: Instant) -> Option<HostEvent> {
        if evt.modifiers.contains(KeyModifiers::CONTROL) {
            return match evt.code {
                KeyCode::Char('c') => Some(HostEvent::Quit),
                KeyCode::Char('p') => Some(HostEvent::TogglePause),
                KeyCode::Char('s') => Some(HostEvent::Step),
                KeyCode::Char('r') => Some(HostEvent::Reset),
                _ => None,
            };
        }
        match key_from_terminal(evt.code) {
            Some(key) => {
                let repeat = matches!(self.held, Some((held, _)) if held == key);
                self.held = Some((key, now));
                (!repeat).then_some(HostEvent::KeyDown(key))
            }
            None => {
                log::warn!("can't map {:?} to a Hack key", evt.code);
                None
            }
        }
    }

    /// release the held key once it has gone quiet
    fn expire(&mut self, now: Instant) -> Option<HostEvent> {
        match self.held {
            Some((_, since)) if now.duration_since(since) >= RELEASE_AFTER => {
                self.held = None;
                Some(HostEvent::KeyUp)
            }
            _ => None,
        }
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("could not reset terminal: {e}");
        }
    }
}

impl Input for StdinInput {
    fn poll_events(&mut self) -> Result<Vec<HostEvent>, io::Error> {
        let mut events = Vec::new();
        while poll(Duration::from_millis(0))? {
            let now = Instant::now();
            match read()? {
                Event::Key(evt) => events.extend(self.translate(evt, now)),
                Event::Resize(w, h) => events.push(HostEvent::Resize(w, h)),
                _ => {}
            }
        }
        events.extend(self.expire(Instant::now()));
        Ok(events)
    }
}

/// dummy Input implementation for testing
pub struct DummyInput {
    events: Vec<HostEvent>,
}

impl DummyInput {
    pub fn new(events: &[HostEvent]) -> Self {
        DummyInput {
            events: Vec::from(events),
        }
    }
}

impl Input for DummyInput {
    fn poll_events(&mut self) -> Result<Vec<HostEvent>, io::Error> {
        Ok(std::mem::take(&mut self.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(Key::Char(b'A').code(), Some(65));
        assert_eq!(Key::Char(b' ').code(), Some(32));
        assert_eq!(Key::Char(200).code(), None);
    }

    #[test]
    fn test_named_keys() {
        let table = [
            (Key::Enter, 128),
            (Key::Backspace, 129),
            (Key::Left, 130),
            (Key::Up, 131),
            (Key::Right, 132),
            (Key::Down, 133),
            (Key::Home, 134),
            (Key::End, 135),
            (Key::PageUp, 136),
            (Key::PageDown, 137),
            (Key::Insert, 138),
            (Key::Delete, 139),
            (Key::Escape, 140),
            (Key::F(1), 141),
            (Key::F(12), 152),
        ];
        for (key, code) in table {
            assert_eq!(key.code(), Some(code), "{key:?}");
        }
        assert_eq!(Key::F(13).code(), None);
        assert_eq!(Key::F(0).code(), None);
    }

    #[test]
    fn test_terminal_keys() {
        assert_eq!(key_from_terminal(KeyCode::Char('x')), Some(Key::Char(b'x')));
        assert_eq!(key_from_terminal(KeyCode::Esc), Some(Key::Escape));
        assert_eq!(key_from_terminal(KeyCode::F(5)), Some(Key::F(5)));
        assert_eq!(key_from_terminal(KeyCode::Char('é')), None);
        assert_eq!(key_from_terminal(KeyCode::Tab), None);
    }

    #[test]
    fn test_controls_and_repeats() {
        let mut input = StdinInput { held: None };
        let t0 = Instant::now();
        let ctrl_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        assert_eq!(input.translate(ctrl_p, t0), Some(HostEvent::TogglePause));
        assert!(input.held.is_none());

        let a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(input.translate(a, t0), Some(HostEvent::KeyDown(Key::Char(b'a'))));
        // auto-repeat keeps the key held without re-sending it
        assert_eq!(input.translate(a, t0 + Duration::from_millis(50)), None);
        assert_eq!(input.expire(t0 + Duration::from_millis(120)), None);
        assert_eq!(
            input.expire(t0 + Duration::from_millis(150)),
            Some(HostEvent::KeyUp)
        );
        assert_eq!(input.expire(t0 + Duration::from_millis(400)), None);
    }

    #[test]
    fn test_dummy_input_drains() -> Result<(), io::Error> {
        let mut input = DummyInput::new(&[HostEvent::KeyDown(Key::Up), HostEvent::KeyUp]);
        assert_eq!(input.poll_events()?.len(), 2);
        assert!(input.poll_events()?.is_empty());
        Ok(())
    }
}
