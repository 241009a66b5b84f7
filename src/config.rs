/// default speed, roughly what the course's CPU emulator manages flat out
pub const DEFAULT_RATE: u32 = 1_000_000;

/// Knobs for the engine and the front end.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// instructions per second ceiling, at least 1
    pub rate: u32,
    /// how many executed instructions to remember; 0 turns tracing off
    pub trace_capacity: usize,
    /// whether `reset` blanks the screen as well as the registers
    pub clear_screen_on_reset: bool,
    /// how often the front end redraws, in Hz
    pub frame_rate: f64,
    /// leave the engine paused after loading instead of running straight away
    pub start_paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rate: DEFAULT_RATE,
            trace_capacity: 0,
            clear_screen_on_reset: true,
            frame_rate: 60.0,
            start_paused: false,
        }
    }
}

impl Config {
    /// the rate the engine will actually use
    pub fn effective_rate(&self) -> u32 {
        self.rate.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.rate, DEFAULT_RATE);
        assert_eq!(c.trace_capacity, 0);
        assert!(c.clear_screen_on_reset);
        assert!(!c.start_paused);
    }

    #[test]
    fn test_rate_floor() {
        let c = Config {
            rate: 0,
            ..Config::default()
        };
        assert_eq!(c.effective_rate(), 1);
    }
}
