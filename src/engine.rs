//! The execution engine: owns the machine, runs it on a worker thread at a
//! limited rate, and gives the host a control surface that is safe to call
//! from its own thread.
//!
//! The whole machine sits behind one mutex. The worker holds it for a chunk
//! of at most `CHUNK` instructions at a time, so anything the host reads
//! under the lock is committed state, never half an instruction. The run
//! state and the rate are atomics, and the keyboard cell is an atomic the
//! host writes without taking the lock at all.
use crate::config::Config;
use crate::display::Framebuffer;
use crate::errors::LoadError;
use crate::input::Key;
use crate::interpreter::{Machine, Registers};
use crate::loader;
use crate::memory::{KeyboardRegister, Rom, Word};
use crate::trace::TraceEntry;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// how often the worker wakes up to work out its next batch
pub const TICK: Duration = Duration::from_millis(10);

/// most instructions run per lock acquisition
pub const CHUNK: u64 = 4096;

/// never try to catch up on more than this many ticks of lost time
const MAX_BACKLOG_TICKS: f64 = 2.0;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// terminal; nothing runs or steps any more
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

impl RunState {
    fn from_u8(v: u8) -> RunState {
        match v {
            1 => RunState::Running,
            2 => RunState::Paused,
            _ => RunState::Stopped,
        }
    }
}

/// state both threads look at without the machine lock
struct Shared {
    run_state: AtomicU8,
    rate: AtomicU32,
}

impl Shared {
    fn state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    /// move to `to` unless already stopped; returns the state we left
    fn transition(&self, to: RunState) -> RunState {
        let mut current = self.run_state.load(Ordering::Acquire);
        loop {
            if RunState::from_u8(current) == RunState::Stopped {
                return RunState::Stopped;
            }
            match self.run_state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(prev) => return RunState::from_u8(prev),
                Err(actual) => current = actual,
            }
        }
    }

    fn rate(&self) -> u32 {
        self.rate.load(Ordering::Relaxed)
    }
}

fn lock(machine: &Mutex<Machine>) -> MutexGuard<'_, Machine> {
    // a poisoned lock only means a host closure panicked; the machine itself
    // is always left between instructions
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The emulator as the host sees it.
pub struct Engine {
    machine: Arc<Mutex<Machine>>,
    keyboard: Arc<KeyboardRegister>,
    shared: Arc<Shared>,
    clear_screen_on_reset: bool,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// A zeroed machine with an empty program, paused. The worker thread
    /// starts straight away but does nothing until `run`.
    pub fn new(config: &Config) -> Engine {
        let keyboard = Arc::new(KeyboardRegister::new());
        let machine = Arc::new(Mutex::new(Machine::new(
            Arc::clone(&keyboard),
            config.trace_capacity,
        )));
        let shared = Arc::new(Shared {
            run_state: AtomicU8::new(RunState::Paused as u8),
            rate: AtomicU32::new(config.effective_rate()),
        });
        let worker = {
            let machine = Arc::clone(&machine);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("hack-cpu".into())
                .spawn(move || worker(&machine, &shared))
        };
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // single stepping still works without the worker
                log::error!("could not start execution thread: {e}");
                None
            }
        };
        Engine {
            machine,
            keyboard,
            shared,
            clear_screen_on_reset: config.clear_screen_on_reset,
            worker,
        }
    }

    /// Load a program image from disk. On failure the current program keeps
    /// running untouched; on success it replaces the program and zeroes the
    /// registers.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let rom = loader::load_file(path)?;
        self.load_rom(rom);
        Ok(())
    }

    /// swap in an already parsed program
    pub fn load_rom(&self, rom: Rom) {
        log::debug!("installing program of {} instructions", rom.program_len());
        lock(&self.machine).load_rom(rom);
    }

    pub fn run(&self) {
        if self.shared.transition(RunState::Running) == RunState::Paused {
            log::debug!("running at {} instructions/s", self.shared.rate());
        }
    }

    pub fn pause(&self) {
        if self.shared.transition(RunState::Paused) == RunState::Running {
            log::debug!("paused at {:?}", self.registers());
        }
    }

    /// pause if running, run if paused
    pub fn toggle_pause(&self) {
        match self.state() {
            RunState::Running => self.pause(),
            RunState::Paused => self.run(),
            RunState::Stopped => {}
        }
    }

    /// Stop for good and wait for the worker to finish its current chunk.
    pub fn stop(&mut self) {
        self.shared
            .run_state
            .store(RunState::Stopped as u8, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("execution thread panicked");
            }
            log::info!("stopped at {:?}", self.registers());
        }
    }

    /// Execute exactly one instruction whatever the run state, except once
    /// stopped. Returns whether anything ran.
    pub fn step(&self) -> bool {
        if self.is_stopped() {
            return false;
        }
        lock(&self.machine).step();
        true
    }

    /// Zero the registers and, if configured, blank the screen. The program,
    /// general RAM and the run state are left alone.
    pub fn reset(&self) {
        log::debug!("reset");
        lock(&self.machine).reset(self.clear_screen_on_reset);
    }

    /// change the instructions-per-second ceiling; takes effect next tick
    pub fn set_rate(&self, rate: u32) {
        self.shared.rate.store(rate.max(1), Ordering::Relaxed);
        log::debug!("rate set to {} instructions/s", rate.max(1));
    }

    pub fn rate(&self) -> u32 {
        self.shared.rate()
    }

    /// latch a key into the keyboard register; the last press wins
    pub fn on_key_down(&self, key: Key) {
        match key.code() {
            Some(code) => self.keyboard.press(code),
            None => log::warn!("{key:?} has no Hack key code"),
        }
    }

    pub fn on_key_up(&self) {
        self.keyboard.release();
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == RunState::Stopped
    }

    /// committed PC, A and D
    pub fn registers(&self) -> Registers {
        lock(&self.machine).registers()
    }

    /// one committed RAM word
    pub fn peek(&self, addr: u16) -> Word {
        lock(&self.machine).peek(addr)
    }

    /// look at the machine between instructions
    pub fn with_machine<T>(&self, f: impl FnOnce(&Machine) -> T) -> T {
        f(&lock(&self.machine))
    }

    /// copy of the trace, oldest first
    pub fn trace(&self) -> Vec<TraceEntry> {
        lock(&self.machine).trace().entries().copied().collect()
    }

    /// bring `frame` up to date with the screen words written since the last
    /// sync; returns how many words changed
    pub fn sync_screen(&self, frame: &mut Framebuffer) -> usize {
        frame.sync(lock(&self.machine).ram_mut())
    }

    /// rebuild `frame` from the whole screen region
    pub fn refresh_screen(&self, frame: &mut Framebuffer) {
        frame.refresh(lock(&self.machine).ram_mut());
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// the execution role: run budgeted chunks every tick until stopped
fn worker(machine: &Mutex<Machine>, shared: &Shared) {
    log::info!("execution thread started");
    let mut last = Instant::now();
    let mut budget = 0.0f64;
    loop {
        let tick_start = Instant::now();
        match shared.state() {
            RunState::Stopped => break,
            RunState::Paused => {
                budget = 0.0;
                last = tick_start;
                spin_sleep::sleep(TICK);
                continue;
            }
            RunState::Running => {}
        }

        let rate = f64::from(shared.rate());
        budget += tick_start.duration_since(last).as_secs_f64() * rate;
        budget = budget.min(rate * TICK.as_secs_f64() * MAX_BACKLOG_TICKS);
        last = tick_start;

        let mut todo = budget as u64;
        budget -= todo as f64;
        while todo > 0 && shared.state() == RunState::Running {
            let chunk = todo.min(CHUNK);
            {
                let mut m = lock(machine);
                for _ in 0..chunk {
                    m.step();
                }
            }
            todo -= chunk;
            // let the host at the lock between chunks
            thread::yield_now();
        }

        if let Some(rest) = TICK.checked_sub(tick_start.elapsed()) {
            spin_sleep::sleep(rest);
        }
    }
    log::info!("execution thread finished");
}
