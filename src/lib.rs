//! # hack_emulator
//!
//! An emulator for the Hack computer from nand2tetris.
//!
//! ## Design
//!
//! * behave like the course's hardware where it matters to programs; not
//!   cycle accurate, just a coarse instructions-per-second limiter
//! * one owned machine object, no globals, so tests can build as many as
//!   they like
//! * execution runs on its own thread; the host (display, keyboard) talks to
//!   it through `engine::Engine` and never touches the machine mid-step
//! * abstract display and input so the terminal front end is just one way of
//!   plugging things in
//!
//! Model
//!
//! Engine
//!  |-- run state (atomic), rate (atomic), keyboard cell (atomic)
//!  |-- Mutex<Machine>
//!  |    |-- Rom: 32K instruction words, replaced whole by the loader
//!  |    |-- Ram: 16K general purpose, 8K screen, keyboard cell
//!  |    |-- registers: PC, A, D
//!  |    `-- trace: last N instructions (optional)
//!  `-- worker thread
//!       |-- every tick: budget = rate * elapsed
//!       |-- run the budget in chunks, releasing the lock in between
//!       `-- sleep out the rest of the tick
//!
//! Host
//!  |-- Input -> HostEvent -> Engine::on_key_down / pause / step / ...
//!  `-- Engine::sync_screen -> Framebuffer -> Display::draw
//!
//! Addressing: A is masked to 15 bits wherever it is used as an address.
//! Every masked value is a valid ROM index. RAM above the keyboard
//! (0x6001-0x7fff) is unmapped: reads give 0 and writes are dropped.
pub mod alu;
pub mod config;
pub mod display;
pub mod engine;
pub mod errors;
pub mod input;
pub mod interpreter;
pub mod loader;
pub mod memory;
pub mod trace;

pub use config::Config;
pub use engine::{Engine, RunState};
pub use errors::LoadError;
pub use input::Key;
pub use interpreter::Registers;
