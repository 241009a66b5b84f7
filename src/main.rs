use std::error::Error;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use hack_emulator::config::{Config, DEFAULT_RATE};
use hack_emulator::display::{Display, Framebuffer, MonoTermDisplay};
use hack_emulator::engine::Engine;
use hack_emulator::input::{HostEvent, Input, StdinInput};

#[derive(Parser)]
#[command(name = "hack")]
#[command(about = "An emulator for the nand2tetris Hack computer")]
struct Args {
    #[arg(help = "Program image to run (.bin or .hack)")]
    program: PathBuf,

    #[arg(long, default_value_t = DEFAULT_RATE, help = "Instructions per second")]
    rate: u32,

    #[arg(long, default_value_t = 0, help = "Remember the last N instructions and print them on exit")]
    trace: usize,

    #[arg(long, help = "Don't blank the screen on reset")]
    keep_screen: bool,

    #[arg(long, help = "Start paused; Ctrl-P runs")]
    paused: bool,

    #[arg(long, default_value_t = 60.0, help = "Screen refreshes per second")]
    fps: f64,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Config {
            rate: args.rate,
            trace_capacity: args.trace,
            clear_screen_on_reset: !args.keep_screen,
            frame_rate: args.fps,
            start_paused: args.paused,
        }
    }
}

/// the interaction role: turns host events into engine calls and paints
struct Host<'a> {
    engine: Engine,
    display: &'a mut dyn Display,
    frame: Framebuffer,
}

impl Host<'_> {
    fn handle_event(&mut self, event: HostEvent) -> Result<ControlFlow<()>, Box<dyn Error>> {
        match event {
            HostEvent::KeyDown(key) => self.engine.on_key_down(key),
            HostEvent::KeyUp => self.engine.on_key_up(),
            HostEvent::TogglePause => self.engine.toggle_pause(),
            HostEvent::Step => {
                self.engine.pause();
                self.engine.step();
            }
            HostEvent::Reset => self.engine.reset(),
            HostEvent::Resize(w, h) => {
                log::debug!("terminal resized to {w}x{h}");
                self.engine.refresh_screen(&mut self.frame);
            }
            HostEvent::Paint => {
                self.engine.sync_screen(&mut self.frame);
                let status = self.status();
                self.display.draw(&self.frame, &status)?;
            }
            HostEvent::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    fn status(&self) -> String {
        let r = self.engine.registers();
        let (current, m) = self.engine.with_machine(|machine| {
            (
                hack_emulator::trace::disassemble(machine.current_instruction()),
                machine.m(),
            )
        });
        format!(
            "Hack {:?} | PC={} A={} D={} M={m} | next: {current} | {}/s | ^P pause ^S step ^R reset ^C quit",
            self.engine.state(),
            r.pc,
            r.a,
            r.d,
            self.engine.rate()
        )
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = Config::from(&args);

    // load before touching the terminal so a bad path reads normally
    let engine = Engine::new(&config);
    engine.load(&args.program)?;

    let mut display = MonoTermDisplay::new()?;
    let mut input = StdinInput::new()?;
    let mut host = Host {
        engine,
        display: &mut display,
        frame: Framebuffer::new(),
    };
    host.engine.refresh_screen(&mut host.frame);
    if !config.start_paused {
        host.engine.run();
    }

    let frame_time = Duration::from_secs_f64(1.0 / config.frame_rate.max(1.0));
    'main: loop {
        let frame_start = Instant::now();
        for event in input.poll_events()?.into_iter().chain([HostEvent::Paint]) {
            if host.handle_event(event)?.is_break() {
                break 'main;
            }
        }
        if let Some(rest) = frame_time.checked_sub(frame_start.elapsed()) {
            spin_sleep::sleep(rest);
        }
    }

    let mut engine = host.engine;
    engine.stop();
    // give the terminal back before printing anything
    drop(input);
    drop(display);

    for entry in engine.trace() {
        eprintln!("{entry}");
    }
    Ok(())
}
