use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ninechip::display::MonoTermDisplay;
use ninechip::input::TermInput;
use ninechip::instruction::disassemble;
use ninechip::memory::{Chip8MemoryMap, PROGRAM_ADDR};
use ninechip::sound::{Mute, SimpleBeep, Sound};
use ninechip::{Config, Machine, Quirks, TimerMode};

/// CHIP-8 interpreter for the terminal
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// ROM to load and execute
    rom: PathBuf,

    /// Instructions per second
    #[clap(long, default_value_t = 600)]
    hz: u32,

    /// Timer ticks (and screen refreshes) per second
    #[clap(long, default_value_t = 60)]
    timer_hz: u32,

    /// When the delay and sound timers count down
    #[clap(long, value_enum, default_value_t = TimerMode::Fixed)]
    timers: TimerMode,

    /// Seed for the random number generator
    #[clap(long)]
    seed: Option<u64>,

    /// Don't beep
    #[clap(long)]
    mute: bool,

    /// Fx55 / Fx65 advance I past the registers they touch
    #[clap(long)]
    index_quirk: bool,

    /// Stop after this many frames
    #[clap(long)]
    frames: Option<u64>,

    /// Print a disassembly of the ROM and exit
    #[clap(long)]
    disassemble: bool,

    /// Write a hex dump of the loaded ROM to this file and exit
    #[clap(long)]
    dump: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            clock_hz: self.hz,
            timer_hz: self.timer_hz,
            timer_mode: self.timers,
            quirks: Quirks {
                increment_index: self.index_quirk,
            },
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("NINECHIP_LOG", "info")
        .write_style_or("NINECHIP_LOG", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();
    let mut f = File::open(&args.rom)
        .with_context(|| format!("failed to open {:?}", args.rom))?;
    let mut rom = vec![];
    f.read_to_end(&mut rom).context("failed to read file")?;

    if args.disassemble {
        for (addr, word, op) in disassemble(&rom, PROGRAM_ADDR) {
            println!("{:03x}: {:04x}  {}", addr, word, op);
        }
        return Ok(());
    }

    if let Some(path) = &args.dump {
        let mut memory = Chip8MemoryMap::new();
        memory.load(&rom).context("failed to load ROM")?;
        std::fs::write(path, memory.hex_dump())
            .with_context(|| format!("failed to write {:?}", path))?;
        info!("memory dumped to {:?}", path);
        return Ok(());
    }

    let sound: Box<dyn Sound> = if args.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };
    let display = MonoTermDisplay::new().context("failed to set up the terminal")?;
    let input = TermInput::new().context("failed to put the terminal in raw mode")?;

    let mut machine = Machine::new(args.config(), display, input, sound);
    machine.load_program(&rom).context("failed to load ROM")?;
    info!("loaded {} bytes from {:?}", rom.len(), args.rom);

    let start = std::time::Instant::now();
    let frames = machine.run(args.frames)?;
    info!("ran {} frames in {:?}", frames, start.elapsed());
    Ok(())
}
