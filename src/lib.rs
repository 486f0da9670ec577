//! A CHIP-8 interpreter
//!
//! ## Design
//!
//! * the interpreter core knows nothing about terminals, keyboards or
//!   speakers; it consumes a program image and a keypad snapshot, and produces
//!   a 64x32 bitmap with a dirty flag plus a "sound on" signal
//! * one `step()` is one instruction; the driver decides how many run per
//!   frame, and timers tick once per frame (60 Hz) rather than per instruction
//! * display, input and sound sit behind traits, so the terminal front end can
//!   be swapped out (the tests swap in dummies)
//!
//! Model
//!
//! Machine (driver)
//!  |-- display, input, sound, config
//!  |-- interpreter(config, keypad)
//!  |    |-- memory (font + program)
//!  |    |-- framebuffer
//!  |    `-- decoder: u16 -> Operation
//!  `-- main loop
//!       |-- input.pump(keypad)
//!       |-- interpreter.step() x (clock_hz / timer_hz)
//!       |-- interpreter.tick_timers()
//!       |-- sound.beep() / sound.stop() on edges
//!       |-- display.draw(frame) if dirty
//!       `-- sleep until the next frame is due
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod sound;

pub use config::{Config, Quirks, TimerMode};
pub use driver::Machine;
pub use error::{DriverError, LoadError, MemoryError, StepError};
pub use interpreter::Chip8Interpreter;
