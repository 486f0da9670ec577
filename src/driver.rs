//! The outer loop: pumps input, runs the interpreter at its clock rate, ticks
//! timers at the frame rate and hands frames and beeps to the outside world
use crate::config::{Config, TimerMode};
use crate::display::Display;
use crate::error::{DriverError, LoadError};
use crate::input::{Input, Keypad, Pump};
use crate::interpreter::Chip8Interpreter;
use crate::sound::Sound;
use log::{debug, info};
use std::time::{Duration, Instant};

/// An interpreter wired up to a screen, a keyboard and a speaker
pub struct Machine<D: Display, I: Input, S: Sound> {
    interpreter: Chip8Interpreter,
    display: D,
    input: I,
    sound: S,
    config: Config,
    beeping: bool,
}

impl<D: Display, I: Input, S: Sound> Machine<D, I, S> {
    pub fn new(config: Config, display: D, input: I, sound: S) -> Self {
        let interpreter = Chip8Interpreter::new(&config, Keypad::new());
        Machine {
            interpreter,
            display,
            input,
            sound,
            config,
            beeping: false,
        }
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.interpreter.load_program(program)
    }

    pub fn interpreter(&self) -> &Chip8Interpreter {
        &self.interpreter
    }

    /// one frame's worth of work, without any sleeping
    pub fn run_frame(&mut self) -> Result<Pump, DriverError> {
        if self.input.pump(self.interpreter.keypad())? == Pump::Quit {
            return Ok(Pump::Quit);
        }

        for _ in 0..self.config.steps_per_frame() {
            let pc = self.interpreter.pc();
            self.interpreter
                .step()
                .map_err(|source| DriverError::Step { pc, source })?;
        }
        if self.config.timer_mode == TimerMode::Fixed {
            self.interpreter.tick_timers();
        }

        let active = self.interpreter.sound_active();
        if active != self.beeping {
            if active {
                self.sound.beep()?;
            } else {
                self.sound.stop()?;
            }
            self.beeping = active;
        }

        if let Some(frame) = self.interpreter.framebuffer_mut().take_frame() {
            self.display.draw(&frame)?;
        }
        Ok(Pump::Continue)
    }

    /// run frames at `timer_hz` until input asks to quit or `frames` have
    /// gone by; returns how many frames ran
    pub fn run(&mut self, frames: Option<u64>) -> Result<u64, DriverError> {
        let period = Duration::from_secs(1) / self.config.timer_hz.max(1);
        info!(
            "running at {} Hz, {} steps per frame",
            self.config.timer_hz,
            self.config.steps_per_frame()
        );

        let mut count = 0;
        let mut deadline = Instant::now();
        let result = loop {
            if frames.is_some_and(|f| count >= f) {
                break Ok(count);
            }
            match self.run_frame() {
                Ok(Pump::Continue) => count += 1,
                Ok(Pump::Quit) => {
                    info!("quit after {} frames", count);
                    break Ok(count);
                }
                Err(e) => break Err(e),
            }

            deadline += period;
            let now = Instant::now();
            if deadline > now {
                spin_sleep::sleep(deadline - now);
            } else {
                // fell behind; don't try to catch up with a burst of frames
                debug!("frame {} late by {:?}", count, now - deadline);
                deadline = now;
            }
        };

        if self.beeping {
            self.sound.stop()?;
            self.beeping = false;
        }
        result
    }
}
