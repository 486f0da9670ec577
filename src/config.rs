//! Run-time knobs for the machine and its driver

/// When the delay and sound timers count down
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TimerMode {
    /// once per frame, at [`Config::timer_hz`], however many instructions run
    #[default]
    Fixed,
    /// once at the end of every `step()`
    PerStep,
}

/// Behaviours that differ between historical interpreters
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Quirks {
    /// `Fx55` / `Fx65` leave I pointing just past the last register touched
    pub increment_index: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// instructions per second
    pub clock_hz: u32,
    /// timer ticks (and frames) per second
    pub timer_hz: u32,
    pub timer_mode: TimerMode,
    pub quirks: Quirks,
    /// fixed seed for `Cxkk`, for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock_hz: 600,
            timer_hz: 60,
            timer_mode: TimerMode::default(),
            quirks: Quirks::default(),
            seed: None,
        }
    }
}

impl Config {
    /// instructions to run between two timer ticks; always at least one
    pub fn steps_per_frame(&self) -> u32 {
        (self.clock_hz / self.timer_hz.max(1)).max(1)
    }
}
