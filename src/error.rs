use std::io;
use thiserror::Error;

/// Reasons a program image can't be loaded
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("program image is empty")]
    Empty,

    #[error("program image is {size} bytes, but only {max} fit above 0x200")]
    TooLarge { size: usize, max: usize },
}

/// Memory accesses the machine refuses to make
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {addr:#05x} is outside the addressable program range")]
    OutOfBounds { addr: u16 },

    #[error("no program has been loaded")]
    NotLoaded,
}

/// Failures that abort a single interpreter cycle
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("call stack overflow at {pc:#05x}")]
    StackOverflow { pc: u16 },

    #[error("return with an empty call stack at {pc:#05x}")]
    StackUnderflow { pc: u16 },
}

/// The beeper couldn't be driven
#[derive(Debug, Error)]
#[error("sound device failed: {0}")]
pub struct SoundError(pub String);

/// Anything that stops the driver loop
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("interpreter halted at {pc:#05x}")]
    Step {
        pc: u16,
        #[source]
        source: StepError,
    },

    #[error("terminal i/o failed")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Sound(#[from] SoundError),
}
