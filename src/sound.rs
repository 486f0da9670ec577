use crate::error::SoundError;
use beep::beep;

/// makes a noise while the sound timer runs
pub trait Sound {
    fn beep(&mut self) -> Result<(), SoundError>;
    fn stop(&mut self) -> Result<(), SoundError>;
}

impl<S: Sound + ?Sized> Sound for Box<S> {
    fn beep(&mut self) -> Result<(), SoundError> {
        (**self).beep()
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        (**self).stop()
    }
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// the PC speaker, via the beep crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), SoundError> {
        if !self.is_beeping {
            beep(SIMPLEBEEP_PITCH).map_err(|e| SoundError(e.to_string()))?;
            self.is_beeping = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        if self.is_beeping {
            beep(0).map_err(|e| SoundError(e.to_string()))?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

/// silence; also records what it was asked to do, for tests
#[derive(Default)]
pub struct Mute {
    pub beeps: usize,
    pub stops: usize,
}

impl Mute {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), SoundError> {
        self.beeps += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        self.stops += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_sound_forwards() -> Result<(), SoundError> {
        let mut s: Box<Mute> = Box::new(Mute::new());
        s.beep()?;
        Sound::stop(&mut s)?;
        Sound::stop(&mut s)?;
        assert_eq!((s.beeps, s.stops), (1, 2));
        Ok(())
    }
}
