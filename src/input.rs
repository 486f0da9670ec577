use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::warn;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const KEY_COUNT: usize = 16;

/// the COSMAC VIP hex keypad, row by row
pub const KEYPAD_LAYOUT: [[u8; 4]; 4] = [
    [0x1, 0x2, 0x3, 0xc],
    [0x4, 0x5, 0x6, 0xd],
    [0x7, 0x8, 0x9, 0xe],
    [0xa, 0x0, 0xb, 0xf],
];

/// the left-hand side of a qwerty keyboard, laid over the keypad above
pub const QWERTY_LAYOUT: [[char; 4]; 4] = [
    ['1', '2', '3', '4'],
    ['q', 'w', 'e', 'r'],
    ['a', 's', 'd', 'f'],
    ['z', 'x', 'c', 'v'],
];

/// which keypad key a typed character stands for, if any
pub fn key_for_char(c: char) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    QWERTY_LAYOUT
        .iter()
        .flatten()
        .zip(KEYPAD_LAYOUT.iter().flatten())
        .find_map(|(&q, &k)| (q == c).then(|| k))
}

/// Pressed/released state of all 16 keys at one instant
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyState([bool; KEY_COUNT]);

impl KeyState {
    /// is key `k` (taken mod 16) held down
    pub fn is_down(&self, k: u8) -> bool {
        self.0[usize::from(k & 0xf)]
    }

    /// lowest-numbered key that's down
    pub fn first_down(&self) -> Option<u8> {
        self.0.iter().position(|&d| d).map(|k| k as u8)
    }

    pub fn any_down(&self) -> bool {
        self.0.iter().any(|&d| d)
    }

    pub fn set(&mut self, k: u8, down: bool) {
        self.0[usize::from(k & 0xf)] = down;
    }
}

impl From<[bool; KEY_COUNT]> for KeyState {
    fn from(keys: [bool; KEY_COUNT]) -> Self {
        KeyState(keys)
    }
}

/// Handle to the keypad shared between the input source, which is its only
/// writer, and the interpreter, which only ever takes snapshots
#[derive(Clone, Default)]
pub struct Keypad(Arc<Mutex<KeyState>>);

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, k: u8) {
        self.lock().set(k, true);
    }

    pub fn release(&self, k: u8) {
        self.lock().set(k, false);
    }

    pub fn release_all(&self) {
        *self.lock() = KeyState::default();
    }

    /// replace the whole state at once
    pub fn store(&self, state: KeyState) {
        *self.lock() = state;
    }

    pub fn snapshot(&self) -> KeyState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, KeyState> {
        // a KeyState is plain data, so a panic elsewhere can't leave it torn
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// what the driver should do after pumping input
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pump {
    Continue,
    Quit,
}

/// reads keypresses and feeds them to the keypad
pub trait Input {
    /// bring the keypad up to date with whatever happened since last time
    fn pump(&mut self, keypad: &Keypad) -> Result<Pump, io::Error>;
}

/// terminals send key-down events (plus auto-repeat) but no key-ups, so a key
/// stays down this long after its last event
const TERM_HOLD: Duration = Duration::from_millis(150);

/// Input from the terminal, using crossterm in raw mode
pub struct TermInput {
    last_seen: [Option<Instant>; KEY_COUNT],
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            last_seen: [None; KEY_COUNT],
        })
    }

    fn handle_key(&mut self, evt: KeyEvent, now: Instant) -> Pump {
        match evt.code {
            KeyCode::Esc => return Pump::Quit,
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                return Pump::Quit
            }
            KeyCode::Char(c) => match key_for_char(c) {
                Some(k) => self.last_seen[usize::from(k)] = Some(now),
                None => warn!("can't map {:?} to a keypad key", c),
            },
            other => warn!("ignoring key {:?}", other),
        }
        Pump::Continue
    }

    fn state_at(&self, now: Instant) -> KeyState {
        let mut state = KeyState::default();
        for (k, seen) in self.last_seen.iter().enumerate() {
            if let Some(t) = seen {
                state.set(k as u8, now.duration_since(*t) < TERM_HOLD);
            }
        }
        state
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        // nothing useful to do if the terminal has already gone away
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn pump(&mut self, keypad: &Keypad) -> Result<Pump, io::Error> {
        let now = Instant::now();
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                if self.handle_key(evt, now) == Pump::Quit {
                    return Ok(Pump::Quit);
                }
            }
        }
        keypad.store(self.state_at(now));
        Ok(Pump::Continue)
    }
}

/// dummy Input implementation for testing: replays one key state per pump,
/// then keeps the last one (or quits, if asked to)
pub struct DummyInput {
    script: Vec<KeyState>,
    quit_when_done: bool,
}

impl DummyInput {
    pub fn new(script: &[KeyState]) -> Self {
        DummyInput {
            script: script.iter().rev().copied().collect(),
            quit_when_done: false,
        }
    }

    /// quit on the first pump after the script runs out
    pub fn quitting(mut self) -> Self {
        self.quit_when_done = true;
        self
    }
}

impl Input for DummyInput {
    fn pump(&mut self, keypad: &Keypad) -> Result<Pump, io::Error> {
        match self.script.pop() {
            Some(state) => {
                keypad.store(state);
                Ok(Pump::Continue)
            }
            None if self.quit_when_done => Ok(Pump::Quit),
            None => Ok(Pump::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qwerty_mapping() {
        assert_eq!(key_for_char('1'), Some(0x1));
        assert_eq!(key_for_char('4'), Some(0xc));
        assert_eq!(key_for_char('x'), Some(0x0));
        assert_eq!(key_for_char('V'), Some(0xf));
        assert_eq!(key_for_char('z'), Some(0xa));
        assert_eq!(key_for_char('p'), None);
    }

    #[test]
    fn test_every_key_reachable() {
        let mut seen = [false; KEY_COUNT];
        for c in QWERTY_LAYOUT.iter().flatten() {
            seen[usize::from(key_for_char(*c).unwrap())] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_first_down_is_lowest() {
        let mut s = KeyState::default();
        assert_eq!(s.first_down(), None);
        s.set(0xb, true);
        s.set(0x3, true);
        assert_eq!(s.first_down(), Some(0x3));
        assert!(s.is_down(0x13)); // taken mod 16
    }

    #[test]
    fn test_keypad_handles_share_state() {
        let writer = Keypad::new();
        let reader = writer.clone();
        writer.press(0x7);
        assert!(reader.snapshot().is_down(0x7));
        writer.release(0x7);
        assert!(!reader.snapshot().any_down());
        writer.press(0x1);
        writer.press(0x2);
        writer.release_all();
        assert_eq!(reader.snapshot(), KeyState::default());
    }

    #[test]
    fn test_keypad_across_threads() {
        let keypad = Keypad::new();
        let writer = keypad.clone();
        std::thread::spawn(move || writer.press(0xe)).join().unwrap();
        assert!(keypad.snapshot().is_down(0xe));
    }

    #[test]
    fn test_term_hold_window() {
        let now = Instant::now();
        let mut input = TermInput {
            last_seen: [None; KEY_COUNT],
        };
        let key = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE);
        assert_eq!(input.handle_key(key, now), Pump::Continue);
        assert!(input.state_at(now).is_down(0x5));
        assert!(!input.state_at(now + TERM_HOLD).is_down(0x5));
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(input.handle_key(esc, now), Pump::Quit);
    }

    #[test]
    fn test_dummy_input_replays_script() -> Result<(), io::Error> {
        let mut pressed = KeyState::default();
        pressed.set(0x4, true);
        let mut input = DummyInput::new(&[KeyState::default(), pressed]).quitting();
        let keypad = Keypad::new();
        assert_eq!(input.pump(&keypad)?, Pump::Continue);
        assert!(!keypad.snapshot().any_down());
        assert_eq!(input.pump(&keypad)?, Pump::Continue);
        assert!(keypad.snapshot().is_down(0x4));
        assert_eq!(input.pump(&keypad)?, Pump::Quit);
        Ok(())
    }
}
