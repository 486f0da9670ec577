//! # interpreter
//!
//! The machine state a CHIP-8 program can see:
//!  V0-VF  16 8bit registers; VF doubles as the carry/borrow/collision flag
//!  I      16bit index register (only 12 bits reach memory)
//!  PC     program counter, starts at 0x200
//!  stack  16 return addresses, with its own pointer
//!  DT     delay timer, counts down to zero
//!  ST     sound timer, counts down to zero; the buzzer sounds while it's > 0
//! plus memory, the 64x32 screen and a read-only view of the keypad.
//!
//! step() is one fetch/decode/execute cycle. it either completes or fails
//! with nothing changed, so the driver can stop between any two calls.
use crate::config::{Config, Quirks, TimerMode};
use crate::display::{Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::{LoadError, StepError};
use crate::input::Keypad;
use crate::instruction::{decode, Operation};
use crate::memory::{Chip8MemoryMap, FONT_ADDR, FONT_GLYPH_BYTES, PROGRAM_ADDR};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// how many nested calls fit on the stack
pub const STACK_DEPTH: usize = 16;

/// the flag register
const VF: usize = 0xf;

/// where the program counter goes once an operation is done
enum Flow {
    /// on to the next instruction
    Next,
    /// over the next instruction
    Skip,
    Jump(u16),
    /// stay put and run this instruction again
    Hold,
}

pub struct Chip8Interpreter {
    memory: Chip8MemoryMap,
    framebuffer: Framebuffer,
    keypad: Keypad,
    v: [u8; 16],
    i: u16,
    program_counter: u16,
    stack: [u16; STACK_DEPTH],
    stack_pointer: usize,
    delay_timer: u8,
    sound_timer: u8,
    timer_mode: TimerMode,
    quirks: Quirks,
    rng: StdRng,
    cycles: u64,
}

impl Chip8Interpreter {
    /// a machine with nothing loaded, reading keys from `keypad`
    pub fn new(config: &Config, keypad: Keypad) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            framebuffer: Framebuffer::new(),
            keypad,
            v: [0; 16],
            i: 0,
            program_counter: PROGRAM_ADDR,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            timer_mode: config.timer_mode,
            quirks: config.quirks,
            rng,
            cycles: 0,
        }
    }

    /// load a chip8 program and reset the machine to run it
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.memory.load(program)?;
        self.reset();
        Ok(())
    }

    /// back to power-on state, keeping memory (and so the loaded program)
    pub fn reset(&mut self) {
        self.v = [0; 16];
        self.i = 0;
        self.program_counter = PROGRAM_ADDR;
        self.stack = [0; STACK_DEPTH];
        self.stack_pointer = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.cycles = 0;
        self.framebuffer.clear();
        debug!("reset; pc = {:#05x}", self.program_counter);
    }

    /// run one fetch/decode/execute cycle
    pub fn step(&mut self) -> Result<(), StepError> {
        let pc = self.program_counter;
        let word = self.memory.fetch_instruction(pc)?;
        let op = decode(word);
        trace!("{:#05x}: {:04x}  {}", pc, word, op);

        self.program_counter = match self.execute(op)? {
            Flow::Next => pc + 2,
            Flow::Skip => pc + 4,
            Flow::Jump(addr) => addr,
            Flow::Hold => pc,
        };
        self.cycles += 1;

        if self.timer_mode == TimerMode::PerStep {
            self.tick_timers();
        }
        Ok(())
    }

    /// count both timers down by one, stopping at zero
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    fn execute(&mut self, op: Operation) -> Result<Flow, StepError> {
        use Operation::*;
        let pc = self.program_counter;
        let flow = match op {
            ClearScreen => {
                self.framebuffer.clear();
                Flow::Next
            }
            Return => {
                if self.stack_pointer == 0 {
                    return Err(StepError::StackUnderflow { pc });
                }
                self.stack_pointer -= 1;
                Flow::Jump(self.stack[self.stack_pointer])
            }
            Jump { nnn } => Flow::Jump(nnn),
            Call { nnn } => {
                if self.stack_pointer == STACK_DEPTH {
                    return Err(StepError::StackOverflow { pc });
                }
                self.stack[self.stack_pointer] = pc + 2;
                self.stack_pointer += 1;
                Flow::Jump(nnn)
            }
            SkipEqByte { x, kk } => skip_if(self.v[x] == kk),
            SkipNeByte { x, kk } => skip_if(self.v[x] != kk),
            SkipEqReg { x, y } => skip_if(self.v[x] == self.v[y]),
            LoadByte { x, kk } => {
                self.v[x] = kk;
                Flow::Next
            }
            AddByte { x, kk } => {
                self.v[x] = self.v[x].wrapping_add(kk);
                Flow::Next
            }
            LoadReg { x, y } => {
                self.v[x] = self.v[y];
                Flow::Next
            }
            Or { x, y } => {
                self.v[x] |= self.v[y];
                Flow::Next
            }
            And { x, y } => {
                self.v[x] &= self.v[y];
                Flow::Next
            }
            Xor { x, y } => {
                self.v[x] ^= self.v[y];
                Flow::Next
            }

            // flag first, then result: with x == F the result is what's left
            AddReg { x, y } => {
                let sum = u16::from(self.v[x]) + u16::from(self.v[y]);
                self.set_flag_then(x, sum > 0xff, sum as u8)
            }
            SubReg { x, y } => {
                let (vx, vy) = (self.v[x], self.v[y]);
                self.set_flag_then(x, vx >= vy, vx.wrapping_sub(vy))
            }
            ShiftRight { x } => {
                let vx = self.v[x];
                self.set_flag_then(x, vx & 0x01 != 0, vx >> 1)
            }
            SubnReg { x, y } => {
                let (vx, vy) = (self.v[x], self.v[y]);
                self.set_flag_then(x, vy >= vx, vy.wrapping_sub(vx))
            }
            ShiftLeft { x } => {
                let vx = self.v[x];
                self.set_flag_then(x, vx & 0x80 != 0, vx << 1)
            }

            SkipNeReg { x, y } => skip_if(self.v[x] != self.v[y]),
            LoadIndex { nnn } => {
                self.i = nnn;
                Flow::Next
            }
            JumpV0 { nnn } => Flow::Jump(nnn + u16::from(self.v[0])),
            Rand { x, kk } => {
                self.v[x] = self.rng.gen::<u8>() & kk;
                Flow::Next
            }
            Draw { x, y, n } => {
                self.draw(x, y, n)?;
                Flow::Next
            }
            SkipIfKey { x } => skip_if(self.keypad.snapshot().is_down(self.v[x])),
            SkipIfNotKey { x } => skip_if(!self.keypad.snapshot().is_down(self.v[x])),
            LoadDelay { x } => {
                self.v[x] = self.delay_timer;
                Flow::Next
            }
            WaitKey { x } => match self.keypad.snapshot().first_down() {
                Some(k) => {
                    self.v[x] = k;
                    Flow::Next
                }
                None => Flow::Hold,
            },
            SetDelay { x } => {
                self.delay_timer = self.v[x];
                Flow::Next
            }
            SetSound { x } => {
                self.sound_timer = self.v[x];
                Flow::Next
            }
            AddIndex { x } => {
                self.i = self.i.wrapping_add(u16::from(self.v[x]));
                Flow::Next
            }
            FontAddr { x } => {
                self.i = FONT_ADDR + FONT_GLYPH_BYTES * u16::from(self.v[x]);
                Flow::Next
            }
            Bcd { x } => {
                let vx = self.v[x];
                self.memory
                    .write_block(self.i, &[vx / 100, vx / 10 % 10, vx % 10])?;
                Flow::Next
            }
            StoreRegs { x } => {
                self.memory.write_block(self.i, &self.v[..=x])?;
                self.bump_index(x);
                Flow::Next
            }
            LoadRegs { x } => {
                let regs = self.memory.read_block(self.i, x + 1)?;
                self.v[..=x].copy_from_slice(regs);
                self.bump_index(x);
                Flow::Next
            }
            Unknown(word) => {
                warn!("unknown instruction {:04x} at {:#05x}; skipping", word, pc);
                Flow::Next
            }
        };
        Ok(flow)
    }

    fn set_flag_then(&mut self, x: usize, flag: bool, result: u8) -> Flow {
        self.v[VF] = u8::from(flag);
        self.v[x] = result;
        Flow::Next
    }

    fn bump_index(&mut self, x: usize) {
        if self.quirks.increment_index {
            self.i = self.i.wrapping_add(x as u16 + 1);
        }
    }

    /// XOR an n-row sprite from I onto the screen at (Vx, Vy). each pixel
    /// wraps on its own, so a sprite hanging off one edge reappears on the
    /// other. VF ends up 1 if any lit pixel got switched off.
    fn draw(&mut self, x: usize, y: usize, n: u8) -> Result<(), StepError> {
        let sprite: &[u8] = if n == 0 {
            &[]
        } else {
            self.memory.read_block(self.i, usize::from(n))?
        };
        let x0 = usize::from(self.v[x]) % SCREEN_WIDTH;
        let y0 = usize::from(self.v[y]) % SCREEN_HEIGHT;

        self.v[VF] = 0;
        let mut collision = false;
        for (row, bits) in sprite.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) != 0 {
                    collision |= self.framebuffer.toggle(x0 + col, y0 + row);
                }
            }
        }
        self.v[VF] = u8::from(collision);
        Ok(())
    }

    pub fn pc(&self) -> u16 {
        self.program_counter
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    /// return addresses currently on the stack
    pub fn stack_depth(&self) -> usize {
        self.stack_pointer
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// the buzzer should be sounding
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// presentation uses this to take frames and clear the dirty flag
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    /// cycles completed since the last reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

fn skip_if(cond: bool) -> Flow {
    if cond {
        Flow::Skip
    } else {
        Flow::Next
    }
}
