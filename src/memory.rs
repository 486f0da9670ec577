use crate::error::{LoadError, MemoryError};
use log::debug;
use std::fmt::Write;
use std::ops::Range;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// highest addressable byte
pub const LAST_ADDR: u16 = 0x0fff;

/// most bytes a program image can hold
pub const MAX_PROGRAM_BYTES: usize = RAM_SIZE_BYTES - PROGRAM_ADDR as usize;

/// where the hex font lives
pub const FONT_ADDR: u16 = 0x050;

/// bytes per font glyph
pub const FONT_GLYPH_BYTES: u16 = 5;

/// Memory map of the machine:
///   0x0000-0x004f  reserved (interpreter)
///   0x0050-0x009f  hex font, 16 glyphs of 5 bytes
///   0x00a0-0x01ff  reserved (interpreter)
///   0x0200-0x0fff  program
///
/// program code can read the font (that's how digits get drawn) but every
/// write and every instruction fetch must land in the program region
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    program_len: Option<usize>,
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the font baked in; no program yet
    pub fn new() -> Self {
        let mut bytes = vec![0u8; RAM_SIZE_BYTES].into_boxed_slice();
        let font = FONT_ADDR as usize;
        bytes[font..font + CHIP8_FONT.len()].copy_from_slice(&CHIP8_FONT);
        Chip8MemoryMap {
            bytes,
            program_len: None,
        }
    }

    /// load a program at 0x200
    ///
    /// the whole program region is zeroed first so a shorter reload doesn't
    /// inherit the tail of the previous image
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.is_empty() {
            return Err(LoadError::Empty);
        }
        if program.len() > MAX_PROGRAM_BYTES {
            return Err(LoadError::TooLarge {
                size: program.len(),
                max: MAX_PROGRAM_BYTES,
            });
        }
        let start = PROGRAM_ADDR as usize;
        self.bytes[start..].fill(0);
        self.bytes[start..start + program.len()].copy_from_slice(program);
        self.program_len = Some(program.len());
        debug!("loaded {} byte program at {:#05x}", program.len(), PROGRAM_ADDR);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.program_len.is_some()
    }

    /// the bytes of the most recently loaded program
    pub fn program(&self) -> &[u8] {
        let start = PROGRAM_ADDR as usize;
        let len = self.program_len.unwrap_or(0);
        &self.bytes[start..start + len]
    }

    /// read one byte from the font or program region
    pub fn read(&self, addr: u16) -> Result<u8, MemoryError> {
        Ok(self.read_block(addr, 1)?[0])
    }

    /// write one byte into the program region
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        self.write_block(addr, &[value])
    }

    /// get a two-byte big-endian instruction word
    pub fn fetch_instruction(&self, pc: u16) -> Result<u16, MemoryError> {
        let r = self.writable_range(pc, 2)?;
        Ok(u16::from_be_bytes([self.bytes[r.start], self.bytes[r.start + 1]]))
    }

    /// get a r/o slice of `len` bytes; all of it must sit inside the font or
    /// inside the program region
    pub fn read_block(&self, addr: u16, len: usize) -> Result<&[u8], MemoryError> {
        let r = self.readable_range(addr, len)?;
        Ok(&self.bytes[r])
    }

    /// write a chunk of bytes into the program region, all or nothing
    pub fn write_block(&mut self, addr: u16, data: &[u8]) -> Result<(), MemoryError> {
        let r = self.writable_range(addr, data.len())?;
        self.bytes[r].copy_from_slice(data);
        Ok(())
    }

    /// the loaded program as rows of 16 upper-case hex bytes
    pub fn hex_dump(&self) -> String {
        let mut out = String::new();
        for row in self.program().chunks(16) {
            let line: Vec<String> = row.iter().map(|b| format!("{:02X}", b)).collect();
            // writing to a String can't fail
            let _ = writeln!(out, "{}", line.join(" "));
        }
        out
    }

    fn readable_range(&self, addr: u16, len: usize) -> Result<Range<usize>, MemoryError> {
        if !self.is_loaded() {
            return Err(MemoryError::NotLoaded);
        }
        let font = FONT_ADDR as usize..FONT_ADDR as usize + CHIP8_FONT.len();
        match span(addr, len) {
            Ok(r) if r.start >= font.start && r.end <= font.end => Ok(r),
            _ => self.writable_range(addr, len),
        }
    }

    fn writable_range(&self, addr: u16, len: usize) -> Result<Range<usize>, MemoryError> {
        if !self.is_loaded() {
            return Err(MemoryError::NotLoaded);
        }
        let r = span(addr, len)?;
        if r.start < PROGRAM_ADDR as usize {
            return Err(MemoryError::OutOfBounds { addr });
        }
        Ok(r)
    }
}

/// `addr..addr + len`, provided it ends inside RAM; the error names the first
/// address that falls off the end
fn span(addr: u16, len: usize) -> Result<Range<usize>, MemoryError> {
    let start = addr as usize;
    let end = start + len;
    if end > RAM_SIZE_BYTES {
        let first_bad = start.max(RAM_SIZE_BYTES);
        return Err(MemoryError::OutOfBounds {
            addr: u16::try_from(first_bad).unwrap_or(u16::MAX),
        });
    }
    Ok(start..end)
}

/// canonical hex digit glyphs; each row is the high nibble of a 4x5 glyph
pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(prog: &[u8]) -> Chip8MemoryMap {
        let mut m = Chip8MemoryMap::new();
        m.load(prog).unwrap();
        m
    }

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the font
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes.len(), RAM_SIZE_BYTES);
    }

    #[test]
    fn test_font_baked_in() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.bytes[0x50..0xa0], CHIP8_FONT);
        // glyph for "0" is a box
        assert_eq!(m.bytes[0x50..0x55], [0xF0, 0x90, 0x90, 0x90, 0xF0]);
        // glyph for "F"
        assert_eq!(m.bytes[0x9b..0xa0], [0xF0, 0x80, 0xF0, 0x80, 0x80]);
    }

    #[test]
    fn test_program_load_ok() -> Result<(), LoadError> {
        let mut m = Chip8MemoryMap::new();
        m.load(&[0x00, 0xe0])?; // clear screen
        assert_eq!(m.bytes[0x200..0x202], [0x00, 0xe0]);
        assert_eq!(m.program(), &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_load_empty() {
        let mut m = Chip8MemoryMap::new();
        assert_eq!(m.load(&[]), Err(LoadError::Empty));
        assert!(!m.is_loaded());
    }

    #[test]
    fn test_load_too_large_writes_nothing() {
        let mut m = Chip8MemoryMap::new();
        let big = vec![0xaa; MAX_PROGRAM_BYTES + 1];
        assert_eq!(
            m.load(&big),
            Err(LoadError::TooLarge {
                size: 3585,
                max: 3584
            })
        );
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
    }

    #[test]
    fn test_load_exactly_full() {
        let mut m = Chip8MemoryMap::new();
        m.load(&vec![0x12; MAX_PROGRAM_BYTES]).unwrap();
        assert_eq!(m.read(LAST_ADDR), Ok(0x12));
    }

    #[test]
    fn test_reload_clears_stale_bytes() {
        let mut m = loaded(&[1, 2, 3, 4]);
        m.load(&[9]).unwrap();
        assert_eq!(m.bytes[0x200..0x204], [9, 0, 0, 0]);
        assert_eq!(m.program(), &[9]);
    }

    #[test]
    fn test_read_before_load() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.read(0x200), Err(MemoryError::NotLoaded));
        assert_eq!(m.fetch_instruction(0x200), Err(MemoryError::NotLoaded));
    }

    #[test]
    fn test_read_write_program_region() {
        let mut m = loaded(&[0]);
        m.write(0x300, 0x42).unwrap();
        assert_eq!(m.read(0x300), Ok(0x42));
        m.write(LAST_ADDR, 0x24).unwrap();
        assert_eq!(m.read(LAST_ADDR), Ok(0x24));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut m = loaded(&[0]);
        assert_eq!(
            m.read(0x1000),
            Err(MemoryError::OutOfBounds { addr: 0x1000 })
        );
        assert_eq!(
            m.write(0x1ff, 1),
            Err(MemoryError::OutOfBounds { addr: 0x1ff })
        );
        // reserved area below the font
        assert_eq!(m.read(0x10), Err(MemoryError::OutOfBounds { addr: 0x10 }));
    }

    #[test]
    fn test_font_readable_not_writable() {
        let mut m = loaded(&[0]);
        assert_eq!(m.read(FONT_ADDR), Ok(0xF0));
        assert_eq!(
            m.write(FONT_ADDR, 0),
            Err(MemoryError::OutOfBounds { addr: FONT_ADDR })
        );
        // a block straddling the end of the font isn't inside either region
        assert!(m.read_block(0x9e, 4).is_err());
    }

    #[test]
    fn test_read_word() {
        let m = loaded(&[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(m.fetch_instruction(0x204), Ok(0x0405));
    }

    #[test]
    fn test_fetch_off_the_end() {
        let m = loaded(&[0]);
        assert_eq!(
            m.fetch_instruction(LAST_ADDR),
            Err(MemoryError::OutOfBounds { addr: 0x1000 })
        );
        assert_eq!(
            m.fetch_instruction(0x0050),
            Err(MemoryError::OutOfBounds { addr: 0x0050 })
        );
    }

    #[test]
    fn test_write_block_is_all_or_nothing() {
        let mut m = loaded(&[0]);
        assert!(m.write_block(0xffe, &[1, 2, 3]).is_err());
        assert_eq!(m.bytes[0xffe..], [0, 0]);
    }

    #[test]
    fn test_hex_dump() {
        let prog: Vec<u8> = (0..18).collect();
        let m = loaded(&prog);
        assert_eq!(
            m.hex_dump(),
            "00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n10 11\n"
        );
    }
}
