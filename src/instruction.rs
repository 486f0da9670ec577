//! Instruction decoding
//!
//! Every 16-bit word maps onto exactly one [`Operation`]; words the machine
//! doesn't understand become [`Operation::Unknown`] rather than an error.
use std::fmt;

/// One decoded instruction, with its operands pulled out of the word
///
/// `x` and `y` are register indices (0-15), `kk` an immediate byte, `nnn` a
/// 12-bit address and `n` a 4-bit sprite height.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1nnn`
    Jump { nnn: u16 },
    /// `2nnn`
    Call { nnn: u16 },
    /// `3xkk`
    SkipEqByte { x: usize, kk: u8 },
    /// `4xkk`
    SkipNeByte { x: usize, kk: u8 },
    /// `5xy_`
    SkipEqReg { x: usize, y: usize },
    /// `6xkk`
    LoadByte { x: usize, kk: u8 },
    /// `7xkk`
    AddByte { x: usize, kk: u8 },
    /// `8xy0`
    LoadReg { x: usize, y: usize },
    /// `8xy1`
    Or { x: usize, y: usize },
    /// `8xy2`
    And { x: usize, y: usize },
    /// `8xy3`
    Xor { x: usize, y: usize },
    /// `8xy4`
    AddReg { x: usize, y: usize },
    /// `8xy5`
    SubReg { x: usize, y: usize },
    /// `8x_6`
    ShiftRight { x: usize },
    /// `8xy7`
    SubnReg { x: usize, y: usize },
    /// `8x_E`
    ShiftLeft { x: usize },
    /// `9xy_`
    SkipNeReg { x: usize, y: usize },
    /// `Annn`
    LoadIndex { nnn: u16 },
    /// `Bnnn`
    JumpV0 { nnn: u16 },
    /// `Cxkk`
    Rand { x: usize, kk: u8 },
    /// `Dxyn`
    Draw { x: usize, y: usize, n: u8 },
    /// `Ex9E`
    SkipIfKey { x: usize },
    /// `ExA1`
    SkipIfNotKey { x: usize },
    /// `Fx07`
    LoadDelay { x: usize },
    /// `Fx0A`
    WaitKey { x: usize },
    /// `Fx15`
    SetDelay { x: usize },
    /// `Fx18`
    SetSound { x: usize },
    /// `Fx1E`
    AddIndex { x: usize },
    /// `Fx29`
    FontAddr { x: usize },
    /// `Fx33`
    Bcd { x: usize },
    /// `Fx55`
    StoreRegs { x: usize },
    /// `Fx65`
    LoadRegs { x: usize },
    /// Anything else, kept whole for logging
    Unknown(u16),
}

/// Maps an instruction word to its operation
pub fn decode(word: u16) -> Operation {
    let x = usize::from((word >> 8) & 0xf);
    let y = usize::from((word >> 4) & 0xf);
    let n = (word & 0xf) as u8;
    let kk = (word & 0xff) as u8;
    let nnn = word & 0xfff;

    use Operation::*;
    match word >> 12 {
        0x0 => match word {
            0x00e0 => ClearScreen,
            0x00ee => Return,
            _ => Unknown(word),
        },
        0x1 => Jump { nnn },
        0x2 => Call { nnn },
        0x3 => SkipEqByte { x, kk },
        0x4 => SkipNeByte { x, kk },
        0x5 => SkipEqReg { x, y },
        0x6 => LoadByte { x, kk },
        0x7 => AddByte { x, kk },
        0x8 => match n {
            0x0 => LoadReg { x, y },
            0x1 => Or { x, y },
            0x2 => And { x, y },
            0x3 => Xor { x, y },
            0x4 => AddReg { x, y },
            0x5 => SubReg { x, y },
            0x6 => ShiftRight { x },
            0x7 => SubnReg { x, y },
            0xe => ShiftLeft { x },
            _ => Unknown(word),
        },
        0x9 => SkipNeReg { x, y },
        0xa => LoadIndex { nnn },
        0xb => JumpV0 { nnn },
        0xc => Rand { x, kk },
        0xd => Draw { x, y, n },
        0xe => match kk {
            0x9e => SkipIfKey { x },
            0xa1 => SkipIfNotKey { x },
            _ => Unknown(word),
        },
        0xf => match kk {
            0x07 => LoadDelay { x },
            0x0a => WaitKey { x },
            0x15 => SetDelay { x },
            0x18 => SetSound { x },
            0x1e => AddIndex { x },
            0x29 => FontAddr { x },
            0x33 => Bcd { x },
            0x55 => StoreRegs { x },
            0x65 => LoadRegs { x },
            _ => Unknown(word),
        },
        _ => unreachable!("a u16 shifted right by 12 is a nibble"),
    }
}

/// Conventional assembly mnemonics, as printed by the disassembler
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operation::*;
        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { nnn } => write!(f, "JP {:#05x}", nnn),
            Call { nnn } => write!(f, "CALL {:#05x}", nnn),
            SkipEqByte { x, kk } => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SkipNeByte { x, kk } => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadByte { x, kk } => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddByte { x, kk } => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            LoadReg { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            SubReg { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubnReg { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { nnn } => write!(f, "LD I, {:#05x}", nnn),
            JumpV0 { nnn } => write!(f, "JP V0, {:#05x}", nnn),
            Rand { x, kk } => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfKey { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotKey { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            FontAddr { x } => write!(f, "LD F, V{:X}", x),
            Bcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegs { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegs { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(word) => write!(f, "DW {:#06x}", word),
        }
    }
}

/// Decodes a whole program image into `(address, word, operation)` rows
///
/// A trailing odd byte is dropped; the machine can never fetch it as an
/// instruction anyway.
pub fn disassemble(
    program: &[u8],
    origin: u16,
) -> impl Iterator<Item = (u16, u16, Operation)> + '_ {
    program.chunks_exact(2).enumerate().map(move |(i, pair)| {
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        (origin.wrapping_add((2 * i) as u16), word, decode(word))
    })
}

#[cfg(test)]
mod tests {
    use super::Operation::*;
    use super::*;

    #[test]
    fn test_decode_table() {
        let cases = [
            (0x00e0, ClearScreen),
            (0x00ee, Return),
            (0x1234, Jump { nnn: 0x234 }),
            (0x2456, Call { nnn: 0x456 }),
            (0x342a, SkipEqByte { x: 4, kk: 0x2a }),
            (0x4a75, SkipNeByte { x: 0xa, kk: 0x75 }),
            (0x5ae0, SkipEqReg { x: 0xa, y: 0xe }),
            (0x63f5, LoadByte { x: 3, kk: 0xf5 }),
            (0x7b12, AddByte { x: 0xb, kk: 0x12 }),
            (0x8590, LoadReg { x: 5, y: 9 }),
            (0x8101, Or { x: 1, y: 0 }),
            (0x8642, And { x: 6, y: 4 }),
            (0x87f3, Xor { x: 7, y: 0xf }),
            (0x8264, AddReg { x: 2, y: 6 }),
            (0x8c45, SubReg { x: 0xc, y: 4 }),
            (0x8106, ShiftRight { x: 1 }),
            (0x86d7, SubnReg { x: 6, y: 0xd }),
            (0x8e0e, ShiftLeft { x: 0xe }),
            (0x9990, SkipNeReg { x: 9, y: 9 }),
            (0xa568, LoadIndex { nnn: 0x568 }),
            (0xbabc, JumpV0 { nnn: 0xabc }),
            (0xc5af, Rand { x: 5, kk: 0xaf }),
            (0xd7b3, Draw { x: 7, y: 0xb, n: 3 }),
            (0xe49e, SkipIfKey { x: 4 }),
            (0xeca1, SkipIfNotKey { x: 0xc }),
            (0xf907, LoadDelay { x: 9 }),
            (0xfd0a, WaitKey { x: 0xd }),
            (0xf315, SetDelay { x: 3 }),
            (0xf718, SetSound { x: 7 }),
            (0xf91e, AddIndex { x: 9 }),
            (0xff29, FontAddr { x: 0xf }),
            (0xf533, Bcd { x: 5 }),
            (0xf655, StoreRegs { x: 6 }),
            (0xf165, LoadRegs { x: 1 }),
        ];
        for (word, op) in cases {
            assert_eq!(decode(word), op, "decoding {:04x}", word);
        }
    }

    #[test]
    fn test_unknown_secondary_fields() {
        for word in [0x0000, 0x0123, 0x00e1, 0x8008, 0x800f, 0xe19f, 0xf000, 0xf1ff] {
            assert_eq!(decode(word), Unknown(word), "decoding {:04x}", word);
        }
    }

    #[test]
    fn test_single_operation_families_ignore_low_nibble() {
        assert_eq!(decode(0x5121), SkipEqReg { x: 1, y: 2 });
        assert_eq!(decode(0x912f), SkipNeReg { x: 1, y: 2 });
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(decode(0x00e0).to_string(), "CLS");
        assert_eq!(decode(0x612a).to_string(), "LD V1, 0x2a");
        assert_eq!(decode(0xd015).to_string(), "DRW V0, V1, 5");
        assert_eq!(decode(0xa050).to_string(), "LD I, 0x050");
        assert_eq!(decode(0xfb33).to_string(), "LD B, VB");
        assert_eq!(decode(0x0123).to_string(), "DW 0x0123");
    }

    #[test]
    fn test_disassemble() {
        let rows: Vec<_> = disassemble(&[0x00, 0xe0, 0x12, 0x00, 0xff], 0x200).collect();
        assert_eq!(
            rows,
            vec![(0x200, 0x00e0, ClearScreen), (0x202, 0x1200, Jump { nnn: 0x200 })]
        );
    }
}
