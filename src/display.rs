use crossterm::{cursor, execute, terminal};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// bytes in a packed frame: one bit per pixel, 8 pixels to a byte
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 8;

/// packed frame, row-major, most-significant bit is the leftmost pixel
pub type Frame = [u8; FRAME_BYTES];

/// The machine's 64x32 monochrome screen. Only the interpreter writes it;
/// presentation gets copies through [`Framebuffer::take_frame`].
#[derive(Clone)]
pub struct Framebuffer {
    bits: Frame,
    dirty: bool,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            bits: [0; FRAME_BYTES],
            dirty: false,
        }
    }

    /// blank every pixel; always counts as a change
    pub fn clear(&mut self) {
        self.bits = [0; FRAME_BYTES];
        self.dirty = true;
    }

    /// XOR one pixel on, or off again. Coordinates wrap around the screen
    /// edges. Returns true if the pixel was lit before, i.e. it has just been
    /// switched off.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let (byte, mask) = locate(x, y);
        let was_set = self.bits[byte] & mask != 0;
        self.bits[byte] ^= mask;
        self.dirty = true;
        was_set
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let (byte, mask) = locate(x, y);
        self.bits[byte] & mask != 0
    }

    pub fn as_bytes(&self) -> &Frame {
        &self.bits
    }

    /// something changed since presentation last looked
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// hand a copy of the frame to the presenter if it needs redrawing
    pub fn take_frame(&mut self) -> Option<Frame> {
        if self.dirty {
            self.dirty = false;
            Some(self.bits)
        } else {
            None
        }
    }

    /// number of lit pixels
    pub fn lit(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }
}

fn locate(x: usize, y: usize) -> (usize, u8) {
    let x = x % SCREEN_WIDTH;
    let y = y % SCREEN_HEIGHT;
    ((y * SCREEN_WIDTH + x) / 8, 0x80 >> (x % 8))
}

/// Display is used by the driver to put frames on a screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// draw a packed frame
    fn draw(&mut self, frame: &[u8]) -> Result<(), io::Error>;
}

// store useful metadata about the terminal: width, height, bits per pixel
struct Resolution(usize, usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn byte_count(&self) -> usize {
        self.pixel_count() * self.2 / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-((self.1 - 1) as f64), 0.0]
    }

    /// canvas coordinates of every pixel whose bit equals `bitplane`; y runs
    /// downwards on the chip-8 but upwards on the canvas
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl Iterator<Item = (f64, f64)> + 'a {
        let w = self.0;
        (0..self.pixel_count()).filter_map(move |i| {
            let bit = 1 & (data[i / 8] >> (7 - i % 8));
            (bit == bitplane).then(|| ((i % w) as f64, -((i / w) as f64)))
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(SCREEN_WIDTH, SCREEN_HEIGHT, 1),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        // nothing useful to do if the terminal has already gone away
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &[u8]) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        assert_eq!(
            frame.len(),
            self.resolution.byte_count(),
            "MonoTermDisplay must have correct-sized data to draw"
        );

        let lit: Vec<_> = self.resolution.bitplane_from_data(frame, 1).collect();
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        // for now this assumes a 1:1 ratio between terminal cells and pixels
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("ninechip")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &lit,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; remembers the last frame
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Option<Vec<u8>>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &[u8]) -> Result<(), io::Error> {
        self.frames += 1;
        self.last = Some(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_byte_count() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.byte_count(), FRAME_BYTES)
    }

    #[test]
    fn test_bounds() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplane_iterator() {
        let r = Resolution(64, 32, 1);
        let mut data = [0u8; FRAME_BYTES];
        data[0] = 0x80; // (0, 0)
        data[9] = 0x01; // (15, 1)
        let lit: Vec<_> = r.bitplane_from_data(&data, 1).collect();
        assert_eq!(lit, vec![(0.0, 0.0), (15.0, -1.0)]);
        assert_eq!(r.bitplane_from_data(&data, 0).count(), 2046);
    }

    // Framebuffer tests
    #[test]
    fn test_new_framebuffer_is_blank_and_clean() {
        let fb = Framebuffer::new();
        assert_eq!(fb.lit(), 0);
        assert!(!fb.is_dirty());
    }

    #[test]
    fn test_toggle_reports_collision() {
        let mut fb = Framebuffer::new();
        assert!(!fb.toggle(3, 4));
        assert!(fb.pixel(3, 4));
        assert!(fb.toggle(3, 4));
        assert!(!fb.pixel(3, 4));
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_packing_is_msb_first() {
        let mut fb = Framebuffer::new();
        fb.toggle(0, 0);
        fb.toggle(63, 31);
        assert_eq!(fb.as_bytes()[0], 0x80);
        assert_eq!(fb.as_bytes()[FRAME_BYTES - 1], 0x01);
    }

    #[test]
    fn test_coordinates_wrap() {
        let mut fb = Framebuffer::new();
        fb.toggle(64, 32);
        assert!(fb.pixel(0, 0));
        fb.toggle(65, 0);
        assert!(fb.pixel(1, 0));
    }

    #[test]
    fn test_clear_marks_dirty() {
        let mut fb = Framebuffer::new();
        fb.toggle(10, 10);
        fb.clear_dirty();
        fb.clear();
        assert_eq!(fb.lit(), 0);
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_take_frame_consumes_dirty() {
        let mut fb = Framebuffer::new();
        assert!(fb.take_frame().is_none());
        fb.toggle(8, 0);
        let frame = fb.take_frame().unwrap();
        assert_eq!(frame[1], 0x80);
        assert!(!fb.is_dirty());
        assert!(fb.take_frame().is_none());
    }

    #[test]
    fn test_dummy_display_counts_frames() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        d.draw(&[0; FRAME_BYTES])?;
        d.draw(&[1; FRAME_BYTES])?;
        assert_eq!(d.frames, 2);
        assert_eq!(d.last.as_deref(), Some(&[1u8; FRAME_BYTES][..]));
        Ok(())
    }
}
