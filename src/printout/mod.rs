//! Printout Rasterisation and Export
//!
//! Turns the paper buffer's burn times into an 8-bit grayscale image,
//! 384 pixels wide, and writes it out as a PNG. Burn time maps linearly
//! to darkness: `pixel = max(0, 255 - ceil(seconds * gain))`. The gain is
//! a calibration constant, not a law; the default makes a typical
//! strobe window fully black.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::mech::DOTS_PER_LINE;
use crate::Result;

/// Grey level of unburned paper.
pub const WHITE: u8 = 255;

/// Grey level of a fully burned dot.
pub const BLACK: u8 = 0;

// Timestamp subtraction noise must not push an exact burn across the
// ceiling boundary.
const CEIL_GUARD: f64 = 1e-6;

fn grey_level(seconds: f64, gain: f64) -> u8 {
    let scaled = (seconds * gain - CEIL_GUARD).ceil();
    if scaled >= f64::from(WHITE) {
        BLACK
    } else {
        WHITE - scaled as u8
    }
}

/// Grayscale image of the paper produced by a capture.
///
/// Row 0 is the first paper row printed; `0` is black and `255` white.
#[derive(Clone, PartialEq, Eq)]
pub struct Printout {
    width: usize,
    pixels: Vec<u8>,
}

impl Printout {
    /// Rasterise burn-time rows with the given burn gain.
    pub fn from_burn_rows(rows: &[Vec<f64>], gain: f64) -> Self {
        let mut pixels = Vec::with_capacity(rows.len() * DOTS_PER_LINE);
        for row in rows {
            for &seconds in row {
                pixels.push(grey_level(seconds, gain));
            }
        }
        Printout {
            width: DOTS_PER_LINE,
            pixels,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.pixels.len() / self.width
    }

    /// Grey level at `row`, `column`.
    pub fn pixel(&self, row: usize, column: usize) -> u8 {
        self.pixels[row * self.width + column]
    }

    /// Pixel rows from the top of the printout down.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks(self.width)
    }

    /// Raw row-major pixel data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Write the printout to `path` as an 8-bit grayscale PNG.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(
            BufWriter::new(file),
            self.width as u32,
            self.height() as u32,
        );
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| format!("failed to write printout {}: {e}", path.display()))?;
        writer
            .write_image_data(&self.pixels)
            .map_err(|e| format!("failed to write printout {}: {e}", path.display()))?;
        Ok(())
    }
}

impl fmt::Debug for Printout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Printout({}x{})", self.width, self.height())
    }
}
