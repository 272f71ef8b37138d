//! Pixel packing
//!
//! The Pixelblaze pattern receives one number per pixel. Pattern numbers are
//! signed 16.16 fixed point, so an RGB triple is packed as
//!
//! ```text
//! value = ((r << 16) | (g << 8) | b) / 256
//! ```
//!
//! which puts `r` and `g` in the integer half and `b` in the fraction. The
//! pattern unpacks it with `(v >> 8) & 0xff`, `v & 0xff` and `(v * 256) & 0xff`.

/// Most RGB pixels that fit in one 512-slot DMX universe
pub const MAX_PIXELS_PER_UNIVERSE: usize = 170;

/// Pack one RGB triple into a pattern number
pub fn pack_rgb(r: u8, g: u8, b: u8) -> f64 {
    let raw = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
    let value = raw as f64 / 256.0;
    // Wrap into the signed 16.16 range
    if value >= 32768.0 {
        value - 65536.0
    } else {
        value
    }
}

/// Latest pixel values across all listened universes
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pixels: Vec<f64>,
    pixels_per_universe: usize,
}

impl PixelBuffer {
    pub fn new(universe_count: usize, pixels_per_universe: usize) -> Self {
        let pixels_per_universe = pixels_per_universe.clamp(1, MAX_PIXELS_PER_UNIVERSE);
        Self {
            pixels: vec![0.0; universe_count * pixels_per_universe],
            pixels_per_universe,
        }
    }

    /// Pack the DMX data of universe `slot` (0-based) into its pixel range.
    ///
    /// Returns the number of pixels written. Trailing bytes that do not make
    /// a whole triple are ignored.
    pub fn pack(&mut self, slot: usize, dmx: &[u8]) -> usize {
        let start = slot * self.pixels_per_universe;
        let Some(range) = self.pixels.get_mut(start..start + self.pixels_per_universe) else {
            return 0;
        };

        let mut written = 0;
        for (pixel, rgb) in range.iter_mut().zip(dmx.chunks_exact(3)) {
            *pixel = pack_rgb(rgb[0], rgb[1], rgb[2]);
            written += 1;
        }
        written
    }

    /// The first `pixel_count` values
    pub fn frame(&self, pixel_count: usize) -> &[f64] {
        &self.pixels[..pixel_count.min(self.pixels.len())]
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
