/// Live pixel and playback state for canvas and video elements

use crate::resource::to_data_uri;
use crate::{Error, Result};
use image::ImageEncoder;

/// Data URI a surface without pixels serializes to
pub const EMPTY_DATA_URL: &str = "data:,";

/// An RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// A fully transparent surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::EncodeError(format!(
                "expected {} bytes for a {}x{} RGBA buffer, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Paint `source` stretched over the whole surface (nearest neighbour).
    pub fn draw_scaled(&mut self, source: &Raster) {
        if source.is_empty() || self.is_empty() {
            return;
        }
        for y in 0..self.height {
            let sy = (y as u64 * source.height as u64 / self.height as u64) as u32;
            for x in 0..self.width {
                let sx = (x as u64 * source.width as u64 / self.width as u64) as u32;
                if let Some(rgba) = source.pixel(sx, sy) {
                    self.set_pixel(x, y, rgba);
                }
            }
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut buf);
            encoder.write_image(
                &self.pixels,
                self.width,
                self.height,
                image::ColorType::Rgba8.into(),
            )?;
        }
        Ok(buf)
    }

    /// PNG data URI, or `data:,` for a zero-area surface.
    pub fn to_data_url(&self) -> Result<String> {
        if self.is_empty() {
            return Ok(EMPTY_DATA_URL.to_string());
        }
        Ok(to_data_uri("image/png", &self.encode_png()?))
    }
}

/// Playback state of a video element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoState {
    /// Source currently loaded by the media element, if any
    pub current_src: Option<String>,
    /// Decoded frame at the current playback position
    pub frame: Option<Raster>,
}

impl VideoState {
    pub fn loaded(src: impl Into<String>, frame: Raster) -> Self {
        Self {
            current_src: Some(src.into()),
            frame: Some(frame),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current_src.as_deref().is_some_and(|s| !s.is_empty())
    }
}
