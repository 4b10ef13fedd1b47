//! Frame buffer formats, channels and mapped pixel data.

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel format of a frame buffer's color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameBufferFormat {
    /// 8 bit per component, linear.
    Rgba8,
    /// 8 bit per component, sRGB encoded color, linear alpha.
    #[default]
    Srgba,
    /// 32 bit float per component, linear.
    Rgba32f,
}

impl FrameBufferFormat {
    pub fn name(self) -> &'static str {
        match self {
            FrameBufferFormat::Rgba8 => "rgba8",
            FrameBufferFormat::Srgba => "srgba",
            FrameBufferFormat::Rgba32f => "rgba32f",
        }
    }
}

impl fmt::Display for FrameBufferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameBufferFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let tag = lower.strip_prefix("osp_fb_").unwrap_or(&lower);
        match tag {
            "rgba8" => Ok(FrameBufferFormat::Rgba8),
            "srgba" => Ok(FrameBufferFormat::Srgba),
            "rgba32f" => Ok(FrameBufferFormat::Rgba32f),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

bitflags! {
    /// Frame buffer channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Channels: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const ACCUM = 1 << 2;
    }
}

impl Default for Channels {
    fn default() -> Self {
        Channels::COLOR
    }
}

impl Channels {
    /// Parses a list of channel names such as `["color", "accum"]`.
    ///
    /// Unrecognized names are an error.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut channels = Channels::empty();
        for name in names {
            channels |= name.as_ref().parse::<Channels>()?;
        }
        Ok(channels)
    }
}

impl FromStr for Channels {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "osp_fb_color" => Ok(Channels::COLOR),
            "depth" | "osp_fb_depth" => Ok(Channels::DEPTH),
            "accum" | "osp_fb_accum" => Ok(Channels::ACCUM),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    Rgba8(Vec<u8>),
    Rgba32f(Vec<f32>),
}

/// Color channel contents copied out of a frame buffer.
///
/// Rows are stored bottom-up: row 0 is the bottom of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub size: Size,
    pub format: FrameBufferFormat,
    pub pixels: Pixels,
}

impl Frame {
    /// Returns RGBA8 bytes, top row first, encoded for `target`.
    ///
    /// Float frames are quantized on the fly. Byte frames are returned as-is
    /// and must already be in the target format.
    pub fn to_rgba8_top_down(&self, target: FrameBufferFormat) -> Result<Vec<u8>> {
        let width = self.size.width as usize;
        let height = self.size.height as usize;
        let bottom_up: Vec<u8> = match (&self.pixels, target) {
            (_, FrameBufferFormat::Rgba32f) => {
                return Err(Error::UnknownFormat(
                    "rgba32f cannot be written to an 8-bit image".to_string(),
                ))
            }
            (Pixels::Rgba8(bytes), _) => {
                if self.format != target {
                    return Err(Error::FormatMismatch {
                        expected: self.format,
                        found: target,
                    });
                }
                bytes.clone()
            }
            (Pixels::Rgba32f(values), FrameBufferFormat::Srgba) => values
                .chunks_exact(4)
                .flat_map(|px| encode_pixel(px, true))
                .collect(),
            (Pixels::Rgba32f(values), FrameBufferFormat::Rgba8) => values
                .chunks_exact(4)
                .flat_map(|px| encode_pixel(px, false))
                .collect(),
        };

        let row = width * 4;
        let mut out = Vec::with_capacity(row * height);
        for y in (0..height).rev() {
            out.extend_from_slice(&bottom_up[y * row..(y + 1) * row]);
        }
        Ok(out)
    }
}

pub(crate) fn encode_pixel(px: &[f32], srgb: bool) -> [u8; 4] {
    let encode = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        let c = if srgb { linear_to_srgb(c) } else { c };
        (c * 255.0 + 0.5) as u8
    };
    [
        encode(px[0]),
        encode(px[1]),
        encode(px[2]),
        (px[3].clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
    ]
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}
