//! Writing mapped frames to image files.

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameBufferFormat};
use image::{ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Ppm,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(ImageKind::Png),
            "ppm" => Ok(ImageKind::Ppm),
            _ => Err(Error::UnknownFormat(format!(
                "cannot infer image type of {:?}",
                path
            ))),
        }
    }
}

pub fn write_png(path: &Path, frame: &Frame, format: FrameBufferFormat) -> Result<()> {
    let bytes = frame.to_rgba8_top_down(format)?;
    let image = RgbaImage::from_raw(frame.size.width, frame.size.height, bytes).ok_or_else(|| {
        Error::UnknownFormat(format!("frame of {} does not match its pixel data", frame.size))
    })?;
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Binary P6, alpha dropped, top row first.
pub fn write_ppm(path: &Path, frame: &Frame, format: FrameBufferFormat) -> Result<()> {
    let bytes = frame.to_rgba8_top_down(format)?;
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", frame.size.width, frame.size.height)?;
    let rgb: Vec<u8> = bytes
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    out.write_all(&rgb)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub fn write_image(path: &Path, frame: &Frame, format: FrameBufferFormat) -> Result<()> {
    match ImageKind::from_path(path)? {
        ImageKind::Png => write_png(path, frame, format),
        ImageKind::Ppm => write_ppm(path, frame, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Pixels, Size};
    use std::path::PathBuf;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("osprey-image-out-{}-{name}", std::process::id()))
    }

    fn checker() -> Frame {
        // bottom row red, top row blue
        Frame {
            size: Size::new(2, 2),
            format: FrameBufferFormat::Rgba8,
            pixels: Pixels::Rgba8(vec![
                255, 0, 0, 255, 255, 0, 0, 255, //
                0, 0, 255, 255, 0, 0, 255, 255,
            ]),
        }
    }

    #[test]
    fn ppm_is_written_top_row_first() {
        let path = temp_file("checker.ppm");
        write_ppm(&path, &checker(), FrameBufferFormat::Rgba8).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let header = b"P6\n2 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        let body = &bytes[header.len()..];
        assert_eq!(body.len(), 2 * 2 * 3 + 1);
        assert_eq!(&body[..3], &[0, 0, 255]);
        assert_eq!(&body[6..9], &[255, 0, 0]);
        assert_eq!(body[12], b'\n');
    }

    #[test]
    fn png_keeps_dimensions_and_orientation() {
        let path = temp_file("checker.png");
        write_png(&path, &checker(), FrameBufferFormat::Rgba8).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        let _ = std::fs::remove_file(&path);

        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn image_kind_follows_extension() {
        assert_eq!(ImageKind::from_path(Path::new("a.PNG")).unwrap(), ImageKind::Png);
        assert_eq!(ImageKind::from_path(Path::new("a.ppm")).unwrap(), ImageKind::Ppm);
        assert!(ImageKind::from_path(Path::new("a.jpg")).is_err());
    }
}
