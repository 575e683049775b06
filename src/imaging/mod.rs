// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image decoding, blurring and encoding

pub mod stackblur;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::{BlurwatchError, Result};

pub use stackblur::stack_blur;

/// Formats a blurred image can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    /// Pick the format from the text after the last `.` of an image path
    pub fn from_image_path(path: &str) -> Result<Self> {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or(path);
        match ext.to_ascii_uppercase().as_str() {
            "JPG" | "JPEG" => Ok(Self::Jpeg),
            "PNG" => Ok(Self::Png),
            "GIF" => Ok(Self::Gif),
            _ => Err(BlurwatchError::UnsupportedFormat(ext.to_string())),
        }
    }
}

/// Decode an image, detecting the format from its content
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!("Loaded {:?}: {}x{}", path, img.width(), img.height());
    Ok(img)
}

/// Apply the stack blur and return an RGBA image
pub fn blur(img: &DynamicImage, radius: u32) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    stack_blur(&mut rgba, radius);
    DynamicImage::ImageRgba8(rgba)
}

/// Write an image in the given format
pub fn save_image(img: &DynamicImage, path: &Path, format: OutputFormat, jpeg_quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, jpeg_quality))?;
        }
        OutputFormat::Png => img.write_to(&mut writer, ImageFormat::Png)?,
        OutputFormat::Gif => img.write_to(&mut writer, ImageFormat::Gif)?,
    }
    writer.flush()?;

    info!("Wrote {:?} as {:?}", path, format);
    Ok(())
}
