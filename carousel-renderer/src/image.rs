//! Image asset decoding.
//!
//! Backgrounds arrive as data URLs of arbitrary raster formats (or SVG, for
//! stickers). The compositor only needs their pixel size for cover fitting;
//! decoding to RGBA is used when callers inspect rendered output.

use std::io::Cursor;

use carousel_core::ImageAsset;

use crate::error::{RenderError, RenderResult};
use crate::raster::Rasterizer;

/// Decoded RGBA pixels.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub data: Vec<u8>,
    /// Original format of the image.
    pub format: ImageFormat,
}

impl TextureData {
    /// RGBA value at a pixel, if inside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        self.data
            .get(offset..offset + 4)
            .and_then(|p| p.try_into().ok())
    }
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// SVG document.
    Svg,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            "image/svg+xml" => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

/// Decode raster bytes to RGBA.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<TextureData> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(TextureData {
        width,
        height,
        data: rgba.into_raw(),
        format,
    })
}

/// Decode a raster asset to RGBA.
///
/// # Errors
///
/// Returns an error for SVG assets, malformed payloads, or undecodable
/// image data.
pub fn load_asset(asset: &ImageAsset) -> RenderResult<TextureData> {
    if asset.is_svg() {
        return Err(RenderError::Resource("SVG assets must be rasterized".to_string()));
    }
    load_image_from_bytes(&asset.decode_bytes()?)
}

/// Pixel size of an asset without decoding its pixels.
///
/// SVG assets report their declared document size.
///
/// # Errors
///
/// Returns an error if the payload is malformed or the format is not
/// recognized.
pub fn asset_dimensions(asset: &ImageAsset, rasterizer: &Rasterizer) -> RenderResult<(u32, u32)> {
    let bytes = asset.decode_bytes()?;

    if asset.is_svg() {
        let text = String::from_utf8(bytes)
            .map_err(|e| RenderError::Resource(format!("SVG is not UTF-8: {e}")))?;
        let size = rasterizer.parse(&text)?.size().to_int_size();
        return Ok((size.width(), size.height()));
    }

    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RenderError::Resource(format!("Failed to read image: {e}")))?
        .into_dimensions()
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))
}

/// Encode a single-color PNG asset.
///
/// # Errors
///
/// Returns an error if PNG encoding fails.
pub fn solid_color_asset(width: u32, height: u32, rgba: [u8; 4]) -> RenderResult<ImageAsset> {
    let img = image::RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba(rgba));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;
    Ok(ImageAsset::png(&buf.into_inner()))
}
