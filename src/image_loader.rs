//! # Image Loading and Decoding
//!
//! Images reach the layout engine as already-loaded bytes. This module does
//! the two jobs around that: resolving a JSON `src` (data URI, file path or
//! raw base64) to bytes when the report is read, and decoding those bytes for
//! PDF embedding when an image is drawn.
//!
//! JPEG images pass through without re-encoding (DCTDecode). PNG images are
//! decoded to RGB pixels with a separate alpha channel for SMask transparency.

use std::io::Cursor;

use serde::{Deserialize, Deserializer};

use crate::error::CanvasError;

/// A decoded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded as-is.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl JpegColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            JpegColorSpace::DeviceRGB => "DeviceRGB",
            JpegColorSpace::DeviceGray => "DeviceGray",
        }
    }
}

/// Serde adapter for `ImageEntry::data`: reads a source string and resolves
/// it to bytes.
///
/// A source that can't be resolved yields empty bytes rather than failing
/// the whole report; the image then renders as a placeholder.
pub fn deserialize_source<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let src = String::deserialize(deserializer)?;
    match read_source_bytes(&src) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            log::warn!("{e}");
            Ok(Vec::new())
        }
    }
}

/// Resolve a source string to raw image bytes.
///
/// Supported formats:
/// - `data:image/...;base64,...` data URI
/// - File path starting with `/`, `./` or `../`
/// - Raw base64-encoded image data
pub fn read_source_bytes(src: &str) -> Result<Vec<u8>, CanvasError> {
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| CanvasError::Image("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit path prefixes count as paths; base64 may contain '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| CanvasError::Image(format!("failed to read image file '{src}': {e}")));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, CanvasError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| CanvasError::Image(format!("base64 decode error: {e}")))
}

/// Read pixel dimensions from the image header without decoding pixels.
pub fn probe_dimensions(data: &[u8]) -> Result<(u32, u32), CanvasError> {
    check_format(data)?;
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CanvasError::Image(format!("format detection error: {e}")))?
        .into_dimensions()
        .map_err(|e| CanvasError::Image(format!("failed to read image dimensions: {e}")))
}

/// Detect the format from magic bytes and decode accordingly.
pub fn load_image(data: &[u8]) -> Result<LoadedImage, CanvasError> {
    check_format(data)?;
    if is_jpeg(data) {
        decode_jpeg(data)
    } else {
        decode_png(data)
    }
}

/// Accept JPEG and PNG, reject everything else.
pub fn check_format(data: &[u8]) -> Result<(), CanvasError> {
    if data.len() < 4 {
        return Err(CanvasError::Image("image data too short".to_string()));
    }
    if is_jpeg(data) || is_png(data) {
        Ok(())
    } else {
        Err(CanvasError::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ))
    }
}

pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

pub fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: read dimensions and color space only. The bytes pass through.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, CanvasError> {
    let (width, height) = probe_dimensions(data)?;
    let color_space = detect_jpeg_color_space(data);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space,
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers for the SOF segment and read its component count.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // skip SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            // length(2) + precision(1) + height(2) + width(2) + components(1)
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// PNG: decode to RGBA, split into RGB + alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, CanvasError> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CanvasError::Image(format!("PNG format detection error: {e}")))?
        .decode()
        .map_err(|e| CanvasError::Image(format!("failed to decode PNG: {e}")))?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        if pixel[3] != 255 {
            has_transparency = true;
        }
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), w, h, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn test_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(load_image(&[0x00, 0x01]).is_err());
        assert!(load_image(b"not an image at all").is_err());
        assert!(probe_dimensions(b"GIF89a...").is_err());
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(read_source_bytes("data:image/png;base64").is_err());
    }

    #[test]
    fn test_probe_png_dimensions() {
        let buf = png_bytes(4, 3, [0, 0, 255, 255]);
        assert_eq!(probe_dimensions(&buf).unwrap(), (4, 3));
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let buf = png_bytes(1, 1, [255, 0, 0, 128]);
        let loaded = load_image(&buf).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert_eq!(alpha.as_deref(), Some(&[128u8][..]));
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_opaque_png_has_no_alpha() {
        let buf = png_bytes(2, 2, [10, 20, 30, 255]);
        match load_image(&buf).unwrap().pixel_data {
            ImagePixelData::Decoded { alpha, .. } => assert!(alpha.is_none()),
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_jpeg_passthrough() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = load_image(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert_eq!(data, &buf);
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_data_uri_source() {
        use base64::Engine;
        let buf = png_bytes(1, 1, [0, 255, 0, 255]);
        let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
        let bytes = read_source_bytes(&format!("data:image/png;base64,{b64}")).unwrap();
        assert_eq!(bytes, buf);
        assert_eq!(read_source_bytes(&b64).unwrap(), buf);
    }

    #[test]
    fn test_unresolvable_source_deserializes_empty() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_source")]
            src: Vec<u8>,
        }
        let h: Holder = serde_json::from_str(r#"{"src": "./does/not/exist.png"}"#).unwrap();
        assert!(h.src.is_empty());
    }
}
