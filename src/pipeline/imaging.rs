//! Document image validation and preparation for OCR.
//!
//! Uploads arrive as raw bytes from a phone camera or a scanner. Before they
//! reach an OCR collaborator they are sniffed (PNG and JPEG only), decoded to
//! prove they are not truncated, and downscaled when the longest edge exceeds
//! the configured limit. Images that already fit are passed through untouched
//! so JPEG uploads are not re-encoded for nothing.

use crate::error::ExtractionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use tracing::debug;

/// An image that passed validation, ready to send to an OCR collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Vision-message attachment. `detail: "high"` keeps the fine print of
    /// the machine-readable zone legible to GPT-4-class models.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.to_base64(), self.mime_type).with_detail("high")
    }
}

/// Stable handle for a stored document image: `sha256:<hex digest>`.
pub fn content_handle(bytes: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(bytes))
}

/// Validate `bytes` and downscale if needed.
///
/// CPU-bound; call it from `spawn_blocking` on async paths.
pub fn prepare_image(
    bytes: &[u8],
    max_bytes: usize,
    max_pixels: u32,
) -> Result<PreparedImage, ExtractionError> {
    if bytes.is_empty() {
        return Err(invalid("image is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(invalid(format!(
            "image is {} bytes, limit is {} bytes",
            bytes.len(),
            max_bytes
        )));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| invalid("unrecognised image format (expected PNG or JPEG)"))?;
    let mime_type = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        other => {
            return Err(invalid(format!(
                "unsupported image format {other:?} (expected PNG or JPEG)"
            )))
        }
    };

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| invalid(format!("could not decode image: {e}")))?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(invalid("image has no pixels"));
    }

    if width.max(height) <= max_pixels {
        debug!("Image {}x{} {} accepted as-is", width, height, mime_type);
        return Ok(PreparedImage {
            bytes: bytes.to_vec(),
            mime_type,
            width,
            height,
        });
    }

    let resized = downscale(&img, max_pixels);
    let png = encode_png(&resized)?;
    debug!(
        "Image {}x{} downscaled to {}x{} ({} bytes PNG)",
        width,
        height,
        resized.width(),
        resized.height(),
        png.len()
    );
    Ok(PreparedImage {
        bytes: png,
        mime_type: "image/png",
        width: resized.width(),
        height: resized.height(),
    })
}

fn downscale(img: &DynamicImage, max_pixels: u32) -> DynamicImage {
    // `resize` preserves the aspect ratio within the bounding box.
    img.resize(max_pixels, max_pixels, FilterType::Lanczos3)
}

// PNG: lossless, so re-encoding does not add artefacts around glyphs.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| invalid(format!("could not re-encode image: {e}")))?;
    Ok(buf)
}

fn invalid(reason: impl Into<String>) -> ExtractionError {
    ExtractionError::InvalidImage {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        ));
        encode_png(&img).expect("encode should succeed")
    }

    #[test]
    fn small_png_passes_through() {
        let bytes = png(10, 20);
        let prepared = prepare_image(&bytes, 1 << 20, 2000).unwrap();
        assert_eq!(prepared.mime_type, "image/png");
        assert_eq!((prepared.width, prepared.height), (10, 20));
        assert_eq!(prepared.bytes, bytes);
    }

    #[test]
    fn large_image_is_downscaled() {
        let bytes = png(400, 200);
        let prepared = prepare_image(&bytes, 1 << 20, 100).unwrap();
        assert_eq!((prepared.width, prepared.height), (100, 50));
        assert_eq!(prepared.mime_type, "image/png");
    }

    #[test]
    fn empty_and_garbage_are_rejected() {
        assert!(matches!(
            prepare_image(&[], 1024, 100),
            Err(ExtractionError::InvalidImage { .. })
        ));
        assert!(matches!(
            prepare_image(b"definitely not an image", 1024, 100),
            Err(ExtractionError::InvalidImage { .. })
        ));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let bytes = png(50, 50);
        let err = prepare_image(&bytes[..bytes.len() / 2], 1 << 20, 2000).unwrap_err();
        assert!(err.to_string().contains("decode"), "got: {err}");
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let bytes = png(50, 50);
        let err = prepare_image(&bytes, 8, 2000).unwrap_err();
        assert!(err.to_string().contains("limit"), "got: {err}");
    }

    #[test]
    fn image_data_is_base64_with_high_detail() {
        let prepared = prepare_image(&png(4, 4), 1 << 20, 2000).unwrap();
        let data = prepared.to_image_data();
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&data.data).unwrap(), prepared.bytes);
    }

    #[test]
    fn handle_is_stable_sha256() {
        assert_eq!(
            content_handle(b"abc"),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(content_handle(b"abc"), content_handle(b"abd"));
    }
}
