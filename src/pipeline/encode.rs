//! Image encoding: [`RasterPage`] → JPEG bytes.
//!
//! Pages arrive as straight RGBA8. JPEG has no alpha channel, so every pixel
//! is composited onto white before encoding; pdfium renders on an opaque white
//! background already, making this a no-op for ordinary pages.

use crate::pipeline::render::RasterPage;
use image::codecs::jpeg::JpegEncoder as JpegCodec;
use image::ExtendedColorType;
use thiserror::Error;
use tracing::debug;

/// MIME type of every artifact produced by [`JpegEncoder`].
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// An encoded page ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// A raster page that cannot be encoded.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("page has zero dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, {width}x{height} RGBA needs {expected}")]
    BufferLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Turns one raster page into a compressed artifact.
pub trait ImageEncoder: Send + Sync {
    /// Encode `page` at `quality`.
    ///
    /// Implementations map `quality` onto their codec's range; for
    /// [`JpegEncoder`] that is 1 to 100, so 0 encodes as 1 and anything
    /// above 100 encodes as 100.
    fn encode(&self, page: &RasterPage, quality: u8) -> Result<EncodedArtifact, EncodeError>;
}

/// Baseline JPEG encoder backed by the `image` crate.
///
/// Quality is clamped to `1..=100` before it reaches the codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn encode(&self, page: &RasterPage, quality: u8) -> Result<EncodedArtifact, EncodeError> {
        let (width, height) = (page.width(), page.height());
        if width == 0 || height == 0 {
            return Err(EncodeError::ZeroDimensions { width, height });
        }
        let expected = page.expected_len();
        if expected != Some(page.pixels().len()) {
            return Err(EncodeError::BufferLength {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: page.pixels().len(),
            });
        }

        let rgb = flatten_onto_white(page.pixels());
        let mut bytes = Vec::new();
        JpegCodec::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode(
            &rgb,
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;

        debug!(
            "Encoded page {} ({}x{}) → {} bytes JPEG",
            page.page_num(),
            width,
            height,
            bytes.len()
        );

        Ok(EncodedArtifact {
            bytes,
            content_type: JPEG_CONTENT_TYPE,
        })
    }
}

/// Drop alpha from straight RGBA8 by compositing over opaque white.
fn flatten_onto_white(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = px[3] as u32;
        for &c in &px[..3] {
            let blended = (c as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RasterPage {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        RasterPage::new(1, width, height, pixels)
    }

    #[test]
    fn encode_small_image() {
        let artifact = JpegEncoder
            .encode(&solid(10, 8, [255, 0, 0, 255]), 100)
            .expect("encode should succeed");
        assert_eq!(artifact.content_type, "image/jpeg");
        assert_eq!(&artifact.bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");

        let decoded = image::load_from_memory(&artifact.bytes).expect("valid JPEG");
        assert_eq!(decoded.dimensions(), (10, 8));
        let px = decoded.to_rgb8().get_pixel(5, 4).0;
        assert!(px[0] > 240 && px[1] < 15 && px[2] < 15, "got {px:?}");
    }

    #[test]
    fn same_input_same_bytes() {
        let page = solid(16, 16, [10, 200, 30, 255]);
        let a = JpegEncoder.encode(&page, 100).unwrap();
        let b = JpegEncoder.encode(&page, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quality_zero_is_accepted() {
        let artifact = JpegEncoder.encode(&solid(4, 4, [0, 0, 0, 255]), 0).unwrap();
        assert!(image::load_from_memory(&artifact.bytes).is_ok());
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        let page = solid(8, 8, [90, 120, 200, 255]);
        let zero = JpegEncoder.encode(&page, 0).unwrap();
        let one = JpegEncoder.encode(&page, 1).unwrap();
        assert_eq!(zero, one);

        let max = JpegEncoder.encode(&page, u8::MAX).unwrap();
        let hundred = JpegEncoder.encode(&page, 100).unwrap();
        assert_eq!(max, hundred);
        assert!(image::load_from_memory(&max.bytes).is_ok());
    }

    #[test]
    fn rejects_zero_dimensions() {
        let page = RasterPage::new(3, 0, 10, Vec::new());
        assert!(matches!(
            JpegEncoder.encode(&page, 100),
            Err(EncodeError::ZeroDimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn rejects_short_buffer() {
        let page = RasterPage::new(1, 4, 4, vec![0; 4 * 4 * 4 - 1]);
        match JpegEncoder.encode(&page, 100) {
            Err(EncodeError::BufferLength {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 64);
                assert_eq!(actual, 63);
            }
            other => panic!("expected BufferLength, got {other:?}"),
        }
    }

    #[test]
    fn transparent_pixels_become_white() {
        assert_eq!(flatten_onto_white(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(flatten_onto_white(&[12, 34, 56, 255]), vec![12, 34, 56]);
    }
}
