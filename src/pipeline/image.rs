//! Raster re-encoding: decode → pixel surface → encode.
//!
//! The codec sits behind the [`ImageCodec`] trait so the pipeline never
//! touches a concrete image library. [`ImageCrateCodec`] is the production
//! implementation over the `image` crate.
//!
//! Decoding and encoding are CPU-bound, so [`convert_image`] runs them in
//! `spawn_blocking`; from the caller's side each is a plain `.await`.

use crate::error::ConvertError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::RgbaImage;
use std::sync::Arc;
use tracing::debug;

/// Target raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    Png,
    Jpeg,
}

impl ImageTarget {
    pub fn name(self) -> &'static str {
        match self {
            ImageTarget::Png => "PNG",
            ImageTarget::Jpeg => "JPEG",
        }
    }
}

/// Decoded image at its natural dimensions, 8-bit RGBA.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decode/encode capability.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PixelSurface, ConvertError>;

    /// `quality` is 1–100 and only meaningful for lossy targets.
    fn encode(
        &self,
        surface: &PixelSurface,
        target: ImageTarget,
        quality: u8,
    ) -> Result<Vec<u8>, ConvertError>;
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelSurface, ConvertError> {
        let img = image::load_from_memory(bytes).map_err(|e| ConvertError::ImageDecode {
            detail: e.to_string(),
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(PixelSurface {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    fn encode(
        &self,
        surface: &PixelSurface,
        target: ImageTarget,
        quality: u8,
    ) -> Result<Vec<u8>, ConvertError> {
        let encode_err = |detail: String| ConvertError::ImageEncode {
            format: target.name().to_string(),
            detail,
        };

        let rgba = RgbaImage::from_raw(surface.width, surface.height, surface.rgba.clone())
            .ok_or_else(|| encode_err("pixel buffer does not match dimensions".into()))?;

        let mut buf = Vec::new();
        match target {
            ImageTarget::Png => rgba
                .write_with_encoder(PngEncoder::new(&mut buf))
                .map_err(|e| encode_err(e.to_string()))?,
            ImageTarget::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                    .map_err(|e| encode_err(e.to_string()))?
            }
        }

        if buf.is_empty() {
            return Err(encode_err("encoder produced no output".into()));
        }
        Ok(buf)
    }
}

/// Re-encode `bytes` as `target`. A single attempt; any failure is final.
pub async fn convert_image(
    codec: Arc<dyn ImageCodec>,
    bytes: Arc<[u8]>,
    target: ImageTarget,
    quality: u8,
) -> Result<Vec<u8>, ConvertError> {
    let decoder = codec.clone();
    let surface = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
        .await
        .map_err(|e| ConvertError::Unknown(format!("Image decode task panicked: {e}")))??;
    debug!("Decoded image {}x{}", surface.width, surface.height);

    let out = tokio::task::spawn_blocking(move || codec.encode(&surface, target, quality))
        .await
        .map_err(|e| ConvertError::Unknown(format!("Image encode task panicked: {e}")))??;
    debug!("Encoded {} → {} bytes", target.name(), out.len());

    Ok(out)
}
