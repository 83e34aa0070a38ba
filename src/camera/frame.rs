use crate::common::{ConsoleError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageBuffer, Luma, RgbImage};
use std::path::Path;

pub const JPEG_MIME: &str = "image/jpeg";

/// A JPEG-encoded still at the source's native resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn encode(image: &DynamicImage, quality: u8) -> Result<Self> {
        let rgb = image.to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;

        Ok(Self {
            jpeg,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    /// Read any format `image` understands and re-encode it as JPEG.
    pub fn from_file(path: &Path, quality: u8) -> Result<Self> {
        let image = image::open(path)?;
        tracing::debug!(
            "Loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Self::encode(&image, quality)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME, STANDARD.encode(&self.jpeg))
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.jpeg)?)
    }
}

/// A parsed `data:<mime>;base64,<payload>` URI. Bare base64 is accepted too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn parse(input: &str) -> Result<Self> {
        let (mime, payload) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    ConsoleError::InvalidResponse("data URI without payload".into())
                })?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    ConsoleError::InvalidResponse(format!("data URI is not base64: {}", header))
                })?;
                (Some(mime.to_string()).filter(|m| !m.is_empty()), payload)
            }
            None => (None, input),
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ConsoleError::InvalidResponse(format!("bad base64 image: {}", e)))?;

        Ok(Self { mime, bytes })
    }

    pub fn decode_image(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }
}

pub fn grey_to_image(data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let needed = (width * height) as usize;
    let pixels = data.get(..needed)
        .ok_or_else(|| ConsoleError::Camera("Short grayscale frame".into()))?;
    let img_buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| ConsoleError::Camera("Failed to create grayscale image buffer".into()))?;

    Ok(DynamicImage::ImageLuma8(img_buffer))
}

/// Packed YUYV 4:2:2 (two pixels per four bytes) to RGB.
pub fn yuyv_to_image(data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let needed = (width * height * 2) as usize;
    let packed = data.get(..needed)
        .ok_or_else(|| ConsoleError::Camera("Short YUYV frame".into()))?;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in packed.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }

    let buffer = RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| ConsoleError::Camera("Failed to create RGB image buffer".into()))?;
    Ok(DynamicImage::ImageRgb8(buffer))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as f32 - 16.0;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;

    let r = 1.164 * c + 1.596 * e;
    let g = 1.164 * c - 0.392 * d - 0.813 * e;
    let b = 1.164 * c + 2.017 * d;

    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
