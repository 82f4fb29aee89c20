use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;

use crate::llm::media::detect_mime_type;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Not a base64 data URI")]
    NotDataUri,
    #[error("Data URI is missing a media type")]
    MissingMimeType,
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Could not decode image: {0}")]
    Undecodable(#[from] image::ImageError),
}

/// An encoded image carried inline as base64 plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encodes raw bytes, preferring the sniffed media type over `mime_hint`.
    pub fn from_bytes(bytes: &[u8], mime_hint: Option<&str>) -> Self {
        let mime_type = detect_mime_type(bytes)
            .filter(|mime| mime.starts_with("image/"))
            .or_else(|| {
                mime_hint
                    .map(|hint| hint.trim().to_ascii_lowercase())
                    .filter(|hint| hint.starts_with("image/"))
            })
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        Self {
            mime_type,
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, PayloadError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or(PayloadError::NotDataUri)?;
        let (header, data) = rest.split_once(',').ok_or(PayloadError::NotDataUri)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(PayloadError::NotDataUri)?
            .trim();
        if mime_type.is_empty() {
            return Err(PayloadError::MissingMimeType);
        }
        Ok(Self::new(mime_type.to_ascii_lowercase(), data.trim()))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(general_purpose::STANDARD.decode(self.data.as_bytes())?)
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }

    /// Length of the raw image in bytes, estimated from the base64 text.
    pub fn approx_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

/// Confirms the bytes are a PNG, JPEG or WebP image the decoder can read.
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat, PayloadError> {
    let format = image::guess_format(bytes)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP
    ) {
        return Err(PayloadError::UnsupportedFormat(format!("{format:?}")));
    }
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format)
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    use std::io::Cursor;

    let buffer = image::RgbImage::from_pixel(4, 4, image::Rgb([20, 40, 60]));
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(buffer)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_uri_into_mime_and_payload() {
        let payload = ImagePayload::from_data_uri("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.data, "AAAA");
        assert_eq!(payload.to_data_uri(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn rejects_uris_without_base64_marker_or_mime() {
        assert!(matches!(
            ImagePayload::from_data_uri("https://example.com/a.png"),
            Err(PayloadError::NotDataUri)
        ));
        assert!(matches!(
            ImagePayload::from_data_uri("data:image/png,AAAA"),
            Err(PayloadError::NotDataUri)
        ));
        assert!(matches!(
            ImagePayload::from_data_uri("data:;base64,AAAA"),
            Err(PayloadError::MissingMimeType)
        ));
    }

    #[test]
    fn from_bytes_sniffs_png_over_hint() {
        let png = sample_png();
        let payload = ImagePayload::from_bytes(&png, Some("image/jpeg"));
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.decode().unwrap(), png);
    }

    #[test]
    fn from_bytes_falls_back_to_hint_then_png() {
        let payload = ImagePayload::from_bytes(b"not an image", Some("IMAGE/WEBP"));
        assert_eq!(payload.mime_type, "image/webp");
        let payload = ImagePayload::from_bytes(b"not an image", Some("text/plain"));
        assert_eq!(payload.mime_type, DEFAULT_IMAGE_MIME);
    }

    #[test]
    fn file_extension_follows_mime_type() {
        assert_eq!(ImagePayload::new("image/jpeg", "").file_extension(), "jpg");
        assert_eq!(ImagePayload::new("image/png", "").file_extension(), "png");
        assert_eq!(ImagePayload::new("image/gif", "").file_extension(), "png");
    }

    #[test]
    fn validates_decodable_png() {
        assert_eq!(validate_image(&sample_png()).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(validate_image(b"definitely not an image").is_err());
    }

    #[test]
    fn decode_reports_invalid_base64() {
        let payload = ImagePayload::new("image/png", "***");
        assert!(matches!(payload.decode(), Err(PayloadError::InvalidBase64(_))));
    }
}
