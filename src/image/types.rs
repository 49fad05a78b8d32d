//! Core types for image generation.

use crate::error::{Result, TinderGenError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format. Only ever returned by the generator, never accepted as an upload.
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type reported by a vendor onto a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Whether the upload picker accepts this format.
    pub fn is_uploadable(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

/// Image provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// Google Gemini image models.
    Gemini,
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// A user-uploaded source photo, already checked to be JPEG or PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    data: Vec<u8>,
    format: ImageFormat,
    file_name: Option<String>,
}

impl UploadedImage {
    /// Accepts raw upload bytes if they carry a JPEG or PNG signature.
    pub fn from_bytes(data: Vec<u8>, file_name: Option<String>) -> Result<Self> {
        match ImageFormat::from_magic_bytes(&data) {
            Some(format) if format.is_uploadable() => Ok(Self {
                data,
                format,
                file_name,
            }),
            Some(format) => Err(TinderGenError::InvalidRequest(format!(
                "{} uploads are not supported, use JPEG or PNG",
                format.extension()
            ))),
            None => Err(TinderGenError::InvalidRequest(
                "upload is not a JPEG or PNG image".into(),
            )),
        }
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Detected format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Original file name, if the browser sent one.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Returns the image as a data URL for inline display.
    pub fn to_data_url(&self) -> String {
        data_url(self.format, &self.data)
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// How many inline image parts the vendor returned (only the first is kept).
    pub image_parts: usize,
}

/// A request to transform an uploaded photo with a prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The text prompt describing the desired result.
    pub prompt: String,
    /// The source photo.
    pub input_image: UploadedImage,
}

impl GenerationRequest {
    /// Creates a new request from a prompt and a source photo.
    pub fn new(prompt: impl Into<String>, input_image: UploadedImage) -> Self {
        Self {
            prompt: prompt.into(),
            input_image,
        }
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be rendered or saved"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Provider that generated this image.
    pub provider: ImageProviderKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(
        data: Vec<u8>,
        format: ImageFormat,
        provider: ImageProviderKind,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            data,
            format,
            provider,
            metadata,
        }
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        data_url(self.format, &self.data)
    }
}

fn data_url(format: ImageFormat, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PNG_MAGIC: [u8; 12] =
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    pub(crate) const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(
            ImageFormat::from_mime_type("image/PNG"),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_mime_type("image/jpeg"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn test_uploaded_image_accepts_png_and_jpeg() {
        let png = UploadedImage::from_bytes(PNG_MAGIC.to_vec(), Some("me.png".into())).unwrap();
        assert_eq!(png.format(), ImageFormat::Png);
        assert_eq!(png.file_name(), Some("me.png"));

        let jpeg = UploadedImage::from_bytes(JPEG_MAGIC.to_vec(), None).unwrap();
        assert_eq!(jpeg.format(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_uploaded_image_rejects_other_bytes() {
        assert!(UploadedImage::from_bytes(WEBP_MAGIC.to_vec(), None).is_err());
        assert!(UploadedImage::from_bytes(b"not an image at all".to_vec(), None).is_err());
        assert!(UploadedImage::from_bytes(Vec::new(), None).is_err());
    }

    #[test]
    fn test_data_url_prefix() {
        let png = UploadedImage::from_bytes(PNG_MAGIC.to_vec(), None).unwrap();
        assert!(png.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(ImageProviderKind::Gemini.to_string(), "gemini");
    }
}
