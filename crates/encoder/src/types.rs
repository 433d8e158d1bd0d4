//! Encoder input types.

use imgsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Input type class sharing one embedding space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Image,
    Text,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image container formats recognised from their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
}

impl ImageFormat {
    /// Sniff the format from magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else if bytes.starts_with(b"BM") && bytes.len() >= 26 {
            Some(ImageFormat::Bmp)
        } else {
            None
        }
    }

    /// Extensions accepted during directory discovery.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::WebP),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }
}

/// Raw encoded image bytes, as read from disk.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the container signature.
    ///
    /// Fails with `AppError::Input` for empty bytes or an unrecognised
    /// signature. Only the leading magic bytes are inspected: a truncated or
    /// otherwise damaged file with a valid header passes, and is left for the
    /// model server to reject.
    pub fn format(&self) -> AppResult<ImageFormat> {
        if self.bytes.is_empty() {
            return Err(AppError::Input("Image is empty".to_string()));
        }
        ImageFormat::detect(&self.bytes).ok_or_else(|| {
            AppError::Input(format!(
                "Unrecognised or corrupt image ({} bytes)",
                self.bytes.len()
            ))
        })
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Smallest byte sequence that passes PNG signature validation.
    pub fn png_bytes(seed: u8) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend((0..64u8).map(|i| i.wrapping_mul(seed).wrapping_add(seed)));
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_formats() {
        assert_eq!(
            ImageFormat::detect(&fixtures::png_bytes(1)),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::detect(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::detect(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::detect(b"not an image"), None);
    }

    #[test]
    fn test_corrupt_image_is_input_error() {
        let input = ImageInput::new(b"garbage".to_vec());
        assert!(matches!(input.format(), Err(AppError::Input(_))));

        let empty = ImageInput::new(Vec::new());
        assert!(matches!(empty.format(), Err(AppError::Input(_))));
    }

    #[test]
    fn test_truncated_image_passes_signature_check() {
        let header_only = ImageInput::new(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(header_only.format().unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(
            ImageFormat::from_extension(Path::new("a/b/cat.JPG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_extension(Path::new("notes.txt")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("README")), None);
    }

    #[test]
    fn test_modality_round_trip() {
        assert_eq!(Modality::Text.to_string(), "text");
        assert_eq!(serde_json::to_value(Modality::Image).unwrap(), "image");
    }
}
