//! Upload → transmission-ready image.

use base64::Engine;
use sanjeevani_core::{EncodedImage, ScanError};
use tracing::debug;

use crate::mime_detect::{is_image, sniff_mime_type};

/// Generic types browsers send when they don't know better.
const GENERIC_TYPES: &[&str] = &["", "application/octet-stream", "binary/octet-stream"];

/// Validates an uploaded image and encodes it for a vision model.
///
/// Pure: no IO, no state beyond the size limit.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    max_bytes: usize,
}

impl ImageNormalizer {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Resolve the media type and base64-encode the bytes.
    ///
    /// Magic bytes win over the declared type; the declared type is used only
    /// when sniffing finds nothing.
    pub fn normalize(&self, bytes: &[u8], declared: Option<&str>) -> Result<EncodedImage, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::MissingInput("no image provided".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ScanError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let declared = declared
            .map(|d| d.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|d| !GENERIC_TYPES.contains(&d.as_str()));

        let mime_type = match (sniff_mime_type(bytes), declared) {
            (Some(sniffed), _) => sniffed.to_string(),
            (None, Some(declared)) => declared,
            (None, None) => {
                return Err(ScanError::InvalidInput("could not determine image type".into()));
            }
        };

        if !is_image(&mime_type) {
            return Err(ScanError::InvalidInput(format!(
                "expected an image, got {mime_type}"
            )));
        }

        debug!(mime = %mime_type, size = bytes.len(), "Normalized image");
        Ok(EncodedImage {
            mime_type,
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn encodes_jpeg() {
        let image = ImageNormalizer::new(1024).normalize(JPEG, Some("image/jpeg")).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64, "/9j/4AAQ");
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn empty_is_missing_input() {
        let err = ImageNormalizer::new(1024).normalize(&[], None).unwrap_err();
        assert!(matches!(err, ScanError::MissingInput(_)));
    }

    #[test]
    fn oversize_is_rejected() {
        let err = ImageNormalizer::new(4).normalize(JPEG, None).unwrap_err();
        assert!(matches!(err, ScanError::TooLarge { size: 6, limit: 4 }));
    }

    #[test]
    fn non_image_is_invalid_input() {
        let err = ImageNormalizer::new(1024)
            .normalize(b"%PDF-1.4 ...", Some("image/png"))
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));

        let err = ImageNormalizer::new(1024)
            .normalize(b"just text", Some("text/plain"))
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn declared_type_used_when_unsniffable() {
        let image = ImageNormalizer::new(1024)
            .normalize(b"\0\0\0\0raw", Some("image/x-raw; q=1"))
            .unwrap();
        assert_eq!(image.mime_type, "image/x-raw");
    }

    #[test]
    fn generic_declared_type_is_ignored() {
        let err = ImageNormalizer::new(1024)
            .normalize(b"\0\0\0\0raw", Some("application/octet-stream"))
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }
}
