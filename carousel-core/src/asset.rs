//! Self-contained raster/vector asset references.
//!
//! Every image that flows through the carousel (backgrounds, stickers,
//! composited output) is carried as a `data:` URL so it can be embedded,
//! serialized, and handed to a download sink without touching the filesystem.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{CarouselError, CarouselResult};

/// An owned, self-describing encoded image (`data:<mime>;base64,<payload>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageAsset(String);

impl ImageAsset {
    /// Wrap an existing data URL.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::InvalidAsset`] if the string is not a data URL
    /// with a payload separator.
    pub fn from_data_url(url: impl Into<String>) -> CarouselResult<Self> {
        let url = url.into();
        if !url.starts_with("data:") {
            return Err(CarouselError::InvalidAsset("Not a data URL".to_string()));
        }
        if !url.contains(',') {
            return Err(CarouselError::InvalidAsset(
                "Invalid data URL: missing comma".to_string(),
            ));
        }
        Ok(Self(url))
    }

    /// Accept either a data URL or a bare base64 payload.
    ///
    /// The generation pipeline sometimes returns raw base64; those are
    /// assumed to be PNG.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("data:") && trimmed.contains(',') {
            Self(trimmed.to_string())
        } else {
            Self(format!("data:image/png;base64,{trimmed}"))
        }
    }

    /// Encode raw bytes with the given MIME type.
    #[must_use]
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(format!("data:{mime};base64,{encoded}"))
    }

    /// Encode PNG bytes.
    #[must_use]
    pub fn png(bytes: &[u8]) -> Self {
        Self::from_bytes("image/png", bytes)
    }

    /// Encode an SVG document.
    #[must_use]
    pub fn svg(document: &str) -> Self {
        Self::from_bytes("image/svg+xml", document.as_bytes())
    }

    /// The full data URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type declared in the header, e.g. `image/png`.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        let header = self.header();
        header.split(';').next().unwrap_or_default()
    }

    /// Whether the payload is an SVG document.
    #[must_use]
    pub fn is_svg(&self) -> bool {
        self.mime_type().eq_ignore_ascii_case("image/svg+xml")
    }

    /// Decode the payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::InvalidAsset`] if the payload is not valid
    /// base64 or percent-encoding.
    pub fn decode_bytes(&self) -> CarouselResult<Vec<u8>> {
        let payload = self.payload();
        if self.header().contains(";base64") {
            base64::engine::general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| CarouselError::InvalidAsset(format!("Failed to decode base64: {e}")))
        } else {
            percent_decode(payload)
        }
    }

    fn header(&self) -> &str {
        let rest = self.0.strip_prefix("data:").unwrap_or(&self.0);
        rest.split_once(',').map_or(rest, |(header, _)| header)
    }

    fn payload(&self) -> &str {
        self.0.split_once(',').map_or("", |(_, payload)| payload)
    }
}

impl std::fmt::Display for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Payloads are large; show the header only.
        write!(f, "data:{}", self.header())
    }
}

fn percent_decode(input: &str) -> CarouselResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| CarouselError::InvalidAsset("Invalid URL encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_round_trip_through_base64() {
        let asset = ImageAsset::svg("<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
        assert!(asset.as_str().starts_with("data:image/svg+xml;base64,"));
        assert!(asset.is_svg());
        let bytes = asset.decode_bytes().expect("decode");
        assert_eq!(bytes, b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
    }

    #[test]
    fn test_normalize_bare_base64() {
        let asset = ImageAsset::normalize("iVBORw0KGgo=");
        assert_eq!(asset.as_str(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(asset.mime_type(), "image/png");
    }

    #[test]
    fn test_normalize_keeps_data_url() {
        let asset = ImageAsset::normalize("data:image/jpeg;base64,/9j/");
        assert_eq!(asset.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_percent_encoded_payload() {
        let asset = ImageAsset::from_data_url("data:image/svg+xml,%3Csvg%2F%3E").expect("url");
        assert_eq!(asset.decode_bytes().expect("decode"), b"<svg/>");
    }

    #[test]
    fn test_invalid_data_url() {
        assert!(ImageAsset::from_data_url("not a data uri").is_err());
        assert!(ImageAsset::from_data_url("data:image/png").is_err());
        let broken = ImageAsset::from_data_url("data:text/plain,%zz").expect("url");
        assert!(broken.decode_bytes().is_err());
    }

    #[test]
    fn test_display_omits_payload() {
        let asset = ImageAsset::png(&[1, 2, 3]);
        assert_eq!(asset.to_string(), "data:image/png;base64");
    }
}
