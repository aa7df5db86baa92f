use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hex;
use sha2::{Digest, Sha256};

/// Largest decoded image the hosted model accepts as inline data.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ImageReferenceError {
    #[error("Image data is empty")]
    Empty,
    #[error("Image data is not a data URI")]
    NotDataUri,
    #[error("Data URI is not base64 encoded")]
    NotBase64Encoded,
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Invalid base64 payload")]
    InvalidPayload,
    #[error("Image too large")]
    TooLarge,
}

/// An encoded still image taken from a `data:<mime>;base64,<payload>` URI.
/// The payload is kept exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReference {
    mime_type: String,
    payload: String,
}

impl ImageReference {
    pub fn parse(data_uri: &str) -> Result<Self, ImageReferenceError> {
        let data_uri = data_uri.trim();
        if data_uri.is_empty() {
            return Err(ImageReferenceError::Empty);
        }

        let rest = data_uri
            .strip_prefix("data:")
            .ok_or(ImageReferenceError::NotDataUri)?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(ImageReferenceError::NotDataUri)?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().to_ascii_lowercase();
        if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(ImageReferenceError::NotBase64Encoded);
        }
        Self::check_media_type(&mime_type)?;

        if payload.is_empty() {
            return Err(ImageReferenceError::Empty);
        }
        if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
            return Err(ImageReferenceError::TooLarge);
        }
        let decoded = STANDARD
            .decode(payload)
            .map_err(|_| ImageReferenceError::InvalidPayload)?;
        if decoded.is_empty() {
            return Err(ImageReferenceError::Empty);
        }
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(ImageReferenceError::TooLarge);
        }

        Ok(Self {
            mime_type,
            payload: payload.to_string(),
        })
    }

    fn check_media_type(mime_type: &str) -> Result<(), ImageReferenceError> {
        match mime_type {
            "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif" => Ok(()),
            _ => Err(ImageReferenceError::UnsupportedMediaType(
                mime_type.to_string(),
            )),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 text as it appeared in the data URI.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Short SHA-256 fingerprint of the payload, safe to put in logs.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.payload.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(16);
        digest
    }
}
