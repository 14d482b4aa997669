use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

/// A meal photo decoded from a `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealPhoto {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PhotoError {
    #[error("Image data is missing.")]
    Missing,
    #[error("Photo must be a data URI of the form 'data:<mimetype>;base64,<encoded_data>'.")]
    NotDataUri,
    #[error("Unsupported image type '{0}'.")]
    UnsupportedType(String),
    #[error("Photo payload is not valid base64.")]
    InvalidBase64,
}

impl MealPhoto {
    pub fn from_data_uri(uri: &str) -> Result<Self, PhotoError> {
        lazy_static! {
            static ref DATA_URI_RE: Regex =
                Regex::new(r"^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+);base64,(.*)$").unwrap();
        }
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(PhotoError::Missing);
        }
        let caps = DATA_URI_RE.captures(uri).ok_or(PhotoError::NotDataUri)?;
        let mime_type = caps[1].to_ascii_lowercase();
        if !is_supported_image(&mime_type) {
            return Err(PhotoError::UnsupportedType(mime_type));
        }
        let data = STANDARD
            .decode(&caps[2])
            .map_err(|_| PhotoError::InvalidBase64)?;
        if data.is_empty() {
            return Err(PhotoError::Missing);
        }
        Ok(Self {
            mime_type,
            data: Bytes::from(data),
        })
    }

    /// Builds a photo from raw upload bytes, e.g. a multipart field.
    pub fn from_upload(body: Bytes, content_type: &str) -> Result<Self, PhotoError> {
        let mime_type = content_type.trim().to_ascii_lowercase();
        if body.is_empty() {
            return Err(PhotoError::Missing);
        }
        if !is_supported_image(&mime_type) {
            return Err(PhotoError::UnsupportedType(mime_type));
        }
        Ok(Self {
            mime_type,
            data: body,
        })
    }

    pub fn to_data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.data)
    }
}

pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

fn is_supported_image(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/heic" | "image/heif"
    )
}
