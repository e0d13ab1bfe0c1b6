//! Product catalog types.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error decoding a product's inline image payload.
#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A catalog product as returned by `GET /products`.
///
/// The backend inlines the product image as a base64 string in the listing
/// payload; [`Product::image_bytes`] decodes it on demand. Products without a
/// category are grouped under `GENERAL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn default_category() -> String {
    "GENERAL".to_string()
}

impl Product {
    /// Decode the inline base64 image, if the listing carried one.
    ///
    /// # Errors
    ///
    /// Returns `ImageDecodeError` if the payload is present but not valid
    /// base64.
    pub fn image_bytes(&self) -> Result<Option<Vec<u8>>, ImageDecodeError> {
        self.image
            .as_deref()
            .map(|data| BASE64.decode(data))
            .transpose()
            .map_err(ImageDecodeError::from)
    }
}

/// Raw image bytes attached to a product upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl ProductImage {
    /// Convenience constructor for a JPEG upload.
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            content_type: "image/jpeg".to_string(),
        }
    }
}

/// A product submitted through the admin upload form.
///
/// Sent as multipart form data (`name`, `description`, `price`, `image`),
/// never as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: ProductImage,
}
