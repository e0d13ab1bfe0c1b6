//! Request body descriptions.
//!
//! The session manager may retry a request once after a token refresh, so
//! bodies must be rebuildable: `reqwest::multipart::Form` is consumed on
//! send and cannot be cloned. [`FormData`] holds a plain description of the
//! parts and materializes a fresh `Form` per attempt.
//!
//! Content-type handling follows the storefront rule: JSON bodies get
//! `application/json`, multipart bodies get the boundary header reqwest
//! derives - a JSON content type is never forced onto a form upload.

use reqwest::multipart::{Form, Part};
use serde::Serialize;

/// Body of an authenticated request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body (GET, DELETE, parameterless PUT).
    #[default]
    Empty,
    /// JSON payload; sets `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Multipart form payload; reqwest sets the boundary content type.
    Form(FormData),
}

impl RequestBody {
    /// Serialize a value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the value cannot be serialized.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

/// A rebuildable multipart form description.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

#[derive(Debug, Clone)]
enum FormValue {
    Text(String),
    File {
        bytes: Vec<u8>,
        file_name: String,
        content_type: String,
    },
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), FormValue::Text(value.into())));
        self
    }

    /// Append a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        self.fields.push((
            name.into(),
            FormValue::File {
                bytes,
                file_name: file_name.into(),
                content_type: content_type.into(),
            },
        ));
        self
    }

    /// Materialize a fresh `reqwest` form for one send attempt.
    pub(crate) fn to_form(&self) -> Form {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = match value {
                FormValue::Text(text) => form.text(name.clone(), text.clone()),
                FormValue::File {
                    bytes,
                    file_name,
                    content_type,
                } => {
                    let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                    // An unparseable mime falls back to an untyped part
                    let part = part
                        .mime_str(content_type)
                        .unwrap_or_else(|_| Part::bytes(bytes.clone()).file_name(file_name.clone()));
                    form.part(name.clone(), part)
                }
            };
        }
        form
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_from_value() {
        #[derive(Serialize)]
        struct Payload {
            name: &'static str,
        }

        let body = RequestBody::json(&Payload { name: "ada" }).unwrap();
        match body {
            RequestBody::Json(value) => assert_eq!(value["name"], "ada"),
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn test_form_data_is_rebuildable() {
        let form_data = FormData::new()
            .text("name", "Mug")
            .file("image", vec![1, 2, 3], "mug.jpg", "image/jpeg");

        // Two independent materializations from the same description
        let _first = form_data.to_form();
        let _second = form_data.to_form();
        assert!(!form_data.is_empty());
    }

    #[test]
    fn test_default_body_is_empty() {
        assert!(matches!(RequestBody::default(), RequestBody::Empty));
    }
}
