//! Session credential types.
//!
//! Tokens are opaque bearer strings. In memory they are wrapped in
//! [`SecretString`] so accidental `Debug`/log output never leaks them; the
//! storage layer exposes them explicitly when persisting.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// The credential pair owned by the session manager.
///
/// Created on successful login, the access token is overwritten in place by
/// silent refresh, and the whole pair is destroyed on logout or an
/// irrecoverable refresh failure.
///
/// Implements `Debug` manually to redact token material.
#[derive(Clone)]
pub struct CredentialPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub customer_id: String,
    pub username: String,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("customer_id", &self.customer_id)
            .field("username", &self.username)
            .finish()
    }
}

impl CredentialPair {
    /// Expose the access token for an outgoing `Authorization` header.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Expose the refresh token for a refresh request body.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }
}

/// Wire response of `POST /auth/login`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub customer_id: String,
    pub username: String,
}

impl From<LoginResponse> for CredentialPair {
    fn from(response: LoginResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: SecretString::from(response.refresh_token),
            customer_id: response.customer_id,
            username: response.username,
        }
    }
}

/// Wire response of `POST /auth/refresh`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = CredentialPair {
            access_token: SecretString::from("top-secret-access"),
            refresh_token: SecretString::from("top-secret-refresh"),
            customer_id: "c1".to_string(),
            username: "ada".to_string(),
        };

        let debug_output = format!("{pair:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("ada"));
        assert!(!debug_output.contains("top-secret-access"));
        assert!(!debug_output.contains("top-secret-refresh"));
    }

    #[test]
    fn test_login_response_conversion() {
        let json = r#"{
            "accessToken": "at",
            "refreshToken": "rt",
            "customerId": "c1",
            "username": "ada"
        }"#;
        let response: LoginResponse = serde_json::from_str(json).unwrap();
        let pair = CredentialPair::from(response);
        assert_eq!(pair.access_token(), "at");
        assert_eq!(pair.refresh_token(), "rt");
        assert_eq!(pair.customer_id, "c1");
    }
}
