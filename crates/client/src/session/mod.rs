//! Session management: authenticated requests with silent token refresh.
//!
//! The [`SessionManager`] owns the credential pair and is its only writer
//! (login, refresh, logout). Every authenticated request reads the access
//! token fresh from storage, attaches it as a bearer header, and recovers
//! from a 401 by awaiting the process-wide single-flight refresh and
//! retrying exactly once.
//!
//! # Recovery flow
//!
//! 1. Request goes out with `Authorization: Bearer <accessToken>`.
//! 2. On any status other than 401, the response is returned as-is.
//! 3. On 401 with no stored refresh token, the session is torn down and the
//!    401 is returned to the caller.
//! 4. On 401 with a refresh token, the caller joins the shared refresh
//!    (starting it if none is in flight), then retries once. A 401 on the
//!    retry is returned as-is - there is no second refresh.
//!
//! Transport failures are surfaced to the caller untouched; this layer never
//! retries the network.

mod events;
mod refresh;

pub use events::SessionEvent;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use shoplive_core::{CredentialPair, LoginResponse, RefreshResponse};

use crate::body::RequestBody;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::store::{CredentialStore, FileStore, KeyValueStore};

use refresh::{RefreshFailure, RefreshSlot, SharedRefresh};

/// Capacity of the session event channel. Lagging UI subscribers miss old
/// events rather than blocking the session.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The session service object.
///
/// Cheap to clone; clones share the same credential state, refresh slot,
/// and event channel. Inject one into every component that needs
/// authenticated access instead of reaching for ambient globals.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: CredentialStore,
    refresh: RefreshSlot,
    events: broadcast::Sender<SessionEvent>,
    generation: AtomicU64,
}

impl SessionManager {
    /// Create a session manager over an existing key-value store.
    #[must_use]
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                http: reqwest::Client::new(),
                credentials: CredentialStore::new(store),
                config,
                refresh: RefreshSlot::default(),
                events,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Create a session manager from environment configuration, backed by
    /// the durable session file.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if configuration is invalid or the session file
    /// cannot be opened.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let store = Arc::new(FileStore::open(&config.credentials_path)?);
        Ok(Self::new(config, store))
    }

    /// The active client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Subscribe to session lifecycle events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Monotonic counter bumped on login and logout.
    ///
    /// Asynchronous consumers capture it before a request and compare after:
    /// a mismatch means the session changed underneath them and the result
    /// must be discarded.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Whether credentials are currently stored.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Store` on storage failure.
    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.inner.credentials.access_token()?.is_some())
    }

    /// The stored display username, if logged in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Store` on storage failure.
    pub fn current_username(&self) -> Result<Option<String>> {
        Ok(self.inner.credentials.load()?.map(|pair| pair.username))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Log in with username and password.
    ///
    /// On success the credential pair is persisted and
    /// [`SessionEvent::LoggedIn`] is broadcast. Login bypasses the refresh
    /// machinery: a 401 here means bad credentials, not an expired token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` when the backend rejects the credentials
    /// and `ClientError::Http` on transport failure.
    pub async fn login(&self, name: &str, password: &str) -> Result<CredentialPair> {
        let url = self.inner.config.endpoint("/auth/login");
        let response = self
            .inner
            .http
            .post(&url)
            .json(&serde_json::json!({ "name": name, "password": password }))
            .send()
            .await?;

        let login: LoginResponse = decode_json(response).await?;
        let pair = CredentialPair::from(login);
        self.inner.credentials.save(&pair)?;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.inner.events.send(SessionEvent::LoggedIn {
            username: pair.username.clone(),
        });
        info!(username = %pair.username, "login successful");
        Ok(pair)
    }

    /// Create an account. The backend routes the user back to login; no
    /// credentials are stored here.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with the backend's message on rejection.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<()> {
        let url = self.inner.config.endpoint("/register");
        let response = self
            .inner
            .http
            .post(&url)
            .json(&serde_json::json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;

        check_status(response).await.map(drop)
    }

    /// Tear down the session: clear the stored credential keys (the
    /// wishlist is independent and survives), bump the generation, and
    /// broadcast [`SessionEvent::LoggedOut`].
    ///
    /// Idempotent: concurrent calls have the same net effect as one call.
    /// Navigation is the subscriber's job; this method only mutates state.
    pub fn force_logout(&self) {
        if let Err(err) = self.inner.credentials.clear() {
            warn!(error = %err, "failed to clear credential storage during logout");
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.inner.events.send(SessionEvent::LoggedOut);
        info!("session torn down");
    }

    /// User-initiated logout.
    pub fn logout(&self) {
        self.force_logout();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authenticated requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Perform an authenticated request against the backend.
    ///
    /// The bearer header is attached from storage on every attempt (read
    /// fresh, never cached). Caller-supplied headers are merged, not
    /// clobbered - except `Authorization`, which this method owns. A
    /// multipart body keeps the content type reqwest derives; JSON is never
    /// forced onto it.
    ///
    /// # Errors
    ///
    /// - `ClientError::Http` on transport failure (no retry)
    /// - `ClientError::SessionInvalid` if a required refresh fails (the
    ///   session is already torn down when this is returned)
    ///
    /// A 401 that cannot even be attempted (no refresh token stored) tears
    /// the session down and hands the original 401 response back.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        headers: HeaderMap,
    ) -> Result<Response> {
        let response = self.send(method.clone(), path, &body, &headers).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        match self.inner.credentials.refresh_token()? {
            Some(_) => {}
            None => {
                warn!(path, "401 with no stored refresh token, forcing logout");
                self.force_logout();
                return Ok(response);
            }
        }

        debug!(path, "access token rejected, awaiting shared refresh");
        self.refresh_access_token().await.map_err(|err| {
            warn!(path, error = %err, "refresh failed, original request fails");
            ClientError::SessionInvalid
        })?;

        debug!(path, "retrying once with refreshed access token");
        self.send(method, path, &body, &headers).await
    }

    /// GET a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::request`]; additionally `ClientError::Api` for
    /// non-success statuses and `ClientError::Parse` on decode failure.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(Method::GET, path, RequestBody::Empty, HeaderMap::new())
            .await?;
        decode_json(response).await
    }

    /// POST a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::get_json`].
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::POST, path, RequestBody::json(body)?, HeaderMap::new())
            .await?;
        decode_json(response).await
    }

    /// GET a binary resource (e.g. a product image).
    ///
    /// # Errors
    ///
    /// See [`SessionManager::request`]; additionally `ClientError::Api` for
    /// non-success statuses.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .request(Method::GET, path, RequestBody::Empty, HeaderMap::new())
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Issue one attempt with the current access token.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: &RequestBody,
        extra_headers: &HeaderMap,
    ) -> Result<Response> {
        let url = self.inner.config.endpoint(path);
        let mut request = self.inner.http.request(method, &url);

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(form) => request.multipart(form.to_form()),
        };

        // Caller headers first; the bearer header always comes from storage.
        request = request.headers(extra_headers.clone());
        if let Some(token) = self.inner.credentials.access_token()? {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => request = request.header(AUTHORIZATION, value),
                Err(_) => {
                    warn!("stored access token is not a valid header value, sending unauthenticated");
                }
            }
        }

        Ok(request.send().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Silent refresh
    // ─────────────────────────────────────────────────────────────────────────

    /// Join the in-flight refresh or start the only one.
    fn refresh_access_token(&self) -> SharedRefresh {
        let (handle, started) = self.inner.refresh.join_or_start(|| {
            let session = self.clone();
            async move {
                let result = session.perform_refresh().await;
                session.inner.refresh.clear();
                result
            }
            .boxed()
            .shared()
        });

        if started {
            debug!("starting single-flight token refresh");
        } else {
            debug!("joining in-flight token refresh");
        }
        handle
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Any failure here is terminal for the session: the refresh endpoint is
    /// never retried and the credentials are wiped before the error is
    /// propagated to every waiting caller.
    async fn perform_refresh(&self) -> std::result::Result<(), RefreshFailure> {
        let _ = self.inner.events.send(SessionEvent::RefreshStarted);

        let refresh_token = match self.inner.credentials.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.force_logout();
                return Err(RefreshFailure::new("no refresh token stored"));
            }
            Err(err) => {
                self.force_logout();
                return Err(RefreshFailure::new(err.to_string()));
            }
        };

        let url = self.inner.config.endpoint("/auth/refresh");
        let response = self
            .inner
            .http
            .post(&url)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "refresh request failed, forcing logout");
                self.force_logout();
                return Err(RefreshFailure::new(err.to_string()));
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "refresh endpoint rejected the session");
            self.force_logout();
            return Err(RefreshFailure::new(format!(
                "refresh rejected with status {}",
                response.status()
            )));
        }

        let tokens: RefreshResponse = match response.json().await {
            Ok(tokens) => tokens,
            Err(err) => {
                self.force_logout();
                return Err(RefreshFailure::new(err.to_string()));
            }
        };

        if let Err(err) = self.inner.credentials.set_access_token(&tokens.access_token) {
            self.force_logout();
            return Err(RefreshFailure::new(err.to_string()));
        }

        let _ = self.inner.events.send(SessionEvent::Refreshed);
        info!("access token refreshed");
        Ok(())
    }
}

// =============================================================================
// Response helpers
// =============================================================================

/// Map a non-success response to the error taxonomy.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::RateLimited(message));
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

/// Decode a JSON response body, logging a snippet on parse failure.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|err| {
        error!(
            error = %err,
            body = %text.chars().take(500).collect::<String>(),
            "failed to parse response body"
        );
        ClientError::Parse(err)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, REFRESH_TOKEN_KEY, WISHLIST_KEY};
    use secrecy::SecretString;
    use url::Url;

    fn session_with_store() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config =
            ClientConfig::new(Url::parse("http://127.0.0.1:1/").unwrap()).unwrap();
        let session = SessionManager::new(config, Arc::clone(&store) as Arc<dyn KeyValueStore>);
        (session, store)
    }

    fn seed_credentials(session: &SessionManager) {
        session
            .credentials()
            .save(&CredentialPair {
                access_token: SecretString::from("at"),
                refresh_token: SecretString::from("rt"),
                customer_id: "c1".to_string(),
                username: "ada".to_string(),
            })
            .unwrap();
    }

    #[test]
    fn test_force_logout_clears_credentials_but_not_wishlist() {
        let (session, store) = session_with_store();
        seed_credentials(&session);
        store.set(WISHLIST_KEY, r#"["p1"]"#).unwrap();

        session.force_logout();

        assert!(!session.is_logged_in().unwrap());
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(WISHLIST_KEY).unwrap().as_deref(), Some(r#"["p1"]"#));
    }

    #[test]
    fn test_force_logout_is_idempotent() {
        let (session, store) = session_with_store();
        seed_credentials(&session);

        session.force_logout();
        session.force_logout();

        assert!(store.is_empty());
        assert!(!session.is_logged_in().unwrap());
    }

    #[test]
    fn test_logout_bumps_generation_and_emits_event() {
        let (session, _store) = session_with_store();
        let mut events = session.events();

        let before = session.generation();
        session.force_logout();

        assert_eq!(session.generation(), before + 1);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn test_current_username_reads_stored_pair() {
        let (session, _store) = session_with_store();
        assert_eq!(session.current_username().unwrap(), None);

        seed_credentials(&session);
        assert_eq!(session.current_username().unwrap().as_deref(), Some("ada"));
    }
}
