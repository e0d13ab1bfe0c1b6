//! Session lifecycle events.
//!
//! The session manager never touches navigation or user-facing messaging;
//! it broadcasts these events and lets UI layers decide what a login
//! redirect or a "session refreshed" toast looks like.

/// A session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were stored after a successful login.
    LoggedIn { username: String },
    /// An access-token refresh started (the access token was rejected).
    RefreshStarted,
    /// The access token was refreshed in place; the session continues.
    Refreshed,
    /// The session was torn down; credential storage is empty.
    LoggedOut,
}
