//! Authenticated session for sites that require a login.
//!
//! A [`Session`] is created by [`try_login`] and kept in a [`SessionStore`]
//! shared by the crawler's search and download calls. It is never written to
//! disk and has no local expiry; an invalid session only shows up as failing
//! requests.

mod error;
mod login;

pub use error::LoginError;
pub use login::{
    CAPTURED_HEADERS, Credentials, EMAIL_ENV, LOGIN_PATH, PASSWORD_ENV, SIGN_IN_PATH, try_login,
};

use std::sync::{PoisonError, RwLock};

use reqwest::header::HeaderMap;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    csrf_token: String,
    auth_headers: HeaderMap,
}

impl Session {
    /// Creates a session from a CSRF token and the captured auth headers.
    #[must_use]
    pub fn new(csrf_token: impl Into<String>, auth_headers: HeaderMap) -> Self {
        Self {
            csrf_token: csrf_token.into(),
            auth_headers,
        }
    }

    /// CSRF token scraped from the login page.
    #[must_use]
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Headers merged into every authenticated request.
    #[must_use]
    pub fn auth_headers(&self) -> &HeaderMap {
        &self.auth_headers
    }
}

/// Holder for the current session: written at login, read by every request.
#[derive(Debug, Default)]
pub struct SessionStore {
    session: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current session.
    pub fn set(&self, session: Session) {
        *self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Drops the current session.
    pub fn clear(&self) {
        *self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns true if a login has succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Auth headers of the current session, empty when logged out.
    #[must_use]
    pub fn auth_headers(&self) -> HeaderMap {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.auth_headers.clone())
            .unwrap_or_default()
    }

    /// CSRF token of the current session.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.csrf_token.clone())
    }
}
