//! CSRF-protected JSON sign-in.

use std::fmt;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::Session;
use super::error::LoginError;
use crate::download::HttpClient;
use crate::parser::markup;

/// Login page path; its markup carries the CSRF token.
pub const LOGIN_PATH: &str = "/usuarios/login";

/// Sign-in endpoint path.
pub const SIGN_IN_PATH: &str = "/api/v1/auth/sign_in";

/// Response headers captured on sign-in and replayed on later requests.
pub const CAPTURED_HEADERS: [&str; 3] = ["access-token", "client", "uid"];

/// Environment variable holding the account email.
pub const EMAIL_ENV: &str = "QCONCURSOS_EMAIL";

/// Environment variable holding the account password.
pub const PASSWORD_ENV: &str = "QCONCURSOS_PASSWORD";

/// Account credentials, supplied externally and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Creates credentials from an email/password pair.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Reads [`EMAIL_ENV`] and [`PASSWORD_ENV`] from the process environment.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads both variables through `lookup`; blank values count as missing.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let read = |name| lookup(name).filter(|value: &String| !value.trim().is_empty());
        Some(Self::new(read(EMAIL_ENV)?.trim(), read(PASSWORD_ENV)?))
    }
}

/// Logs in against `base_url` and returns the resulting session.
///
/// 1. GET the login page and read the `csrf-token` meta tag.
/// 2. POST the credentials as JSON with the token in `X-CSRF-Token`.
/// 3. On HTTP 200, capture [`CAPTURED_HEADERS`] from the response.
///
/// # Errors
///
/// Returns a [`LoginError`] for transport failures, a non-200 status on
/// either step or a login page without a token.
#[instrument(skip(client, credentials), fields(email = %credentials.email))]
pub async fn try_login(
    client: &HttpClient,
    base_url: &str,
    credentials: &Credentials,
) -> Result<Session, LoginError> {
    let base = base_url.trim_end_matches('/');
    let login_url = format!("{base}{LOGIN_PATH}");

    let response = client
        .inner()
        .get(&login_url)
        .send()
        .await
        .map_err(|e| LoginError::network(&login_url, e))?;
    if !response.status().is_success() {
        return Err(LoginError::status(&login_url, response.status().as_u16()));
    }
    let page = response
        .text()
        .await
        .map_err(|e| LoginError::network(&login_url, e))?;

    let csrf_token = markup::csrf_token(&page)
        .and_then(|token| HeaderValue::from_str(&token).ok().map(|value| (token, value)));
    let Some((csrf_token, csrf_value)) = csrf_token else {
        return Err(LoginError::MissingCsrfToken { url: login_url });
    };
    debug!("csrf token found");

    let sign_in_url = format!("{base}{SIGN_IN_PATH}");
    let body = json!({
        "user": {
            "email": credentials.email,
            "password": credentials.password,
            "remember_me": true,
        }
    });
    let response = client
        .inner()
        .post(&sign_in_url)
        .header("X-CSRF-Token", csrf_value)
        .header("X-Requested-With", "XMLHttpRequest")
        .header(ACCEPT, "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| LoginError::network(&sign_in_url, e))?;

    if response.status() != StatusCode::OK {
        return Err(LoginError::status(&sign_in_url, response.status().as_u16()));
    }

    let mut auth_headers = HeaderMap::new();
    for name in CAPTURED_HEADERS {
        match response.headers().get(name) {
            Some(value) => {
                auth_headers.insert(HeaderName::from_static(name), value.clone());
            }
            None => warn!(header = name, "sign-in response lacks auth header"),
        }
    }

    info!(captured = auth_headers.len(), "login succeeded");
    Ok(Session::new(csrf_token, auth_headers))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(lookup(&[
            (EMAIL_ENV, " user@example.com "),
            (PASSWORD_ENV, "s3cret"),
        ]))
        .unwrap();
        assert_eq!(creds.email, "user@example.com");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_credentials_missing_or_blank() {
        assert!(Credentials::from_lookup(lookup(&[(EMAIL_ENV, "a@b.c")])).is_none());
        assert!(
            Credentials::from_lookup(lookup(&[(EMAIL_ENV, "a@b.c"), (PASSWORD_ENV, "  ")]))
                .is_none()
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("a@b.c", "hunter2"));
        assert!(debug.contains("a@b.c"));
        assert!(!debug.contains("hunter2"));
    }
}
