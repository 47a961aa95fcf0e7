/// Credential extraction
///
/// Pulls raw user credentials out of request headers. Nothing here validates
/// a credential: a malformed or expired token is returned exactly as sent and
/// rejected later by the identity resolver.
///
/// Carriers are returned in the order they should be tried:
///
/// 1. `Authorization: Bearer <token>`
/// 2. the session cookie
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use reviewdesk_shared::auth::credentials::{extract_credentials, CredentialSource};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
///
/// let creds = extract_credentials(&headers, "rd-access-token");
/// assert_eq!(creds[0].source, CredentialSource::Bearer);
/// assert_eq!(creds[0].value, "abc");
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

/// Where a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `Authorization: Bearer` header
    Bearer,

    /// Session cookie
    SessionCookie,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Bearer => "bearer",
            CredentialSource::SessionCookie => "session_cookie",
        }
    }
}

/// An unverified credential
#[derive(Clone, PartialEq, Eq)]
pub struct RawCredential {
    pub source: CredentialSource,
    pub value: String,
}

impl std::fmt::Debug for RawCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCredential")
            .field("source", &self.source)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Reads the bearer token from the `Authorization` header
///
/// Returns `None` when the header is missing, not valid UTF-8, uses another
/// scheme, or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Reads a cookie by name from all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Collects every credential carried by the request, in trial order
pub fn extract_credentials(headers: &HeaderMap, session_cookie: &str) -> Vec<RawCredential> {
    let mut credentials = Vec::with_capacity(2);

    if let Some(token) = bearer_token(headers) {
        credentials.push(RawCredential {
            source: CredentialSource::Bearer,
            value: token,
        });
    }

    if let Some(session) = cookie_value(headers, session_cookie) {
        credentials.push(RawCredential {
            source: CredentialSource::SessionCookie,
            value: session,
        });
    }

    credentials
}
