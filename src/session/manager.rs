//! Session cookie handling.

use std::fmt;

use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

const MAX_TOKEN_LEN: usize = 128;

/// Opaque session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied token if it is safe to reuse.
    pub fn parse(token: &str) -> Option<Self> {
        let usable = !token.is_empty()
            && token.len() <= MAX_TOKEN_LEN
            && token
                .bytes()
                .all(|b| b.is_ascii_graphic() && !matches!(b, b';' | b',' | b'"' | b'\\'));
        usable.then(|| Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn cookie_values<'a>(headers: &'a HeaderMap, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(move |pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"'))
        })
}

/// Find or create the session for a request.
///
/// Returns the session and whether it was generated now, in which case the
/// caller must send `set_cookie_header` back to the client.
pub fn ensure_session(headers: &HeaderMap) -> (SessionId, bool) {
    match cookie_values(headers, SESSION_COOKIE).find_map(SessionId::parse) {
        Some(session) => (session, false),
        None => (SessionId::generate(), true),
    }
}

/// `Set-Cookie` value that persists `session` on the client.
pub fn set_cookie_header(session: &SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session
    ))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_cookie(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_new_session_without_cookie() {
        let (session, is_new) = ensure_session(&HeaderMap::new());
        assert!(is_new);
        assert!(Uuid::parse_str(session.as_str()).is_ok());

        let (other, _) = ensure_session(&HeaderMap::new());
        assert_ne!(session, other);
    }

    #[test]
    fn test_existing_cookie_is_reused() {
        let headers = with_cookie("theme=dark; session_id=abc-123; lang=en");
        let (session, is_new) = ensure_session(&headers);
        assert!(!is_new);
        assert_eq!(session.as_str(), "abc-123");
    }

    #[test]
    fn test_unusable_cookie_is_replaced() {
        for value in ["session_id=", "session_id=a b", "session_id=\\x"] {
            let (_, is_new) = ensure_session(&with_cookie(value));
            assert!(is_new, "reused {value:?}");
        }

        let long = format!("session_id={}", "a".repeat(MAX_TOKEN_LEN + 1));
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&long).unwrap());
        assert!(ensure_session(&headers).1);
    }

    #[test]
    fn test_first_usable_cookie_wins() {
        let mut headers = with_cookie("session_id=");
        headers.append(header::COOKIE, HeaderValue::from_static("session_id=second"));
        headers.append(header::COOKIE, HeaderValue::from_static("session_id=third"));
        assert_eq!(ensure_session(&headers).0.as_str(), "second");
    }

    #[test]
    fn test_set_cookie_header() {
        let session = SessionId::parse("tok").unwrap();
        let value = set_cookie_header(&session).unwrap();
        assert_eq!(value, "session_id=tok; Path=/; HttpOnly; SameSite=Lax");
    }
}
