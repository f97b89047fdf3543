//! Credential transport: the `Authorization` header and the `auth-token` cookie.

use axum::http::{HeaderMap, header};

/// Cookie name for the browser-delivered access token.
pub const AUTH_COOKIE_NAME: &str = "auth-token";

/// Why no bearer token could be read from the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("no authorization header included in request")]
    Missing,
    #[error("malformed authorization header")]
    Malformed,
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::Malformed)?;

    if value.is_empty() {
        return Err(BearerError::Missing);
    }

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(BearerError::Malformed),
    }
}

/// `Set-Cookie` value delivering an access token to a browser.
/// Cross-site usable, so `SameSite=None` and `Secure` go together.
pub fn auth_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
        AUTH_COOKIE_NAME, token, max_age_secs
    )
}

/// `Set-Cookie` value that removes the access token cookie.
pub fn clear_auth_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0",
        AUTH_COOKIE_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; auth-token=abc123; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "auth-token"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  auth-token = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "auth-token"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_no_header() {
        assert_eq!(get_cookie(&HeaderMap::new(), "auth-token"), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(BearerError::Missing));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Ok("abc"));

        for bad in ["Basic abc", "Bearer", "Bearer ", "bearer abc", "abc"] {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(bad));
            assert_eq!(
                bearer_token(&headers),
                Err(BearerError::Malformed),
                "{:?} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = auth_cookie("tok", 3600);
        assert!(cookie.starts_with("auth-token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));

        let cleared = clear_auth_cookie();
        assert!(cleared.starts_with("auth-token=;"));
        assert!(cleared.contains("Max-Age=0"));
    }
}
