//! Auth cookie construction and request token extraction.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use tracing::error;

use crate::error::AppError;

pub const ACCESS_COOKIE_NAME: &str = "Authorization";
pub const REFRESH_COOKIE_NAME: &str = "X-Refresh";

/// Cookie attributes; max-ages are seconds and match the token TTLs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CookieConfig {
    pub secure: bool,
    pub access_max_age: i64,
    pub refresh_max_age: i64,
}

impl CookieConfig {
    /// # Errors
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn access(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(ACCESS_COOKIE_NAME, token, self.access_max_age)
    }

    /// # Errors
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn refresh(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(REFRESH_COOKIE_NAME, token, self.refresh_max_age)
    }

    /// Expire a cookie immediately.
    ///
    /// # Errors
    /// Returns an error if the cookie cannot be encoded.
    pub fn clear(&self, name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        self.build(name, "", -1)
    }

    fn build(
        &self,
        name: &str,
        value: &str,
        max_age: i64,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie =
            format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Append a `Set-Cookie` header, mapping an encoding failure to `Internal`.
pub(crate) fn append_cookie(
    headers: &mut HeaderMap,
    cookie: Result<HeaderValue, InvalidHeaderValue>,
) -> Result<(), AppError> {
    let value = cookie.map_err(|err| {
        error!("Failed to encode cookie: {err}");
        AppError::internal()
    })?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// Read a cookie value by name from the `Cookie` headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name && !val.trim().is_empty()).then(|| val.trim().to_string())
        })
}

/// Access token from `Authorization` (with or without the `Bearer` scheme),
/// falling back to the access cookie.
pub(crate) fn access_token(headers: &HeaderMap) -> Option<String> {
    authorization_header(headers).or_else(|| cookie_value(headers, ACCESS_COOKIE_NAME))
}

fn authorization_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim_start();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
