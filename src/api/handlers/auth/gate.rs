//! Request gates for protected and guest-only routes.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::{cookies::access_token, state::AuthState};
use crate::error::AppError;

pub const MISSING_TOKEN: &str = "you don't have a token yet";
pub const ALREADY_SIGNED_IN: &str = "you are already signed in";

/// Subject resolved from a valid access token, available to downstream handlers
/// as `Extension<AuthSubject>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSubject(pub String);

/// Auth gate: reject requests without a valid access token, otherwise bind the
/// subject into the request extensions.
///
/// # Errors
/// Returns `Authorization` when the token is missing or does not parse.
pub async fn require_access_token(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = access_token(request.headers()) else {
        return Err(AppError::authorization(MISSING_TOKEN));
    };

    let subject = auth_state.tokens().parse_access(&token)?;
    request.extensions_mut().insert(AuthSubject(subject));

    Ok(next.run(request).await)
}

/// Guest gate: sign up and sign in are refused to callers already holding a
/// valid access token. Stale or garbage tokens are ignored.
///
/// # Errors
/// Returns `Authorization` when a valid access token is presented.
pub async fn reject_authenticated(
    Extension(auth_state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = access_token(request.headers()) {
        if auth_state.tokens().parse_access(&token).is_ok() {
            debug!("Guest route called with a valid access token");
            return Err(AppError::authorization(ALREADY_SIGNED_IN));
        }
    }

    Ok(next.run(request).await)
}
