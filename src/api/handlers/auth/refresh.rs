use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    cookies::{append_cookie, cookie_value, REFRESH_COOKIE_NAME},
    gate::MISSING_TOKEN,
    state::AuthState,
};
use crate::{
    api::handlers::ApiResponse,
    auth::model::{RefreshResponse, RefreshTokenBody},
    error::{AppError, ErrorBody},
};

/// Refresh token from the `X-Refresh` cookie, else from the JSON body.
pub(super) fn refresh_token(
    headers: &HeaderMap,
    payload: Option<Json<RefreshTokenBody>>,
) -> Result<String, AppError> {
    cookie_value(headers, REFRESH_COOKIE_NAME)
        .or_else(|| {
            payload
                .and_then(|Json(body)| body.refresh_token)
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
        })
        .ok_or_else(|| AppError::authorization(MISSING_TOKEN))
}

#[utoipa::path(
    post,
    path = "/_refresh",
    request_body(content = RefreshTokenBody, description = "Used only when the X-Refresh cookie is absent"),
    responses(
        (status = 201, description = "New access token; resets the Authorization cookie", body = ApiResponse<RefreshResponse>),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshTokenBody>>,
) -> Result<impl IntoResponse, AppError> {
    let token = refresh_token(&headers, payload)?;
    let response = auth_state.service().refresh(&token).await?;

    let mut response_headers = HeaderMap::new();
    append_cookie(
        &mut response_headers,
        auth_state.cookies().access(&response.access_token),
    )?;

    Ok((
        response_headers,
        ApiResponse::with_data(StatusCode::CREATED, "token refreshed", response),
    ))
}
