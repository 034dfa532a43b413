use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    cookies::{append_cookie, ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME},
    refresh::refresh_token,
    state::AuthState,
};
use crate::{
    api::handlers::ApiResponse,
    auth::model::RefreshTokenBody,
    error::{AppError, ErrorBody},
};

#[utoipa::path(
    post,
    path = "/logout",
    request_body(content = RefreshTokenBody, description = "Used only when the X-Refresh cookie is absent"),
    responses(
        (status = 200, description = "Session revoked; both auth cookies cleared"),
        (status = 401, description = "Missing access token or refresh token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshTokenBody>>,
) -> Result<impl IntoResponse, AppError> {
    let token = refresh_token(&headers, payload)?;
    auth_state.service().logout(&token).await?;

    let cookies = auth_state.cookies();
    let mut response_headers = HeaderMap::new();
    append_cookie(&mut response_headers, cookies.clear(ACCESS_COOKIE_NAME))?;
    append_cookie(&mut response_headers, cookies.clear(REFRESH_COOKIE_NAME))?;

    Ok((
        response_headers,
        ApiResponse::message(StatusCode::OK, "logged out"),
    ))
}
