use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{cookies::append_cookie, state::AuthState};
use crate::{
    api::handlers::ApiResponse,
    auth::model::{SignInRequest, SignInResponse},
    error::{AppError, ErrorBody},
};

#[utoipa::path(
    post,
    path = "/sign_in",
    request_body = SignInRequest,
    responses(
        (status = 201, description = "Signed in; sets the Authorization and X-Refresh cookies", body = ApiResponse<SignInResponse>),
        (status = 400, description = "Missing or ambiguous identifier", body = ErrorBody),
        (status = 401, description = "Invalid credentials or already signed in", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let response = auth_state
        .service()
        .authenticate(request, user_agent)
        .await?;

    let cookies = auth_state.cookies();
    let mut response_headers = HeaderMap::new();
    append_cookie(&mut response_headers, cookies.access(&response.access_token))?;
    append_cookie(&mut response_headers, cookies.refresh(&response.refresh_token))?;

    Ok((
        response_headers,
        ApiResponse::with_data(StatusCode::CREATED, "signed in", response),
    ))
}
