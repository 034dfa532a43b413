use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::state::AuthState;
use crate::{
    api::handlers::ApiResponse,
    auth::model::{PublicUser, SignUpRequest},
    error::{AppError, ErrorBody},
};

#[utoipa::path(
    post,
    path = "/sign_up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<PublicUser>),
        (status = 400, description = "Invalid fields or password mismatch", body = ErrorBody),
        (status = 401, description = "Caller is already signed in", body = ErrorBody),
        (status = 409, description = "Username or email already taken", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_up(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let user = auth_state.service().register(request).await?;

    Ok(ApiResponse::with_data(
        StatusCode::CREATED,
        "user created",
        user,
    ))
}
