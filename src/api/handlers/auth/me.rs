//! Identity endpoints behind the auth gate.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use super::{gate::AuthSubject, state::AuthState};
use crate::{
    api::handlers::ApiResponse,
    auth::model::{PublicUser, SessionRecord},
    error::{AppError, ErrorBody},
};

#[utoipa::path(
    get,
    path = "/info",
    responses(
        (status = 201, description = "Signed-in user", body = ApiResponse<PublicUser>),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn info(
    Extension(AuthSubject(subject)): Extension<AuthSubject>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_state.service().info(&subject).await?;

    Ok(ApiResponse::with_data(StatusCode::CREATED, "user info", user))
}

#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "Active sessions, newest first", body = ApiResponse<Vec<SessionRecord>>),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sessions(
    Extension(AuthSubject(subject)): Extension<AuthSubject>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = auth_state.service().sessions(&subject).await?;

    Ok(ApiResponse::with_data(StatusCode::OK, "active sessions", sessions))
}
