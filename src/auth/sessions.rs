//! Session registry: one row per outstanding refresh token.
//!
//! Only a SHA-256 hash of the refresh token is stored. Deleting the row is the
//! sole revocation mechanism for refresh tokens.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{error, warn, Instrument};
use uuid::Uuid;

use super::model::{NewSession, SessionRecord};
use crate::error::AppError;

pub const ALREADY_LOGGED_OUT: &str = "you already logged out!";

#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// # Errors
    /// Returns `Internal` if the row cannot be written.
    async fn store(&self, session: NewSession) -> Result<SessionRecord, AppError>;

    /// Idempotent: removing an unknown token succeeds.
    ///
    /// # Errors
    /// Returns `Internal` if the delete fails.
    async fn remove(&self, refresh_token: &str) -> Result<(), AppError>;

    /// # Errors
    /// Returns `Authorization` when no session matches, `Internal` on storage failure.
    async fn find_by_token(&self, refresh_token: &str) -> Result<SessionRecord, AppError>;

    /// Active sessions for a user, newest first.
    ///
    /// # Errors
    /// Returns `Internal` on storage failure.
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, AppError>;
}

/// Hash a refresh token so raw values never touch the database.
pub(crate) fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[derive(Clone, Debug)]
pub struct PgSessionRegistry {
    pool: PgPool,
}

impl PgSessionRegistry {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRegistry for PgSessionRegistry {
    async fn store(&self, session: NewSession) -> Result<SessionRecord, AppError> {
        let query = r"
            INSERT INTO sessions (id, user_id, username, user_agent, token_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, username, user_agent, created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(Uuid::now_v7())
            .bind(session.user_id)
            .bind(&session.username)
            .bind(&session.user_agent)
            .bind(hash_refresh_token(&session.refresh_token))
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to insert session: {err}");
                AppError::internal()
            })?;

        Ok(session_from_row(&row))
    }

    async fn remove(&self, refresh_token: &str) -> Result<(), AppError> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_refresh_token(refresh_token))
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to delete session: {err}");
                AppError::internal()
            })?;

        Ok(())
    }

    async fn find_by_token(&self, refresh_token: &str) -> Result<SessionRecord, AppError> {
        let query = r"
            SELECT id, user_id, username, user_agent, created_at
            FROM sessions
            WHERE token_hash = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_refresh_token(refresh_token))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to lookup session: {err}");
                AppError::internal()
            })?;

        match row {
            Some(row) => Ok(session_from_row(&row)),
            None => {
                warn!("Refresh token has no active session");
                Err(AppError::authorization(ALREADY_LOGGED_OUT))
            }
        }
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, AppError> {
        let query = r"
            SELECT id, user_id, username, user_agent, created_at
            FROM sessions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to list sessions: {err}");
                AppError::internal()
            })?;

        Ok(rows.iter().map(session_from_row).collect())
    }
}

fn session_from_row(row: &PgRow) -> SessionRecord {
    SessionRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        user_agent: row.get("user_agent"),
        created_at: row.get("created_at"),
    }
}
