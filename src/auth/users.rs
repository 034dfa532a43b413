//! Credential store: persisted user identity records.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::model::{NewUser, UniqueField, User};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Result of an insert guarded by the unique constraints on `users`.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(User),
    Conflict(UniqueField),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        query: &'static str,
        column: &str,
        value: &str,
    ) -> Result<Option<User>> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(value)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup user by {column}"))?;

        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(Uuid::now_v7())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row))),
            Err(err) => match unique_violation_field(&err) {
                Some(field) => Ok(InsertOutcome::Conflict(field)),
                None => Err(err).context("failed to insert user"),
            },
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
            "username",
            username,
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
            "email",
            email,
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query =
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        Ok(row.as_ref().map(user_from_row))
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Map a unique violation to the column it guards.
///
/// A violation on an unrecognized constraint is not a field conflict and falls
/// through as a plain storage error.
pub(crate) fn unique_violation_field(err: &sqlx::Error) -> Option<UniqueField> {
    if !is_unique_violation(err) {
        return None;
    }
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    match db_err.constraint()? {
        USERNAME_CONSTRAINT => Some(UniqueField::Username),
        EMAIL_CONSTRAINT => Some(UniqueField::Email),
        _ => None,
    }
}
