//! Auth orchestration over the credential store, password hasher, token codec
//! and session registry.
//!
//! Operations short-circuit on the first failure and surface exactly one
//! [`AppError`]. Storage errors are logged here and mapped to `Internal`; they
//! never reach the transport layer raw.
//!
//! Logout only revokes the refresh token. An access token issued before logout
//! stays valid until its own expiry, at most the access TTL.

use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    model::{
        normalize_email, Identifier, NewSession, NewUser, PublicUser, RefreshResponse,
        SessionRecord, SignInRequest, SignInResponse, SignUpRequest, UniqueField, User,
    },
    password::{PasswordHasher, INVALID_CREDENTIALS},
    sessions::SessionRegistry,
    token::{TokenCodec, INVALID_TOKEN},
    users::{CredentialStore, InsertOutcome},
};
use crate::error::AppError;

pub const USER_GONE: &str = "account no longer exists";

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: SignUpRequest) -> Result<PublicUser, AppError>;

    async fn authenticate(
        &self,
        request: SignInRequest,
        user_agent: &str,
    ) -> Result<SignInResponse, AppError>;

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AppError>;

    async fn logout(&self, refresh_token: &str) -> Result<(), AppError>;

    async fn info(&self, subject: &str) -> Result<PublicUser, AppError>;

    async fn sessions(&self, subject: &str) -> Result<Vec<SessionRecord>, AppError>;
}

pub struct AuthOrchestrator {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionRegistry>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenCodec>,
    // Verified against when the account is unknown so both paths cost the same.
    decoy_digest: Arc<str>,
}

impl AuthOrchestrator {
    /// # Errors
    /// Returns an error if the hasher cannot produce the decoy digest.
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRegistry>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenCodec>,
    ) -> anyhow::Result<Self> {
        let decoy_digest = hasher
            .hash(&Uuid::new_v4().to_string())
            .context("failed to prepare password hasher")?;

        Ok(Self {
            users,
            sessions,
            hasher,
            tokens,
            decoy_digest: decoy_digest.into(),
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        blocking(move || hasher.hash(&password)).await
    }

    async fn verify_password(&self, password: String, digest: Arc<str>) -> Result<(), AppError> {
        let hasher = self.hasher.clone();
        blocking(move || hasher.verify(&password, &digest)).await
    }

    async fn lookup(&self, identifier: &Identifier) -> Result<Option<User>, AppError> {
        let result = match identifier {
            Identifier::Username(username) => self.users.find_by_username(username).await,
            Identifier::Email(email) => self.users.find_by_email(email).await,
        };
        result.map_err(|err| {
            error!("Failed to lookup user: {err:#}");
            AppError::internal()
        })
    }
}

/// Run CPU-bound hashing off the async workers.
async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|err| {
        error!("Password task failed: {err}");
        AppError::internal()
    })?
}

fn subject_id(subject: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(subject).map_err(|_| AppError::authorization(INVALID_TOKEN))
}

#[async_trait]
impl AuthService for AuthOrchestrator {
    #[instrument(skip_all)]
    async fn register(&self, request: SignUpRequest) -> Result<PublicUser, AppError> {
        request.validate()?;

        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);
        let password_hash = self.hash_password(request.password).await?;

        let outcome = self
            .users
            .insert(NewUser {
                username: username.clone(),
                email: email.clone(),
                password_hash,
            })
            .await
            .map_err(|err| {
                error!("Failed to insert user: {err:#}");
                AppError::internal()
            })?;

        match outcome {
            InsertOutcome::Created(user) => {
                info!(user_id = %user.id, "User registered");
                Ok(user.to_public())
            }
            InsertOutcome::Conflict(field) => {
                warn!(field = field.as_str(), "Registration conflict");
                let value = match field {
                    UniqueField::Username => username,
                    UniqueField::Email => email,
                };
                Err(AppError::conflict(field.as_str(), &value))
            }
        }
    }

    #[instrument(skip_all)]
    async fn authenticate(
        &self,
        request: SignInRequest,
        user_agent: &str,
    ) -> Result<SignInResponse, AppError> {
        let identifier = request.identifier()?;

        let Some(user) = self.lookup(&identifier).await? else {
            // Same work and same answer as a wrong password.
            let _ = self
                .verify_password(request.password, self.decoy_digest.clone())
                .await;
            debug!("Sign in for unknown account");
            return Err(AppError::authorization(INVALID_CREDENTIALS));
        };

        self.verify_password(request.password, user.password_hash.as_str().into())
            .await?;

        let subject = user.id.to_string();
        let access_token = self.tokens.issue_access(&subject)?;
        let refresh_token = self.tokens.issue_refresh(&subject)?;

        self.sessions
            .store(NewSession {
                user_id: user.id,
                username: user.username.clone(),
                user_agent: user_agent.to_string(),
                refresh_token: refresh_token.clone(),
            })
            .await?;

        info!(user_id = %user.id, "User signed in");

        Ok(SignInResponse {
            profile: user.to_public(),
            access_token,
            refresh_token,
        })
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AppError> {
        let session = self.sessions.find_by_token(refresh_token).await?;

        let subject = match self.tokens.parse_refresh(refresh_token) {
            Ok(subject) => subject,
            Err(err) => {
                // Expired refresh token: drop its session so it cannot linger.
                if let Err(remove_err) = self.sessions.remove(refresh_token).await {
                    warn!("Failed to drop stale session: {remove_err}");
                }
                return Err(err);
            }
        };
        if subject != session.user_id.to_string() {
            warn!(session_id = %session.id, "Refresh token subject does not match session");
            return Err(AppError::authorization(INVALID_TOKEN));
        }

        let access_token = self.tokens.issue_access(&subject)?;
        debug!(user_id = %session.user_id, "Access token refreshed");

        Ok(RefreshResponse { access_token })
    }

    #[instrument(skip_all)]
    async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        self.sessions.remove(refresh_token).await?;
        info!("Session revoked");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn info(&self, subject: &str) -> Result<PublicUser, AppError> {
        let id = subject_id(subject)?;
        match self.users.find_by_id(id).await {
            Ok(Some(user)) => Ok(user.to_public()),
            Ok(None) => {
                warn!(user_id = %id, "Valid access token for a missing user");
                Err(AppError::authorization(USER_GONE))
            }
            Err(err) => {
                error!("Failed to lookup user: {err:#}");
                Err(AppError::internal())
            }
        }
    }

    #[instrument(skip_all)]
    async fn sessions(&self, subject: &str) -> Result<Vec<SessionRecord>, AppError> {
        let id = subject_id(subject)?;
        self.sessions.find_by_user_id(id).await
    }
}
