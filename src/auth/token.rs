//! Signed bearer tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with independent secrets, so
//! one class can never be accepted as the other. Every parse failure collapses
//! into the same opaque `Authorization` error.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};
use ulid::Ulid;

use crate::error::AppError;

pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 30 * 60;
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const INVALID_TOKEN: &str = "expired or invalid token";
/// Upper bound for either TTL: ten years.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per issuance, so two logins in the same second never share a token.
    pub jti: String,
    pub typ: TokenKind,
}

pub trait TokenCodec: Send + Sync {
    /// # Errors
    /// Returns `Internal` if signing fails.
    fn issue_access(&self, subject: &str) -> Result<String, AppError>;

    /// # Errors
    /// Returns `Internal` if signing fails.
    fn issue_refresh(&self, subject: &str) -> Result<String, AppError>;

    /// # Errors
    /// Returns `Authorization` for malformed, foreign, or expired tokens.
    fn parse_access(&self, token: &str) -> Result<String, AppError>;

    /// # Errors
    /// Returns `Authorization` for malformed, foreign, or expired tokens.
    fn parse_refresh(&self, token: &str) -> Result<String, AppError>;
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl: Duration::seconds(ttl_seconds),
        }
    }
}

/// HS256 codec owning both secrets. Build once at startup and share by reference.
pub struct JwtCodec {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl JwtCodec {
    /// # Errors
    /// Returns an error if a secret is empty, both secrets are identical, or a
    /// TTL is not positive.
    pub fn new(
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> anyhow::Result<Self> {
        if access_secret.expose_secret().is_empty() || refresh_secret.expose_secret().is_empty() {
            anyhow::bail!("token secrets must not be empty");
        }
        if access_secret.expose_secret() == refresh_secret.expose_secret() {
            anyhow::bail!("access and refresh token secrets must differ");
        }
        for ttl in [access_ttl_seconds, refresh_ttl_seconds] {
            if ttl <= 0 {
                anyhow::bail!("token TTLs must be positive");
            }
            if ttl > MAX_TOKEN_TTL_SECONDS {
                anyhow::bail!("token TTLs must not exceed {MAX_TOKEN_TTL_SECONDS} seconds");
            }
        }

        Ok(Self {
            access: SigningKeys::new(access_secret, access_ttl_seconds),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl_seconds),
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    #[must_use]
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    pub(crate) fn issue_at(
        &self,
        kind: TokenKind,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let expires_at = now.checked_add_signed(keys.ttl).ok_or_else(|| {
            error!("{kind:?} token expiry is out of range");
            AppError::internal()
        })?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Ulid::new().to_string(),
            typ: kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|err| {
            error!("Failed to sign {kind:?} token: {err}");
            AppError::internal()
        })
    }

    pub(crate) fn parse_at(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, AppError> {
        // Expiry is checked below against `now`, not by the library's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|err| {
                debug!("Rejected {kind:?} token: {err}");
                AppError::authorization(INVALID_TOKEN)
            })?
            .claims;

        if claims.typ != kind || claims.sub.is_empty() {
            debug!("Rejected {kind:?} token: wrong type or empty subject");
            return Err(AppError::authorization(INVALID_TOKEN));
        }
        if now.timestamp() >= claims.exp {
            debug!("Rejected {kind:?} token: expired");
            return Err(AppError::authorization(INVALID_TOKEN));
        }

        Ok(claims)
    }
}

impl TokenCodec for JwtCodec {
    fn issue_access(&self, subject: &str) -> Result<String, AppError> {
        self.issue_at(TokenKind::Access, subject, Utc::now())
    }

    fn issue_refresh(&self, subject: &str) -> Result<String, AppError> {
        self.issue_at(TokenKind::Refresh, subject, Utc::now())
    }

    fn parse_access(&self, token: &str) -> Result<String, AppError> {
        self.parse_at(TokenKind::Access, token, Utc::now())
            .map(|claims| claims.sub)
    }

    fn parse_refresh(&self, token: &str) -> Result<String, AppError> {
        self.parse_at(TokenKind::Refresh, token, Utc::now())
            .map(|claims| claims.sub)
    }
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish_non_exhaustive()
    }
}
