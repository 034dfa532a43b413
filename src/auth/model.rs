//! Identity records, session records, and request/response types for auth.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, FieldError};

const USERNAME_MIN: usize = 5;
const USERNAME_MAX: usize = 60;
const PASSWORD_MIN: usize = 8;

/// Stored identity record. Owned by the credential store.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// User view without the password hash.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the credential store; the password is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Columns guarded by a unique constraint on `users`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

/// Session row to persist after a successful sign in.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub user_id: Uuid,
    pub username: String,
    pub user_agent: String,
    pub refresh_token: String,
}

/// Stored session; token material never leaves the registry.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct SignUpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl SignUpRequest {
    /// Field checks that must pass before anything touches storage.
    ///
    /// # Errors
    /// Returns `BadRequest` with one entry per failing field, or with the
    /// `confirm_password` entry when the passwords differ.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push(required("username"));
        } else if username.chars().count() < USERNAME_MIN {
            errors.push(too_short("username", USERNAME_MIN));
        } else if username.chars().count() > USERNAME_MAX {
            errors.push(too_long("username", USERNAME_MAX));
        }

        let email = normalize_email(&self.email);
        if email.is_empty() {
            errors.push(required("email"));
        } else if !valid_email(&email) {
            errors.push(FieldError::new("email", "Invalid email"));
        }

        if self.password.is_empty() {
            errors.push(required("password"));
        } else if self.password.chars().count() < PASSWORD_MIN {
            errors.push(too_short("password", PASSWORD_MIN));
        }

        if self.confirm_password.is_empty() {
            errors.push(required("confirm_password"));
        }

        if !errors.is_empty() {
            return Err(AppError::bad_request("bad request", errors));
        }

        if self.password != self.confirm_password {
            return Err(AppError::bad_request(
                "bad request",
                vec![FieldError::new("confirm_password", "Passwords don't match")],
            ));
        }

        Ok(())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct SignInRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Exactly one of username or email identifies the account on sign in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    Username(String),
    Email(String),
}

impl SignInRequest {
    /// Resolve the identifier and check the password is present.
    ///
    /// # Errors
    /// Returns `BadRequest` when both or neither identifier is supplied, or when
    /// the password is missing.
    pub fn identifier(&self) -> Result<Identifier, AppError> {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|value| !value.is_empty());

        let identifier = match (username, email) {
            (Some(username), None) => Identifier::Username(username.to_string()),
            (None, Some(email)) => Identifier::Email(email),
            (Some(_), Some(_)) => {
                return Err(AppError::bad_request(
                    "username and email are mutually exclusive",
                    Vec::new(),
                ))
            }
            (None, None) => {
                return Err(AppError::bad_request(
                    "username or email can't be null",
                    Vec::new(),
                ))
            }
        };

        if self.password.is_empty() {
            return Err(AppError::bad_request(
                "bad request",
                vec![required("password")],
            ));
        }

        Ok(identifier)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct SignInResponse {
    pub profile: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Body fallback for endpoints that normally read the refresh cookie.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct RefreshTokenBody {
    #[serde(default, alias = "token")]
    pub refresh_token: Option<String>,
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

fn required(field: &str) -> FieldError {
    FieldError::new(field, "This field is required")
}

fn too_short(field: &str, min: usize) -> FieldError {
    FieldError::new(field, format!("Should have at least {min} characters"))
}

fn too_long(field: &str, max: usize) -> FieldError {
    FieldError::new(
        field,
        format!("Should be less than or equal to {max} characters"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sign_up(password: &str, confirm: &str) -> SignUpRequest {
        SignUpRequest {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn sign_up_accepts_valid_request() {
        assert!(sign_up("secret123", "secret123").validate().is_ok());
    }

    #[test]
    fn sign_up_rejects_password_mismatch() {
        let err = sign_up("secret123", "secret124").validate().err();
        let err = err.map(|err| (err.kind(), err.errors().to_vec()));
        assert_eq!(
            err,
            Some((
                ErrorKind::BadRequest,
                vec![FieldError::new("confirm_password", "Passwords don't match")]
            ))
        );
    }

    #[test]
    fn sign_up_lists_every_failing_field() {
        let request = SignUpRequest {
            username: "bob".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            confirm_password: String::new(),
        };
        let fields: Vec<String> = request
            .validate()
            .err()
            .map(|err| err.errors().iter().map(|e| e.field.clone()).collect())
            .unwrap_or_default();
        assert_eq!(
            fields,
            vec!["username", "email", "password", "confirm_password"]
        );
    }

    #[test]
    fn sign_up_rejects_long_username() {
        let mut request = sign_up("secret123", "secret123");
        request.username = "a".repeat(61);
        let messages: Vec<String> = request
            .validate()
            .err()
            .map(|err| err.errors().iter().map(|e| e.message.clone()).collect())
            .unwrap_or_default();
        assert_eq!(
            messages,
            vec!["Should be less than or equal to 60 characters"]
        );
    }

    #[test]
    fn sign_in_identifier_is_exclusive() {
        let both = SignInRequest {
            username: Some("alice".to_string()),
            email: Some("a@x.com".to_string()),
            password: "secret123".to_string(),
        };
        assert_eq!(
            both.identifier().err().map(|err| err.kind()),
            Some(ErrorKind::BadRequest)
        );

        let neither = SignInRequest {
            username: Some("  ".to_string()),
            email: None,
            password: "secret123".to_string(),
        };
        assert_eq!(
            neither.identifier().err().map(|err| err.kind()),
            Some(ErrorKind::BadRequest)
        );
    }

    #[test]
    fn sign_in_normalizes_email() {
        let request = SignInRequest {
            username: None,
            email: Some(" A@X.com ".to_string()),
            password: "secret123".to_string(),
        };
        assert_eq!(
            request.identifier().ok(),
            Some(Identifier::Email("a@x.com".to_string()))
        );
    }

    #[test]
    fn public_user_has_no_password_hash() -> anyhow::Result<()> {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(user.to_public())?;
        assert!(value.get("password_hash").is_none());
        assert!(!value.to_string().contains("argon2id"));
        Ok(())
    }

    #[test]
    fn refresh_body_accepts_token_alias() -> anyhow::Result<()> {
        let body: RefreshTokenBody = serde_json::from_str(r#"{"token":"abc"}"#)?;
        assert_eq!(body.refresh_token.as_deref(), Some("abc"));
        Ok(())
    }
}
