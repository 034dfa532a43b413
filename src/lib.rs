//! # Storefront API (authentication and sessions)
//!
//! `storefront` serves the account surface of a multi-tenant storefront:
//! registration, sign in, token refresh, logout and identity lookup.
//!
//! ## Tokens
//!
//! Sign in issues two HS256 tokens signed with independent secrets:
//!
//! - **Access token** (30 minutes): presented on every protected call, either as
//!   `Authorization: Bearer <token>` or through the `Authorization` cookie.
//! - **Refresh token** (7 days): only accepted by `/_refresh` and `/logout`,
//!   usually through the `X-Refresh` cookie.
//!
//! ## Revocation
//!
//! Every refresh token has a session row (stored as a SHA-256 hash). Logout
//! deletes the row, so the token can no longer mint access tokens even though its
//! signature is still valid. Access tokens are stateless and expire on their own.
//!
//! ## Errors
//!
//! Every failure is one [`error::AppError`] whose [`error::ErrorKind`] maps to a
//! single HTTP status; storage errors never leak past the auth service.

pub mod api;
pub mod auth;
pub mod cli;
pub mod error;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
