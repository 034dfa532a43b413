//! Salted one-way password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so the
//! salt and cost travel with the digest and verification needs nothing else.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::error::AppError;

pub const INVALID_CREDENTIALS: &str = "invalid username/email or password";

pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing digest.
    ///
    /// # Errors
    /// Returns `Internal` if hashing fails.
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;

    /// Constant-time comparison of a candidate against a stored digest.
    ///
    /// # Errors
    /// Returns `Authorization` on mismatch and `Internal` for an unreadable digest.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<(), AppError>;
}

/// Argon2id with configurable memory and iteration cost.
#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// # Errors
    /// Returns an error if the cost parameters are out of range.
    pub fn new(memory_kib: u32, iterations: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|err| anyhow::anyhow!("invalid argon2 parameters: {err}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|err| {
                error!("Failed to hash password: {err}");
                AppError::internal()
            })
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<(), AppError> {
        let parsed = PasswordHash::new(digest).map_err(|err| {
            error!("Stored password digest is unreadable: {err}");
            AppError::internal()
        })?;

        // Cost parameters come from the digest itself, so older digests keep working.
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(password_hash::Error::Password) => {
                warn!("Password verification failed");
                Err(AppError::authorization(INVALID_CREDENTIALS))
            }
            Err(err) => {
                error!("Password verification error: {err}");
                Err(AppError::internal())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use anyhow::Result;

    fn hasher() -> Result<Argon2Hasher> {
        // Low cost keeps the tests fast.
        Argon2Hasher::new(1024, 1)
    }

    #[test]
    fn hash_then_verify_succeeds() -> Result<()> {
        let hasher = hasher()?;
        for plaintext in ["secret123", "", "pässwörd with spaces", &"x".repeat(200)] {
            let digest = hasher.hash(plaintext)?;
            assert!(digest.starts_with("$argon2id$"));
            assert!(hasher.verify(plaintext, &digest).is_ok());
        }
        Ok(())
    }

    #[test]
    fn verify_rejects_other_plaintext() -> Result<()> {
        let hasher = hasher()?;
        let digest = hasher.hash("secret123")?;
        let err = hasher.verify("secret124", &digest).err();
        assert_eq!(
            err.map(|err| (err.kind(), err.message().to_string())),
            Some((ErrorKind::Authorization, INVALID_CREDENTIALS.to_string()))
        );
        Ok(())
    }

    #[test]
    fn salts_differ_between_hashes() -> Result<()> {
        let hasher = hasher()?;
        assert_ne!(hasher.hash("secret123")?, hasher.hash("secret123")?);
        Ok(())
    }

    #[test]
    fn unreadable_digest_is_internal() -> Result<()> {
        let hasher = hasher()?;
        let err = hasher.verify("secret123", "not-a-phc-string").err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Internal));
        Ok(())
    }

    #[test]
    fn digest_from_other_cost_still_verifies() -> Result<()> {
        let digest = Argon2Hasher::new(2048, 2)?.hash("secret123")?;
        assert!(hasher()?.verify("secret123", &digest).is_ok());
        Ok(())
    }

    #[test]
    fn invalid_cost_is_rejected() {
        assert!(Argon2Hasher::new(1, 0).is_err());
    }
}
