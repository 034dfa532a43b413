//! Auth configuration and the state shared by auth handlers and gates.

use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;

use super::cookies::CookieConfig;
use crate::auth::{
    token::{ACCESS_TOKEN_TTL_SECONDS, REFRESH_TOKEN_TTL_SECONDS},
    AuthService, TokenCodec,
};

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_PASSWORD_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_PASSWORD_ITERATIONS: u32 = 2;

#[derive(Clone)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    cookie_secure: bool,
    password_memory_kib: u32,
    password_iterations: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
            access_secret,
            refresh_secret,
            access_ttl_seconds: ACCESS_TOKEN_TTL_SECONDS,
            refresh_ttl_seconds: REFRESH_TOKEN_TTL_SECONDS,
            cookie_secure: true,
            password_memory_kib: DEFAULT_PASSWORD_MEMORY_KIB,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
        }
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_password_cost(mut self, memory_kib: u32, iterations: u32) -> Self {
        self.password_memory_kib = memory_kib;
        self.password_iterations = iterations;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_secret(&self) -> &SecretString {
        &self.access_secret
    }

    #[must_use]
    pub fn refresh_secret(&self) -> &SecretString {
        &self.refresh_secret
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn password_memory_kib(&self) -> u32 {
        self.password_memory_kib
    }

    #[must_use]
    pub fn password_iterations(&self) -> u32 {
        self.password_iterations
    }

    #[must_use]
    pub fn cookie_config(&self) -> CookieConfig {
        CookieConfig {
            secure: self.cookie_secure,
            access_max_age: self.access_ttl_seconds,
            refresh_max_age: self.refresh_ttl_seconds,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

/// Shared by every auth handler through an `Extension<Arc<AuthState>>`.
#[derive(Clone)]
pub struct AuthState {
    service: Arc<dyn AuthService>,
    tokens: Arc<dyn TokenCodec>,
    cookies: CookieConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(
        service: Arc<dyn AuthService>,
        tokens: Arc<dyn TokenCodec>,
        cookies: CookieConfig,
    ) -> Self {
        Self {
            service,
            tokens,
            cookies,
        }
    }

    #[must_use]
    pub fn service(&self) -> &dyn AuthService {
        self.service.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &dyn TokenCodec {
        self.tokens.as_ref()
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_max_ages_follow_ttls() {
        let config = AuthConfig::new(
            SecretString::from("access"),
            SecretString::from("refresh"),
        )
        .with_access_ttl_seconds(60)
        .with_refresh_ttl_seconds(120)
        .with_cookie_secure(false);

        let cookies = config.cookie_config();
        assert_eq!(cookies.access_max_age, 60);
        assert_eq!(cookies.refresh_max_age, 120);
        assert!(!cookies.secure);
    }

    #[test]
    fn debug_hides_secrets() {
        let config = AuthConfig::new(
            SecretString::from("access-value"),
            SecretString::from("refresh-value"),
        );
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("access-value"));
        assert!(!rendered.contains("refresh-value"));
    }
}
