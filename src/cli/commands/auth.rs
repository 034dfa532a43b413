use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::auth::token::MAX_TOKEN_TTL_SECONDS;

pub const ARG_ACCESS_SECRET: &str = "access-secret";
pub const ARG_REFRESH_SECRET: &str = "refresh-secret";
pub const ARG_ACCESS_TTL_SECONDS: &str = "access-ttl-seconds";
pub const ARG_REFRESH_TTL_SECONDS: &str = "refresh-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_PASSWORD_MEMORY_KIB: &str = "password-memory-kib";
pub const ARG_PASSWORD_ITERATIONS: &str = "password-iterations";

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_cookie_args(command);
    with_password_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long(ARG_ACCESS_SECRET)
                .help("HMAC secret for access tokens")
                .env("STOREFRONT_ACCESS_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long(ARG_REFRESH_SECRET)
                .help("HMAC secret for refresh tokens, must differ from the access secret")
                .env("STOREFRONT_REFRESH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_SECONDS)
                .long(ARG_ACCESS_TTL_SECONDS)
                .help("Access token and cookie lifetime in seconds")
                .env("STOREFRONT_ACCESS_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_SECONDS)
                .long(ARG_REFRESH_TTL_SECONDS)
                .help("Refresh token and cookie lifetime in seconds")
                .env("STOREFRONT_REFRESH_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
}

fn with_cookie_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark auth cookies as Secure (disable only for local HTTP)")
                .env("STOREFRONT_COOKIE_SECURE")
                .default_value("true")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL allowed by CORS with credentials")
                .env("STOREFRONT_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
}

fn with_password_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PASSWORD_MEMORY_KIB)
                .long(ARG_PASSWORD_MEMORY_KIB)
                .help("Argon2 memory cost in KiB")
                .env("STOREFRONT_PASSWORD_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_PASSWORD_ITERATIONS)
                .long(ARG_PASSWORD_ITERATIONS)
                .help("Argon2 iteration count")
                .env("STOREFRONT_PASSWORD_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
}

/// Auth settings parsed from the command line.
#[derive(Debug)]
pub struct Options {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub frontend_base_url: String,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = |name: &str| -> Result<SecretString> {
            matches
                .get_one::<String>(name)
                .map(|value| SecretString::from(value.clone()))
                .with_context(|| format!("missing required argument: --{name}"))
        };

        Ok(Self {
            access_secret: secret(ARG_ACCESS_SECRET)?,
            refresh_secret: secret(ARG_REFRESH_SECRET)?,
            access_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TTL_SECONDS)
                .copied()
                .unwrap_or(1800),
            refresh_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TTL_SECONDS)
                .copied()
                .unwrap_or(604_800),
            cookie_secure: matches
                .get_one::<bool>(ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(true),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            password_memory_kib: matches
                .get_one::<u32>(ARG_PASSWORD_MEMORY_KIB)
                .copied()
                .unwrap_or(19_456),
            password_iterations: matches
                .get_one::<u32>(ARG_PASSWORD_ITERATIONS)
                .copied()
                .unwrap_or(2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn command() -> Command {
        with_args(Command::new("storefront"))
    }

    #[test]
    fn parses_flags() -> Result<()> {
        temp_env::with_vars_unset(
            [
                "STOREFRONT_REFRESH_TTL_SECONDS",
                "STOREFRONT_COOKIE_SECURE",
                "STOREFRONT_FRONTEND_BASE_URL",
            ],
            || -> Result<()> {
                let matches = command().try_get_matches_from(vec![
                    "storefront",
                    "--access-secret",
                    "a-secret",
                    "--refresh-secret",
                    "r-secret",
                    "--access-ttl-seconds",
                    "60",
                    "--cookie-secure",
                    "false",
                ])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.access_secret.expose_secret(), "a-secret");
                assert_eq!(options.refresh_secret.expose_secret(), "r-secret");
                assert_eq!(options.access_ttl_seconds, 60);
                assert_eq!(options.refresh_ttl_seconds, 604_800);
                assert!(!options.cookie_secure);
                assert_eq!(options.frontend_base_url, "http://localhost:3000");
                Ok(())
            },
        )
    }

    #[test]
    fn reads_env() {
        temp_env::with_vars(
            [
                ("STOREFRONT_ACCESS_SECRET", Some("env-access")),
                ("STOREFRONT_REFRESH_SECRET", Some("env-refresh")),
                ("STOREFRONT_REFRESH_TTL_SECONDS", Some("3600")),
                ("STOREFRONT_PASSWORD_ITERATIONS", Some("3")),
            ],
            || {
                let matches = command().get_matches_from(vec!["storefront"]);
                let options = Options::parse(&matches);
                assert!(options.is_ok());
                if let Ok(options) = options {
                    assert_eq!(options.access_secret.expose_secret(), "env-access");
                    assert_eq!(options.refresh_ttl_seconds, 3600);
                    assert_eq!(options.password_iterations, 3);
                    assert!(options.cookie_secure);
                }
            },
        );
    }

    #[test]
    fn secrets_are_required() {
        temp_env::with_vars(
            [
                ("STOREFRONT_ACCESS_SECRET", None::<&str>),
                ("STOREFRONT_REFRESH_SECRET", None::<&str>),
            ],
            || {
                let result = command().try_get_matches_from(vec!["storefront"]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn rejects_oversized_ttl() {
        let result = command().try_get_matches_from(vec![
            "storefront",
            "--access-secret",
            "a",
            "--refresh-secret",
            "r",
            "--refresh-ttl-seconds",
            "1000000000000000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let result = command().try_get_matches_from(vec![
            "storefront",
            "--access-secret",
            "a",
            "--refresh-secret",
            "r",
            "--access-ttl-seconds",
            "0",
        ]);
        assert!(result.is_err());
    }
}
