use crate::api::{self, handlers::auth::AuthConfig, ServerConfig};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub frontend_base_url: String,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the auth settings are invalid, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.access_secret, args.refresh_secret)
        .with_frontend_base_url(args.frontend_base_url)
        .with_access_ttl_seconds(args.access_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_ttl_seconds)
        .with_cookie_secure(args.cookie_secure)
        .with_password_cost(args.password_memory_kib, args.password_iterations);

    debug!("Auth config: {:?}", auth_config);

    let server = ServerConfig {
        port: args.port,
        dsn: args.dsn,
        db_max_connections: args.db_max_connections,
    };

    api::new(server, auth_config).await
}
