use crate::{
    api::handlers::{
        auth::{AuthConfig, AuthState},
        health,
    },
    auth::{Argon2Hasher, AuthOrchestrator, JwtCodec, PgCredentialStore, PgSessionRegistry},
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::options,
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Runtime settings for the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
}

/// Start the server
/// # Errors
/// Return error if the auth configuration is invalid, the database is
/// unreachable, or the listener fails.
pub async fn new(server: ServerConfig, auth_config: AuthConfig) -> Result<()> {
    // Reject bad secrets and hashing cost before touching the database.
    let hasher = Arc::new(
        Argon2Hasher::new(
            auth_config.password_memory_kib(),
            auth_config.password_iterations(),
        )
        .context("Invalid password hashing parameters")?,
    );
    let codec = Arc::new(
        JwtCodec::new(
            auth_config.access_secret(),
            auth_config.refresh_secret(),
            auth_config.access_ttl_seconds(),
            auth_config.refresh_ttl_seconds(),
        )
        .context("Invalid token configuration")?,
    );
    let frontend_origin = frontend_origin(auth_config.frontend_base_url())?;

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(server.db_max_connections)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&server.dsn)
        .await
        .context("Failed to connect to database")?;

    let service = AuthOrchestrator::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgSessionRegistry::new(pool.clone())),
        hasher,
        codec.clone(),
    )?;
    let auth_state = Arc::new(AuthState::new(
        Arc::new(service),
        codec,
        auth_config.cookie_config(),
    ));

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = app(auth_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(cors)
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{}", server.port)).await?;

    info!("Listening on [::]:{}", server.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

/// Documented routes plus request id, tracing, body limit and auth state.
///
/// The database pool and CORS are layered on by [`new`].
pub fn app(auth_state: Arc<AuthState>) -> Router {
    // Preflight-only `OPTIONS /health` stays out of the OpenAPI document.
    let (router, _openapi) = router().split_for_parts();
    router
        .route("/health", options(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state)),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
