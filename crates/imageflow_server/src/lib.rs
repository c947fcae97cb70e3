//! HTTP server wiring for ImageFlow (API, handlers, and shared state).

/// Bearer API key middleware.
pub mod auth;
/// Blob storage backends.
pub mod blob;
/// HTTP error mapping for API handlers.
pub mod error;
/// HTTP handlers for image, tag and system endpoints.
pub mod handlers;
/// Upload format sniffing and dimensions.
pub mod probe;
/// Image removal and the expiry sweeper.
pub mod sweep;
/// Public URL construction.
pub mod urls;

pub use blob::{BlobStore, FilesystemBlobStore, MemoryBlobStore};
pub use imageflow_core::{
    config, db, models, naming, AppError, Config, Database, DEFAULT_PAGE, DEFAULT_PAGE_LIMIT,
    DEFAULT_PORT, MAX_PAGE_LIMIT,
};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use handlers::{blobs, images, random, system, tags, upload};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Multipart framing allowance on top of the per-file limits.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    /// Construct shared application state.
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    /// - `db`: Open metadata store.
    /// - `blobs`: Blob backend holding image bytes.
    pub fn new(config: Config, db: Database, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            blobs,
        }
    }
}

/// Create the application router with all routes and middleware.
///
/// `/health`, `/api/random` and `/r2/*` are public; every other route
/// requires a bearer API key.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
///
/// # Returns
/// Configured `axum::Router`.
pub fn create_app(state: AppState, allow_public_access: bool) -> Router {
    let cors_port = state.config.port;
    create_app_with_cors_port(state, allow_public_access, cors_port)
}

/// Resolve the listener address from env var overrides and security policy.
///
/// # Arguments
/// - `config`: Server configuration containing the configured `port`.
/// - `allow_public_access`: Whether non-loopback bind targets are permitted.
///
/// # Returns
/// A validated socket address that enforces loopback when public access is disabled.
pub fn resolve_bind_address(config: &Config, allow_public_access: bool) -> SocketAddr {
    let default_bind = SocketAddr::from(([127, 0, 0, 1], config.port));
    let requested = match std::env::var("BIND") {
        Ok(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        Err(_) => default_bind,
    };

    if allow_public_access || requested.ip().is_loopback() {
        return requested;
    }

    tracing::warn!(
        "Non-loopback bind {} requested without ALLOW_PUBLIC_ACCESS; forcing 127.0.0.1",
        requested
    );
    SocketAddr::from(([127, 0, 0, 1], requested.port()))
}

fn upload_body_limit(config: &Config) -> usize {
    config
        .max_file_size
        .saturating_mul(config.max_upload_count.max(1))
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

fn cors_layer(allow_public_access: bool, cors_port: u16) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
    if allow_public_access {
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any);
    }

    let origins: Vec<HeaderValue> = [
        format!("http://localhost:{}", cors_port),
        format!("http://127.0.0.1:{}", cors_port),
    ]
    .iter()
    .filter_map(|origin| HeaderValue::from_str(origin).ok())
    .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
}

fn create_app_with_cors_port(state: AppState, allow_public_access: bool, cors_port: u16) -> Router {
    let protected = Router::new()
        .route("/api/validate-api-key", post(system::validate_api_key))
        .route("/api/upload", post(upload::upload_images))
        .route("/api/images", get(images::list_images))
        .route(
            "/api/images/:id",
            get(images::get_image)
                .put(images::update_image)
                .delete(images::delete_image),
        )
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/api/tags/batch", post(tags::batch_tags))
        .route(
            "/api/tags/:name",
            put(tags::rename_tag).delete(tags::delete_tag),
        )
        .route("/api/config", get(system::get_config))
        .route("/api/cleanup", post(system::cleanup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(system::health))
        .route("/api/random", get(random::random_image))
        .route("/r2/", get(blobs::serve_blob))
        .route("/r2/*path", get(blobs::serve_blob))
        .merge(protected)
        .with_state(state.clone())
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(upload_body_limit(&state.config)))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(allow_public_access, cors_port))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
}

fn listener_cors_port(listener: &tokio::net::TcpListener, fallback_port: u16) -> u16 {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(fallback_port)
}

/// Run the Axum server with graceful shutdown support.
///
/// # Arguments
/// - `listener`: Bound TCP listener for the server.
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
/// - `shutdown_signal`: Future that resolves when shutdown should start.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    allow_public_access: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let cors_port = listener_cors_port(&listener, state.config.port);
    let app = create_app_with_cors_port(state, allow_public_access, cors_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

#[cfg(test)]
mod tests {
    use super::{listener_cors_port, resolve_bind_address, upload_body_limit};
    use imageflow_core::{Config, DEFAULT_PORT};
    use std::net::SocketAddr;

    #[tokio::test]
    async fn listener_cors_port_uses_bound_listener_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener");
        let expected = listener.local_addr().expect("listener addr").port();
        let resolved = listener_cors_port(&listener, DEFAULT_PORT);
        assert_eq!(resolved, expected);
    }

    // Both cases share the BIND variable, so they run in one test.
    #[test]
    fn resolve_bind_address_enforces_loopback_and_falls_back() {
        let config = Config {
            port: 4040,
            ..Config::default()
        };
        std::env::remove_var("BIND");
        let loopback = resolve_bind_address(&config, false);
        assert_eq!(loopback, SocketAddr::from(([127, 0, 0, 1], 4040)));

        std::env::set_var("BIND", "0.0.0.0:4040");
        let forced = resolve_bind_address(&config, false);
        assert_eq!(forced.ip().to_string(), "127.0.0.1");
        assert_eq!(forced.port(), 4040);
        let public = resolve_bind_address(&config, true);
        assert_eq!(public, SocketAddr::from(([0, 0, 0, 0], 4040)));

        std::env::set_var("BIND", "bad:host");
        let fallback = resolve_bind_address(&config, false);
        assert_eq!(fallback, SocketAddr::from(([127, 0, 0, 1], 4040)));
        std::env::remove_var("BIND");
    }

    #[test]
    fn upload_body_limit_covers_a_full_batch() {
        let config = Config {
            max_file_size: 1_000,
            max_upload_count: 5,
            ..Config::default()
        };
        assert!(upload_body_limit(&config) >= 5_000);

        let huge = Config {
            max_file_size: usize::MAX,
            max_upload_count: 2,
            ..Config::default()
        };
        assert_eq!(upload_body_limit(&huge), usize::MAX);
    }
}
