//! HTTP surface.
//!
//! | Route | Behavior |
//! |---|---|
//! | `GET /` | 301 to `/gallery` |
//! | `GET /gallery`, `GET /gallery/{path...}` | listing, original file or thumbnail |
//! | `GET /favicon.ico` | 204 |
//! | anything else | 404 (405 for a known route with another method, HEAD included) |
//!
//! Every response, errors included, is logged by [`log_request`].
//!
//! This is the only module that knows about status codes. Each request is
//! its own tokio task; the blocking resolver work runs on the blocking pool
//! so image decoding never stalls the reactor.

use crate::cache::CacheSnapshot;
use crate::config::{ConfigError, ServerConfig};
use crate::listing::render_listing;
use crate::resolver::{DimensionQuery, RequestResolver, Resolution, ResolveError};
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::handler::Handler;
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{MethodRouter, get};
use std::fs::File;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const JPEG: &str = "image/jpeg";

type Shared = Arc<RequestResolver>;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        match self {
            ResolveError::InvalidDimension { .. } => {
                debug!("{self}");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ResolveError::NotFound(_) => {
                debug!("{self}");
                (StatusCode::NOT_FOUND, "Not Found").into_response()
            }
            ResolveError::Internal(_) => {
                error!("{self}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// The gallery router, ready to be served or driven in tests.
pub fn router(resolver: Shared) -> Router {
    Router::new()
        .route("/", get_only(root))
        .route("/favicon.ico", get_only(favicon))
        .route("/gallery", get_only(gallery_root))
        .route("/gallery/", get_only(gallery_root))
        .route("/gallery/*path", get_only(gallery))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(resolver)
}

/// GET without the implicit HEAD axum adds to `get` routes.
fn get_only<H, T>(handler: H) -> MethodRouter<Shared>
where
    H: Handler<T, Shared>,
    T: 'static,
{
    get(handler).head(method_not_allowed)
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")]).into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// One log line per request: method, URI with query, status and latency.
async fn log_request(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// The metrics router: `GET /metrics` in Prometheus text format.
pub fn metrics_router(resolver: Shared) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(resolver)
}

async fn root() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/gallery")]).into_response()
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn gallery_root(
    State(resolver): State<Shared>,
    Query(query): Query<DimensionQuery>,
) -> Response {
    serve(resolver, String::new(), query).await
}

async fn gallery(
    State(resolver): State<Shared>,
    Path(path): Path<String>,
    Query(query): Query<DimensionQuery>,
) -> Response {
    serve(resolver, path, query).await
}

async fn metrics(State(resolver): State<Shared>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        resolver.stats().to_prometheus(),
    )
        .into_response()
}

async fn serve(resolver: Shared, logical: String, query: DimensionQuery) -> Response {
    let result = tokio::task::spawn_blocking({
        let logical = logical.clone();
        move || resolver.resolve(&logical, &query)
    })
    .await;
    match result {
        Ok(Ok(resolution)) => respond(resolution),
        Ok(Err(e)) => e.into_response(),
        Err(join) => {
            error!("resolver task for {logical:?} failed: {join}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn respond(resolution: Resolution) -> Response {
    match resolution {
        Resolution::Listing { logical, entries } => {
            Html(render_listing(&logical, &entries).into_string()).into_response()
        }
        Resolution::Original(original) => {
            let mime = mime_guess::from_path(&original.path)
                .first_or_octet_stream()
                .to_string();
            stream_file(original.file, original.len, mime)
        }
        Resolution::Cached(hit) => stream_file(hit.file, hit.len, JPEG.to_string()),
        Resolution::Generated { bytes, persisted } => {
            if !persisted {
                debug!("responding with an uncached thumbnail");
            }
            (
                [
                    (header::CONTENT_TYPE, JPEG.to_string()),
                    (header::CONTENT_LENGTH, bytes.len().to_string()),
                ],
                bytes,
            )
                .into_response()
        }
    }
}

fn stream_file(file: File, len: u64, content_type: String) -> Response {
    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn watch_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    token.cancel();
}

/// Run the gallery (and optional metrics) listener until a stop signal.
///
/// Returns the final cache statistics.
pub async fn run(config: &ServerConfig) -> Result<CacheSnapshot, ServeError> {
    let resolver = Arc::new(RequestResolver::new(config));
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    if !config.folders.gallery.is_dir() {
        warn!(
            "gallery folder {} is not a directory; every request will 404",
            config.folders.gallery.display()
        );
    }

    let metrics = match config.metrics_addr()? {
        Some(addr) => {
            let listener = TcpListener::bind(addr).await?;
            info!("Starting metrics on {addr}");
            let app = metrics_router(resolver.clone());
            let token = shutdown.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await
            }))
        }
        None => None,
    };

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Start serving {} on {addr} (cache: {})",
        config.folders.gallery.display(),
        config.folders.cache.display()
    );

    let token = shutdown.clone();
    axum::serve(listener, router(resolver.clone()))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    // The gallery listener can also end on its own; take metrics down with it.
    shutdown.cancel();
    if let Some(handle) = metrics {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("metrics listener failed: {e}"),
            Err(e) => warn!("metrics task failed: {e}"),
        }
    }

    let stats = resolver.stats();
    info!("Stopping. Cache: {stats}");
    Ok(stats)
}
