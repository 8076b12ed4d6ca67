//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: `/health`, `/routes` and the proxy catch-all
//! - Wire up middleware (request counting, request ID, tracing, CORS)
//! - Cap concurrent proxied requests, streaming bodies included
//! - Hold the live routing state and swap it on config reload
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::config::{ProxyConfig, RouteTable};
use crate::error::ProxyError;
use crate::http::forward::{ForwardSettings, Forwarder};
use crate::http::request::ProxySession;
use crate::http::response::hold_until_done;
use crate::observability::{HealthSnapshot, ProxyStats};
use crate::routing::Router as ProxyRouter;

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything derived from config that a request needs.
///
/// Replaced wholesale on reload; a request keeps the snapshot it started with.
#[derive(Debug)]
pub struct RouteState {
    pub router: ProxyRouter,
    pub routes: RouteTable,
    pub forward: ForwardSettings,
}

impl RouteState {
    /// Build routing and forwarding settings from `config`.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let mut auth_headers = HeaderMap::new();
        for (name, value) in &config.security.auth_headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    auth_headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid auth header"),
            }
        }

        Self {
            router: ProxyRouter::from_config(&config.routes, &config.default),
            routes: config.routes.clone(),
            forward: ForwardSettings {
                timeout: Duration::try_from_secs_f64(config.proxy.timeout)
                    .unwrap_or(FALLBACK_TIMEOUT),
                auth_headers,
            },
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routing: Arc<ArcSwap<RouteState>>,
    pub forwarder: Forwarder,
    pub stats: Arc<ProxyStats>,
    /// One permit per proxied request, held until its response body ends.
    pub in_flight: Arc<Semaphore>,
}

impl AppState {
    /// Fresh state for `config`. The in-flight cap is fixed for the process.
    pub fn new(config: &ProxyConfig) -> Self {
        let permits = config.proxy.max_connections.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            routing: Arc::new(ArcSwap::from_pointee(RouteState::from_config(config))),
            forwarder: Forwarder::new(),
            stats: Arc::new(ProxyStats::new()),
            in_flight: Arc::new(Semaphore::new(permits)),
        }
    }
}

/// Body of `GET /routes`.
#[derive(Debug, Serialize)]
struct RoutesListing {
    routes: RouteTable,
    default: String,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let state = AppState::new(&config);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let stats = Arc::clone(&state.stats);

        let mut router = Router::new()
            .route(
                "/health",
                on(passthrough_methods(), proxy_handler).get(health_handler),
            )
            .route(
                "/routes",
                on(passthrough_methods(), proxy_handler).get(routes_handler),
            )
            .route("/", on(proxy_methods(), proxy_handler))
            .route("/{*path}", on(proxy_methods(), proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if config.security.cors_enabled {
            router = router.layer(CorsLayer::very_permissive());
        }

        // Outermost: every request is counted, CORS preflights included.
        router.layer(middleware::from_fn_with_state(stats, count_requests))
    }

    /// Run the server on `listener` until `shutdown` fires.
    ///
    /// Every config received on `config_updates` replaces the routing state.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        let state = self.state.clone();
        let initial = self.config.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                warn_on_restart_only_changes(&initial, &new_config);
                apply_config(&state, &new_config);
            }
        });

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Shared request/error counters.
    pub fn stats(&self) -> Arc<ProxyStats> {
        Arc::clone(&self.state.stats)
    }
}

/// Swap in routing state built from `config`.
pub fn apply_config(state: &AppState, config: &ProxyConfig) {
    state
        .routing
        .store(Arc::new(RouteState::from_config(config)));
    tracing::info!(routes = config.routes.len(), "Routing configuration reloaded");
}

fn warn_on_restart_only_changes(current: &ProxyConfig, new: &ProxyConfig) {
    if current.proxy.host != new.proxy.host
        || current.proxy.port != new.proxy.port
        || current.proxy.max_connections != new.proxy.max_connections
        || current.security.cors_enabled != new.security.cors_enabled
    {
        tracing::warn!("Bind address, max_connections and CORS changes take effect after restart");
    }
}

fn proxy_methods() -> MethodFilter {
    MethodFilter::GET.or(MethodFilter::HEAD).or(passthrough_methods())
}

// Methods on `/health` and `/routes` that still go to the backend.
fn passthrough_methods() -> MethodFilter {
    MethodFilter::POST
        .or(MethodFilter::PUT)
        .or(MethodFilter::DELETE)
        .or(MethodFilter::PATCH)
        .or(MethodFilter::OPTIONS)
}

async fn count_requests(
    State(stats): State<Arc<ProxyStats>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    stats.record_request();
    next.run(request).await
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthSnapshot> {
    Json(state.stats.snapshot())
}

async fn routes_handler(State(state): State<AppState>) -> Json<RoutesListing> {
    let routing = state.routing.load();
    Json(RoutesListing {
        routes: routing.routes.clone(),
        default: routing.router.default_target().to_string(),
    })
}

/// Resolves the target for a request and forwards it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Ok(permit) = Arc::clone(&state.in_flight).acquire_owned().await else {
        state.stats.record_error();
        return ProxyError::UpstreamProtocol.into_response();
    };
    let routing = state.routing.load_full();
    let path = request.uri().path().to_string();

    let result = match ProxySession::resolve(request, &routing.router) {
        Ok(session) => {
            tracing::debug!(
                path = %path,
                effective_host = %session.effective_host,
                source = ?session.host_source,
                backend = %session.target,
                "Route resolved"
            );
            state.forwarder.forward(session, &routing.forward).await
        }
        Err(err) => {
            tracing::warn!(path = %path, "No route found for host");
            Err(err)
        }
    };

    match result {
        Ok(response) => response.map(|body| hold_until_done(body, permit)),
        Err(err) => {
            state.stats.record_error();
            err.into_response()
        }
    }
}
