//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the local auth endpoints
//! - Wire up middleware (gatekeeper, tracing, limits, request ID)
//! - Forward everything else to the upstream site renderer
//! - Run the window sweeper alongside the listener
//!
//! # Layer order (outermost first)
//! ```text
//! set request id → trace → propagate request id → concurrency limit
//!     → timeout → body limit → metrics → gatekeeper → auth handlers | proxy
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{FromRef, State},
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        Request, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::setup_auth_router;
use crate::config::{GatekeeperConfig, Secrets};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::ApiError;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::security::gatekeeper::{gatekeeper_middleware, spawn_sweeper, GatekeeperState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Arc<GatekeeperState>,
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
    pub upstream_timeout: Duration,
}

impl FromRef<AppState> for Arc<GatekeeperState> {
    fn from_ref(state: &AppState) -> Self {
        state.gatekeeper.clone()
    }
}

/// HTTP server for the gatekeeper.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    gatekeeper: Arc<GatekeeperState>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatekeeperConfig, secrets: &Secrets) -> Result<Self, InvalidUri> {
        let upstream: Authority = config.upstream.address.parse()?;
        let gatekeeper = Arc::new(GatekeeperState::new(&config, secrets));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            gatekeeper: gatekeeper.clone(),
            client,
            upstream,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            gatekeeper,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, state: AppState) -> Router {
        Router::new()
            .merge(setup_auth_router::<AppState>(&config.access))
            .fallback(proxy_handler)
            .layer(middleware::from_fn_with_state(
                state.gatekeeper.clone(),
                gatekeeper_middleware,
            ))
            .with_state(state)
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            denial_policy = ?self.config.access.denial_policy,
            "HTTP server starting"
        );

        let sweeper = spawn_sweeper(
            self.gatekeeper.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.subscribe(),
        );

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Window sweeper ended abnormally");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Shared gatekeeper state (counter tables, signer).
    pub fn gatekeeper(&self) -> Arc<GatekeeperState> {
        self.gatekeeper.clone()
    }
}

/// Forward a request that passed the gatekeeper to the upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Cannot build upstream URI");
            return ApiError::BadGateway.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Proxying request"
    );

    let forwarded = Request::from_parts(parts, body);
    match tokio::time::timeout(state.upstream_timeout, state.client.request(forwarded)).await {
        Ok(Ok(response)) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            ApiError::BadGateway.into_response()
        }
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                timeout = ?state.upstream_timeout,
                "Upstream timed out"
            );
            ApiError::GatewayTimeout.into_response()
        }
    }
}
