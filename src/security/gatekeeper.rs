//! Request gatekeeper.
//!
//! Every request passes through [`gatekeeper_middleware`] once:
//!
//! ```text
//! classify path
//!     → API route (not the login endpoint)?  RateLimiter  → 429 + Retry-After
//!     → protected route?                     AccessGuard  → 401 / 303 / pass through
//!     → next handler
//! ```
//!
//! All gatekeeper state lives in one explicitly constructed
//! [`GatekeeperState`], shared through `Arc`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header::SET_COOKIE, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{CredentialTransport, GatekeeperConfig, Secrets};
use crate::http::request::client_key;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::routing::RouteClassifier;
use crate::security::access_control::{AccessGuard, Denial};
use crate::security::cookie::CookieSettings;
use crate::security::credential::{CredentialError, CredentialSigner};
use crate::security::login_throttle::LoginThrottle;
use crate::security::password::PasswordVerifier;
use crate::security::rate_limit::{RateDecision, RateLimiter};

/// Everything the gatekeeper needs per request.
#[derive(Debug)]
pub struct GatekeeperState {
    pub classifier: RouteClassifier,
    pub rate_limiter: RateLimiter,
    pub login_throttle: LoginThrottle,
    pub guard: AccessGuard,
    pub signer: CredentialSigner,
    pub passwords: PasswordVerifier,
    pub transport: CredentialTransport,
}

impl GatekeeperState {
    pub fn new(config: &GatekeeperConfig, secrets: &Secrets) -> Self {
        let ttl = Duration::from_secs(config.access.token_ttl_secs);
        let signer = CredentialSigner::new(&secrets.jwt_secret, ttl);
        let cookies = CookieSettings {
            secure: config.environment.is_production(),
            max_age_secs: config.access.token_ttl_secs,
        };

        Self {
            classifier: RouteClassifier::from_config(&config.access),
            rate_limiter: RateLimiter::new(&config.rate_limit),
            login_throttle: LoginThrottle::new(&config.login_throttle),
            guard: AccessGuard::new(signer.clone(), cookies, &config.access, &config.timeouts),
            signer,
            passwords: PasswordVerifier::new(&secrets.admin_password_hash),
            transport: config.access.transport,
        }
    }

    pub fn cookies(&self) -> &CookieSettings {
        self.guard.cookies()
    }

    /// Drop expired windows from both counter tables.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let pruned = self.rate_limiter.table().prune_expired(now)
            + self.login_throttle.table().prune_expired(now);
        metrics::record_tracked_clients("api", self.rate_limiter.table().len());
        metrics::record_tracked_clients("login", self.login_throttle.table().len());
        pruned
    }
}

/// Rate limit, then guard, then hand off.
pub async fn gatekeeper_middleware(
    State(state): State<Arc<GatekeeperState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let class = state.classifier.classify(request.uri().path());

    if class.rate_limited {
        let key = client_key(request.headers());
        if let RateDecision::Reject { retry_after } = state.rate_limiter.check(&key) {
            tracing::debug!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            metrics::record_rate_limited("api");
            return ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs(),
            }
            .into_response();
        }
    }

    if class.protected {
        let verdict = state.guard.authorize(request.headers()).await;
        match verdict {
            Ok(session) => {
                request.extensions_mut().insert(session);
            }
            Err(reason) => {
                log_rejection(&reason, request.uri().path());
                metrics::record_auth_failure(reason.reason());
                match state.guard.denial_for(class) {
                    Denial::Unauthorized { clear_cookie } => {
                        let mut response = ApiError::Unauthorized.into_response();
                        if clear_cookie {
                            response.headers_mut().insert(SET_COOKIE, state.cookies().clear());
                        }
                        return response;
                    }
                    Denial::Redirect { location } => {
                        let mut response = Redirect::to(&location).into_response();
                        response.headers_mut().insert(SET_COOKIE, state.cookies().clear());
                        return response;
                    }
                    Denial::PassThrough => {}
                }
            }
        }
    }

    next.run(request).await
}

fn log_rejection(reason: &CredentialError, path: &str) {
    match reason {
        CredentialError::Missing => tracing::debug!(path = %path, "No credential on protected route"),
        CredentialError::Timeout | CredentialError::Internal(_) => {
            tracing::warn!(path = %path, reason = %reason, "Credential verification failed")
        }
        _ => tracing::info!(path = %path, reason = %reason, "Credential rejected"),
    }
}

/// Periodically prune expired windows until shutdown.
pub fn spawn_sweeper(
    state: Arc<GatekeeperState>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pruned = state.prune_expired(Instant::now());
                    if pruned > 0 {
                        tracing::debug!(pruned, "Swept expired rate windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Window sweeper stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DenialPolicy;
    use crate::security::access_control::AdminSession;
    use crate::security::password::hash_password;
    use axum::{
        http::header::{COOKIE, LOCATION, RETRY_AFTER},
        http::StatusCode,
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    pub const SECRET: &str = "gatekeeper-test-secret-of-32-bytes!";
    pub const PASSWORD: &str = "let-me-in";

    pub fn secrets() -> Secrets {
        Secrets {
            jwt_secret: SECRET.to_string(),
            admin_password_hash: hash_password(PASSWORD),
        }
    }

    pub fn state_with(policy: DenialPolicy) -> Arc<GatekeeperState> {
        let mut config = GatekeeperConfig::default();
        config.access.denial_policy = policy;
        Arc::new(GatekeeperState::new(&config, &secrets()))
    }

    fn app(state: Arc<GatekeeperState>) -> Router {
        Router::new()
            .route("/api/waitlist", post(|| async { "queued" }))
            .route("/api/admin/entries", get(|| async { "entries" }))
            .route(
                "/admin",
                get(|request: Request<Body>| async move {
                    match request.extensions().get::<AdminSession>() {
                        Some(_) => "dashboard",
                        None => "shell",
                    }
                }),
            )
            .route("/", get(|| async { "home" }))
            .fallback(|| async { "upstream" })
            .layer(middleware::from_fn_with_state(state, gatekeeper_middleware))
    }

    fn request(method: &str, uri: &str, ip: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ip) = ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn text(response: Response) -> String {
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_fifty_first_api_request_is_rejected() {
        let app = app(state_with(DenialPolicy::ClientHandled));

        for _ in 0..50 {
            let res = app
                .clone()
                .oneshot(request("POST", "/api/waitlist", Some("1.2.3.4")))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app
            .clone()
            .oneshot(request("POST", "/api/waitlist", Some("1.2.3.4")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[RETRY_AFTER], "60");
        assert_eq!(text(res).await, r#"{"error":"Too many requests"}"#);

        // A different client still has budget.
        let res = app
            .oneshot(request("POST", "/api/waitlist", Some("5.6.7.8")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_path_with_trailing_slash_is_limited() {
        let state = state_with(DenialPolicy::ClientHandled);
        let app = app(state.clone());

        for _ in 0..50 {
            let res = app
                .clone()
                .oneshot(request("POST", "/api/auth/", Some("3.3.3.3")))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app
            .oneshot(request("POST", "/api/auth/", Some("3.3.3.3")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(state.rate_limiter.table().peek_at("3.3.3.3", Instant::now()), 51);
    }

    #[tokio::test]
    async fn test_unidentified_clients_share_a_bucket() {
        let state = state_with(DenialPolicy::ClientHandled);
        let app = app(state.clone());
        for _ in 0..3 {
            app.clone()
                .oneshot(request("POST", "/api/waitlist", None))
                .await
                .unwrap();
        }
        assert_eq!(state.rate_limiter.table().peek_at("unknown", Instant::now()), 3);
    }

    #[tokio::test]
    async fn test_pages_are_not_rate_limited() {
        let state = state_with(DenialPolicy::ClientHandled);
        let app = app(state.clone());
        for _ in 0..60 {
            let res = app.clone().oneshot(request("GET", "/", Some("1.2.3.4"))).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert!(state.rate_limiter.table().is_empty());
    }

    #[tokio::test]
    async fn test_client_handled_mode_serves_shell() {
        let app = app(state_with(DenialPolicy::ClientHandled));
        let res = app.oneshot(request("GET", "/admin", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(text(res).await, "shell");
    }

    #[tokio::test]
    async fn test_redirect_mode_clears_cookie() {
        let app = app(state_with(DenialPolicy::Redirect));
        let req = Request::builder()
            .uri("/admin")
            .header(COOKIE, "auth_token=forged.token.value")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/login");
        let cookie = res.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("auth_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_valid_credential_reaches_dashboard() {
        let state = state_with(DenialPolicy::Redirect);
        let token = state.signer.issue().unwrap().token;
        let req = Request::builder()
            .uri("/admin")
            .header(COOKIE, format!("auth_token={}", token))
            .body(Body::empty())
            .unwrap();
        let res = app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(text(res).await, "dashboard");
    }

    #[tokio::test]
    async fn test_protected_api_always_unauthorized() {
        for policy in [DenialPolicy::ClientHandled, DenialPolicy::Redirect] {
            let app = app(state_with(policy));
            let req = Request::builder()
                .uri("/api/admin/entries")
                .header("x-forwarded-for", "9.9.9.9")
                .header(COOKIE, "auth_token=forged.token.value")
                .body(Body::empty())
                .unwrap();
            let res = app.oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert!(res.headers().get(LOCATION).is_none());

            let cleared = res.headers().get(SET_COOKIE).map(|v| v.to_str().unwrap().to_string());
            match policy {
                DenialPolicy::Redirect => {
                    let cookie = cleared.expect("redirect mode clears the credential");
                    assert!(cookie.starts_with("auth_token=;"));
                    assert!(cookie.contains("Max-Age=0"));
                }
                DenialPolicy::ClientHandled => assert!(cleared.is_none()),
            }
            assert_eq!(text(res).await, r#"{"error":"Unauthorized"}"#);
        }
    }

    #[tokio::test]
    async fn test_verification_timeout_denies() {
        let mut config = GatekeeperConfig::default();
        config.timeouts.verify_ms = 0;
        config.access.denial_policy = DenialPolicy::Redirect;
        let state = Arc::new(GatekeeperState::new(&config, &secrets()));
        let token = state.signer.issue().unwrap().token;
        let app = app(state);

        let api = Request::builder()
            .uri("/api/admin/entries")
            .header(COOKIE, format!("auth_token={}", token))
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(api).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let page = Request::builder()
            .uri("/admin")
            .header(COOKIE, format!("auth_token={}", token))
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(page).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_rate_limit_runs_before_guard() {
        let state = state_with(DenialPolicy::ClientHandled);
        let token = state.signer.issue().unwrap().token;
        let app = app(state);
        for _ in 0..50 {
            app.clone()
                .oneshot(request("GET", "/api/admin/entries", Some("7.7.7.7")))
                .await
                .unwrap();
        }
        let req = Request::builder()
            .uri("/api/admin/entries")
            .header("x-forwarded-for", "7.7.7.7")
            .header(COOKIE, format!("auth_token={}", token))
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_prune_covers_both_tables() {
        let state = state_with(DenialPolicy::ClientHandled);
        let t0 = Instant::now();
        state.rate_limiter.check_at("a", t0);
        state.login_throttle.admit_at("a", t0);

        assert_eq!(state.prune_expired(t0 + Duration::from_secs(61)), 1);
        assert_eq!(state.prune_expired(t0 + Duration::from_secs(901)), 1);
        assert!(state.rate_limiter.table().is_empty());
        assert!(state.login_throttle.table().is_empty());
    }
}
