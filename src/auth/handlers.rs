use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::CredentialTransport;
use crate::http::request::client_key;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::security::credential::CredentialError;
use crate::security::gatekeeper::GatekeeperState;
use crate::security::login_throttle::ThrottleDecision;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub expires_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// `POST /api/auth`: exchange the admin password for a credential.
///
/// The throttle is consulted before the body is even parsed, so a locked-out
/// client costs no hashing work.
pub async fn login(
    State(state): State<Arc<GatekeeperState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let client = client_key(&headers);

    if let ThrottleDecision::Reject { attempts } = state.login_throttle.admit(&client) {
        tracing::debug!(client = %client, attempts, "Login throttled");
        metrics::record_rate_limited("login");
        metrics::record_login("throttled");
        return Err(ApiError::LoginThrottled);
    }

    let request: LoginRequest = serde_json::from_slice(&body).map_err(|_| {
        metrics::record_login("bad_request");
        ApiError::InvalidBody
    })?;
    let password = match request.password.filter(|p| !p.is_empty()) {
        Some(p) => p,
        None => {
            metrics::record_login("bad_request");
            return Err(ApiError::PasswordRequired);
        }
    };

    if !state.passwords.verify(&password) {
        tracing::info!(client = %client, "Admin login failed");
        metrics::record_login("failure");
        return Err(ApiError::InvalidCredentials);
    }

    let issued = state.signer.issue().map_err(|e| {
        tracing::error!(error = %e, "Failed to issue credential");
        ApiError::Internal
    })?;
    let cookie = state.cookies().issue(&issued.token).map_err(|e| {
        tracing::error!(error = %e, "Credential is not a valid cookie value");
        ApiError::Internal
    })?;

    tracing::info!(client = %client, expires_at = issued.claims.exp, "Admin login succeeded");
    metrics::record_login("success");

    let token = match state.transport {
        CredentialTransport::Bearer => Some(issued.token),
        CredentialTransport::Cookie => None,
    };
    let body = LoginResponse {
        success: true,
        expires_at: issued.claims.exp,
        token,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `DELETE /api/auth`: drop the credential cookie.
pub async fn logout(State(state): State<Arc<GatekeeperState>>) -> Response {
    (
        [(SET_COOKIE, state.cookies().clear())],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

/// `GET /api/auth/session`: the check a protected page runs on itself.
pub async fn session(State(state): State<Arc<GatekeeperState>>, headers: HeaderMap) -> Response {
    match state.guard.authorize(&headers).await {
        Ok(session) => Json(SessionStatus {
            authenticated: true,
            role: Some(session.role),
            expires_at: Some(session.expires_at),
        })
        .into_response(),
        Err(reason) => {
            let status = Json(SessionStatus {
                authenticated: false,
                role: None,
                expires_at: None,
            });
            if reason == CredentialError::Missing {
                status.into_response()
            } else {
                tracing::debug!(reason = %reason, "Stale credential on session check");
                ([(SET_COOKIE, state.cookies().clear())], status).into_response()
            }
        }
    }
}
