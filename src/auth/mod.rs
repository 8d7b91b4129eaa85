//! Admin authentication endpoints served by the gatekeeper itself.
//!
//! - `POST   {auth_path}`          login (throttled, issues the credential)
//! - `DELETE {auth_path}`          logout (clears the cookie)
//! - `GET    {auth_path}/session`  session probe for client-handled pages

pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};

use self::handlers::*;
use crate::config::AccessConfig;
use crate::security::gatekeeper::GatekeeperState;

/// Path of the session probe under `auth_path`.
pub fn session_path(access: &AccessConfig) -> String {
    format!("{}/session", access.auth_path.trim_end_matches('/'))
}

pub fn setup_auth_router<S>(access: &AccessConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<GatekeeperState>: FromRef<S>,
{
    Router::new()
        .route(&access.auth_path, post(login).delete(logout))
        .route(&session_path(access), get(session))
}
