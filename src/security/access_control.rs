//! Access guard for the protected area.
//!
//! Verifies the admin credential on protected routes and decides what a
//! failure turns into. Every failure reason collapses to the same outward
//! response; the reason itself only reaches logs and metrics.

use std::time::Duration;

use axum::http::HeaderMap;

use crate::config::{AccessConfig, DenialPolicy, TimeoutConfig};
use crate::routing::RouteClass;
use crate::security::cookie::{extract_token, CookieSettings};
use crate::security::credential::{Claims, CredentialError, CredentialSigner};

/// Context attached to requests carrying a valid admin credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminSession {
    pub role: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl From<Claims> for AdminSession {
    fn from(claims: Claims) -> Self {
        Self {
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// What the gatekeeper does with a request that failed the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// 401 JSON; used for protected API routes. In redirect mode the
    /// credential cookie is cleared as well.
    Unauthorized { clear_cookie: bool },
    /// 303 to the login page with the credential cookie cleared.
    Redirect { location: String },
    /// Forward anyway; the page asks `/api/auth/session` and shows a prompt.
    PassThrough,
}

#[derive(Debug)]
pub struct AccessGuard {
    signer: CredentialSigner,
    cookies: CookieSettings,
    policy: DenialPolicy,
    login_path: String,
    verify_timeout: Duration,
}

impl AccessGuard {
    pub fn new(
        signer: CredentialSigner,
        cookies: CookieSettings,
        access: &AccessConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            signer,
            cookies,
            policy: access.denial_policy,
            login_path: access.login_path.clone(),
            verify_timeout: Duration::from_millis(timeouts.verify_ms),
        }
    }

    pub fn policy(&self) -> DenialPolicy {
        self.policy
    }

    pub fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    /// Verify the credential presented in `headers`.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<AdminSession, CredentialError> {
        let token = extract_token(headers).ok_or(CredentialError::Missing)?;
        self.signer
            .verify_within(token, self.verify_timeout)
            .await
            .map(AdminSession::from)
    }

    /// How to answer a failed guard on a route of class `class`.
    pub fn denial_for(&self, class: RouteClass) -> Denial {
        if class.api {
            return Denial::Unauthorized {
                clear_cookie: self.policy == DenialPolicy::Redirect,
            };
        }
        match self.policy {
            DenialPolicy::Redirect => Denial::Redirect {
                location: self.login_path.clone(),
            },
            DenialPolicy::ClientHandled => Denial::PassThrough,
        }
    }
}
