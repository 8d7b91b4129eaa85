//! Route classification.
//!
//! # Responsibilities
//! - Decide which gatekeeper stages apply to a path
//! - Keep the login endpoint out of the general limiter
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - A path may belong to several classes at once

use crate::config::AccessConfig;
use crate::routing::matcher::{AnyMatcher, ExactPathMatcher, Matcher, PathPrefixMatcher};

/// Gatekeeper stages that apply to one request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteClass {
    /// Counted by the general rate limiter.
    pub rate_limited: bool,
    /// The login endpoint itself.
    pub auth_endpoint: bool,
    /// Requires an admin credential.
    pub protected: bool,
    /// Under the API prefix (no page to render a login prompt).
    pub api: bool,
}

/// Classifies request paths by configured prefixes.
#[derive(Debug)]
pub struct RouteClassifier {
    api: PathPrefixMatcher,
    auth: ExactPathMatcher,
    protected: AnyMatcher,
}

impl RouteClassifier {
    pub fn from_config(config: &AccessConfig) -> Self {
        let protected = config
            .protected_prefixes
            .iter()
            .map(|p| Box::new(PathPrefixMatcher::new(p.clone())) as Box<dyn Matcher>)
            .collect();

        Self {
            api: PathPrefixMatcher::new(config.api_prefix.clone()),
            auth: ExactPathMatcher::new(config.auth_path.clone()),
            protected: AnyMatcher::new(protected),
        }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let api = self.api.matches(path);
        let auth_endpoint = self.auth.matches(path);
        RouteClass {
            rate_limited: api && !auth_endpoint,
            auth_endpoint,
            protected: self.protected.matches(path),
            api,
        }
    }
}
