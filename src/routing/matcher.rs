//! Path matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Match exact path (case-sensitive, no trailing slash tolerance)
//! - Combine conditions with OR semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes are segment-aware when they do not end in '/'
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches a path prefix.
///
/// A prefix without a trailing slash matches only on a segment boundary,
/// so `/admin` covers `/admin` and `/admin/users` but not `/administer`.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => self.prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Matches one exact path. A trailing slash is significant, as in axum routing.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, path: &str) -> bool {
        path == self.path
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/");
        assert!(matcher.matches("/api/waitlist"));
        assert!(matcher.matches("/api/"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/images"));
    }

    #[test]
    fn test_prefix_respects_segments() {
        let matcher = PathPrefixMatcher::new("/admin");
        assert!(matcher.matches("/admin"));
        assert!(matcher.matches("/admin/"));
        assert!(matcher.matches("/admin/entries"));
        assert!(!matcher.matches("/administer"));
        assert!(!matcher.matches("/Admin"));
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = ExactPathMatcher::new("/api/auth");
        assert!(matcher.matches("/api/auth"));
        assert!(!matcher.matches("/api/auth/"));
        assert!(!matcher.matches("/api/auth/session"));
        assert!(!matcher.matches("/api/authx"));
    }

    #[test]
    fn test_any_matcher() {
        let matcher = AnyMatcher::new(vec![
            Box::new(PathPrefixMatcher::new("/admin")),
            Box::new(PathPrefixMatcher::new("/api/admin")),
        ]);
        assert!(matcher.matches("/admin/x"));
        assert!(matcher.matches("/api/admin/export"));
        assert!(!matcher.matches("/api/waitlist"));
    }
}
