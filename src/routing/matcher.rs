//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive)
//! - Match path prefix (case-sensitive, segment-aware)
//! - Match method and header conditions
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::{HeaderName, Method, Request};

use crate::routing::definition::{Component, DefinitionError};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get("host")
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host())
            .map(|h| h.to_lowercase() == self.expected_host)
            .unwrap_or(false)
    }
}

/// Matches any of several path prefixes on segment boundaries.
///
/// `/svc1` matches `/svc1` and `/svc1/x` but not `/svc10`.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefixes: Vec<String>,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::any(vec![prefix.into()])
    }

    pub fn any(prefixes: Vec<String>) -> Self {
        Self {
            prefixes: prefixes.iter().map(|p| normalize_prefix(p)).collect(),
        }
    }

    fn matches_path(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            if prefix == "/" {
                return true;
            }
            match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }
}

/// `/svc1/**` and `/svc1/` both become `/svc1`.
fn normalize_prefix(pattern: &str) -> String {
    let trimmed = pattern.trim();
    let trimmed = trimmed.strip_suffix("/**").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matches_path(req.uri().path())
    }
}

/// Matches one of a set of HTTP methods.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.methods.iter().any(|m| m == req.method())
    }
}

/// Matches a header's presence, or its exact value when one is given.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: HeaderName,
    value: Option<String>,
}

impl HeaderMatcher {
    pub fn new(name: HeaderName, value: Option<String>) -> Self {
        Self { name, value }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        let mut values = req.headers().get_all(&self.name).iter().peekable();
        match &self.value {
            None => values.peek().is_some(),
            Some(expected) => values.any(|v| v.to_str().map(|v| v == expected).unwrap_or(false)),
        }
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}

/// Compile a predicate declaration into a matcher.
pub fn build_predicate(component: &Component) -> Result<Box<dyn Matcher>, DefinitionError> {
    let name = component.name.as_str();

    if component.is("Path") || component.is("PathPrefix") {
        let patterns = component.values();
        if patterns.is_empty() {
            return Err(DefinitionError::invalid_argument(name, "no path pattern given"));
        }
        if let Some(p) = patterns.iter().find(|p| has_wildcard(p)) {
            return Err(DefinitionError::invalid_argument(
                name,
                format!("'{p}': only trailing '/**' wildcards are supported"),
            ));
        }
        return Ok(Box::new(PathPrefixMatcher::any(patterns)));
    }

    if component.is("Method") {
        let methods = component
            .values()
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| {
                Method::from_bytes(v.to_ascii_uppercase().as_bytes())
                    .map_err(|_| DefinitionError::invalid_argument(name, format!("'{v}' is not a method")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if methods.is_empty() {
            return Err(DefinitionError::invalid_argument(name, "no method given"));
        }
        return Ok(Box::new(MethodMatcher::new(methods)));
    }

    if component.is("Header") {
        let header = component
            .arg(&["header", "name"], 0)
            .ok_or_else(|| DefinitionError::invalid_argument(name, "missing header name"))?;
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| DefinitionError::invalid_argument(name, e.to_string()))?;
        let value = component
            .arg(&["value", "regexp"], 1)
            .filter(|v| !v.is_empty());
        return Ok(Box::new(HeaderMatcher::new(header, value)));
    }

    if component.is("Host") {
        let host = component
            .arg(&["host", "pattern", "patterns"], 0)
            .ok_or_else(|| DefinitionError::invalid_argument(name, "missing host"))?;
        if host.contains('*') {
            return Err(DefinitionError::invalid_argument(name, "host wildcards are not supported"));
        }
        return Ok(Box::new(HostMatcher::new(host)));
    }

    Err(DefinitionError::UnknownPredicate(component.name.clone()))
}

fn has_wildcard(pattern: &str) -> bool {
    let body = pattern.trim().strip_suffix("/**").unwrap_or(pattern);
    body.contains('*') || body.contains('{') || body.contains('?')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::definition::ComponentDescriptor;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::default())
            .unwrap()
    }

    fn shortcut(text: &str) -> Component {
        ComponentDescriptor::Shortcut(text.into()).normalize()
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        let req1 = Request::builder()
            .header("Host", "example.com")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req1));

        let req2 = Request::builder()
            .header("Host", "EXAMPLE.COM")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req2)); // Case insensitive

        let req3 = Request::builder()
            .header("Host", "other.com")
            .body(Body::default())
            .unwrap();
        assert!(!matcher.matches(&req3));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches(&request("GET", "http://example.com/api/v1")));
        assert!(matcher.matches(&request("GET", "/api")));
        assert!(!matcher.matches(&request("GET", "http://example.com/images")));
        assert!(!matcher.matches(&request("GET", "/apis")));
    }

    #[test]
    fn test_path_pattern_normalization() {
        let matcher = PathPrefixMatcher::any(vec!["/svc1/**".into(), "svc2/".into()]);
        assert!(matcher.matches(&request("GET", "/svc1/x")));
        assert!(matcher.matches(&request("GET", "/svc2")));
        assert!(!matcher.matches(&request("GET", "/other")));

        let catch_all = PathPrefixMatcher::new("/**");
        assert!(catch_all.matches(&request("GET", "/anything/at/all")));
    }

    #[test]
    fn test_method_and_header_matchers() {
        let method = build_predicate(&shortcut("Method=get, POST")).unwrap();
        assert!(method.matches(&request("GET", "/")));
        assert!(method.matches(&request("POST", "/")));
        assert!(!method.matches(&request("DELETE", "/")));

        let header = build_predicate(&shortcut("Header=X-Env, prod")).unwrap();
        let prod = Request::builder()
            .header("x-env", "prod")
            .body(Body::default())
            .unwrap();
        let staging = Request::builder()
            .header("x-env", "staging")
            .body(Body::default())
            .unwrap();
        assert!(header.matches(&prod));
        assert!(!header.matches(&staging));

        let presence = build_predicate(&shortcut("Header=X-Env")).unwrap();
        assert!(presence.matches(&staging));
        assert!(!presence.matches(&request("GET", "/")));
    }

    #[test]
    fn test_and_matcher_requires_all() {
        let matcher = AndMatcher::new(vec![
            Box::new(PathPrefixMatcher::new("/svc1")),
            Box::new(MethodMatcher::new(vec![Method::GET])),
        ]);
        assert!(matcher.matches(&request("GET", "/svc1/x")));
        assert!(!matcher.matches(&request("POST", "/svc1/x")));

        let empty = AndMatcher::new(vec![]);
        assert!(empty.matches(&request("PATCH", "/whatever")));
    }

    #[test]
    fn test_build_predicate_rejects_unsupported_patterns() {
        assert!(matches!(
            build_predicate(&shortcut("Path=/svc/*/x")),
            Err(DefinitionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            build_predicate(&shortcut("Host=**.example.com")),
            Err(DefinitionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            build_predicate(&shortcut("Path")),
            Err(DefinitionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            build_predicate(&shortcut("Weight=group1, 8")),
            Err(DefinitionError::UnknownPredicate(_))
        ));
    }
}
