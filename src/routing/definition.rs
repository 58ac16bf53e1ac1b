//! Route descriptors (wire shape) and route definitions (compiled shape).
//!
//! # Responsibilities
//! - Deserialize the route list pushed by the config feed
//! - Accept both shortcut (`"Path=/svc/**"`) and object
//!   (`{"name": "Path", "args": {..}}`) predicate/filter declarations
//! - Compile each descriptor into an immutable [`RouteDefinition`]
//!
//! # Design Decisions
//! - Compilation is all-or-nothing per descriptor; unknown predicates and
//!   filters are errors, never silently ignored
//! - Only plain `http://` targets: balancing across instances is not done here

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::filter::{self, FilterSpec};
use crate::routing::matcher::{self, AndMatcher, Matcher};

/// Named arguments of a predicate or filter declaration.
pub type Args = BTreeMap<String, Value>;

/// Errors raised while compiling route descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("malformed route payload: {0}")]
    Malformed(String),

    #[error("route id must not be empty")]
    MissingId,

    #[error("duplicate route id '{0}'")]
    DuplicateId(String),

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("invalid arguments for '{component}': {reason}")]
    InvalidArgument { component: String, reason: String },
}

impl DefinitionError {
    pub(crate) fn invalid_argument(component: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            component: component.to_string(),
            reason: reason.into(),
        }
    }
}

/// A predicate or filter as declared in the feed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentDescriptor {
    /// `"Name=arg0, arg1"`
    Shortcut(String),
    /// `{"name": "Name", "args": {...}, "order": n}`
    Full {
        name: String,
        #[serde(default)]
        args: Args,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<i32>,
    },
}

impl ComponentDescriptor {
    /// Bring both declaration styles to a single shape.
    pub fn normalize(&self) -> Component {
        match self {
            ComponentDescriptor::Shortcut(text) => {
                let (name, rest) = match text.split_once('=') {
                    Some((name, rest)) => (name.trim(), Some(rest)),
                    None => (text.trim(), None),
                };
                let args: Args = rest
                    .map(|rest| {
                        rest.split(',')
                            .enumerate()
                            .map(|(i, v)| (positional_key(i), Value::String(v.trim().to_string())))
                            .collect()
                    })
                    .unwrap_or_default();
                Component {
                    name: name.to_string(),
                    args,
                    order: None,
                }
            }
            ComponentDescriptor::Full { name, args, order } => Component {
                name: name.trim().to_string(),
                args: args.clone(),
                order: *order,
            },
        }
    }
}

fn positional_key(index: usize) -> String {
    format!("_genkey_{index}")
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A normalised predicate or filter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub args: Args,
    pub order: Option<i32>,
}

impl Component {
    /// Look an argument up by any of `names`, falling back to `position`.
    pub fn arg(&self, names: &[&str], position: usize) -> Option<String> {
        names
            .iter()
            .find_map(|n| self.args.get(*n))
            .or_else(|| self.args.get(&positional_key(position)))
            .or_else(|| self.args.get(&format!("_{position}")))
            .and_then(value_text)
    }

    /// Every argument value; positional ones first, in order.
    pub fn values(&self) -> Vec<String> {
        let positional: Vec<String> = (0..)
            .map_while(|i| self.args.get(&positional_key(i)))
            .filter_map(value_text)
            .collect();
        if !positional.is_empty() {
            return positional;
        }
        self.args.values().filter_map(value_text).collect()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// One route as it arrives from the config feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub id: String,
    #[serde(default)]
    pub predicates: Vec<ComponentDescriptor>,
    #[serde(default)]
    pub filters: Vec<ComponentDescriptor>,
    #[serde(alias = "uri")]
    pub target: String,
    /// Lower wins when several routes match.
    #[serde(default, alias = "order")]
    pub priority: i32,
}

impl RouteDescriptor {
    /// Parse a feed payload into descriptors.
    ///
    /// Blank content and JSON `null` both mean "no routes".
    pub fn parse_list(content: &str) -> Result<Vec<RouteDescriptor>, DefinitionError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let raw: Option<Vec<Value>> = serde_json::from_str(content)
            .map_err(|e| DefinitionError::Malformed(e.to_string()))?;

        raw.unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                serde_json::from_value(value)
                    .map_err(|e| DefinitionError::Malformed(format!("route #{i}: {e}")))
            })
            .collect()
    }
}

/// Upstream address a route forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    raw: String,
    authority: Authority,
    base_path: String,
}

impl UpstreamTarget {
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidTarget {
            target: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("target must not carry a query or fragment".into()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".into()))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute upstream URI for an inbound `path?query`.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
    }
}

/// A compiled, immutable route.
#[derive(Debug)]
pub struct RouteDefinition {
    id: String,
    predicate: AndMatcher,
    filters: Vec<FilterSpec>,
    target: UpstreamTarget,
    priority: i32,
}

impl RouteDefinition {
    /// Compile a descriptor. Any invalid predicate, filter or target fails
    /// the whole route.
    pub fn from_descriptor(descriptor: &RouteDescriptor) -> Result<Self, DefinitionError> {
        let id = descriptor.id.trim();
        if id.is_empty() {
            return Err(DefinitionError::MissingId);
        }

        let target = UpstreamTarget::parse(&descriptor.target)?;

        let matchers = descriptor
            .predicates
            .iter()
            .map(|p| matcher::build_predicate(&p.normalize()))
            .collect::<Result<Vec<_>, _>>()?;

        let filters = descriptor
            .filters
            .iter()
            .enumerate()
            .map(|(i, f)| filter::build_route_filter(&f.normalize(), i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: id.to_string(),
            predicate: AndMatcher::new(matchers),
            filters,
            target,
            priority: descriptor.priority,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    /// Filters scoped to this route, in declaration order.
    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn matches(&self, req: &Request<Body>) -> bool {
        self.predicate.matches(req)
    }
}
