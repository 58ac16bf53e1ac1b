//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes for one generation
//! - Look up the matching route for a request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes kept sorted by priority, lower first; equal priorities keep
//!   feed order
//! - O(n) scan (acceptable for typical route counts)

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::routing::definition::{DefinitionError, RouteDefinition};

/// One immutable, generation-tagged set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    generation: u64,
    version: Option<u64>,
    routes: Vec<Arc<RouteDefinition>>,
    by_id: HashMap<String, Arc<RouteDefinition>>,
}

impl RouteTable {
    /// The table served before any snapshot was applied.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from compiled definitions. Ids must be unique.
    pub fn build(
        generation: u64,
        version: Option<u64>,
        definitions: Vec<RouteDefinition>,
    ) -> Result<Self, DefinitionError> {
        let mut by_id = HashMap::with_capacity(definitions.len());
        let mut routes = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let definition = Arc::new(definition);
            if by_id
                .insert(definition.id().to_string(), definition.clone())
                .is_some()
            {
                return Err(DefinitionError::DuplicateId(definition.id().to_string()));
            }
            routes.push(definition);
        }

        // Stable: ties keep declaration order.
        routes.sort_by_key(|r| r.priority());

        Ok(Self {
            generation,
            version,
            routes,
            by_id,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Version of the snapshot this table was built from.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RouteDefinition>> {
        self.by_id.get(id)
    }

    /// Routes in matching order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.iter()
    }

    /// First route, in priority order, whose predicates all accept `req`.
    pub fn find(&self, req: &Request<Body>) -> Option<&Arc<RouteDefinition>> {
        self.routes.iter().find(|r| r.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::definition::RouteDescriptor;

    fn definitions(payload: &str) -> Vec<RouteDefinition> {
        RouteDescriptor::parse_list(payload)
            .unwrap()
            .iter()
            .map(|d| RouteDefinition::from_descriptor(d).unwrap())
            .collect()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_lower_priority_wins() {
        let table = RouteTable::build(
            1,
            Some(10),
            definitions(
                r#"[
                {"id": "catch-all", "predicates": ["Path=/**"], "uri": "http://fallback", "priority": 100},
                {"id": "orders", "predicates": ["Path=/orders/**"], "uri": "http://orders", "priority": 1}
            ]"#,
            ),
        )
        .unwrap();

        assert_eq!(table.find(&get("/orders/1")).unwrap().id(), "orders");
        assert_eq!(table.find(&get("/users/1")).unwrap().id(), "catch-all");
        let order: Vec<_> = table.routes().map(|r| r.id().to_string()).collect();
        assert_eq!(order, vec!["orders", "catch-all"]);
    }

    #[test]
    fn test_equal_priority_keeps_declaration_order() {
        let table = RouteTable::build(
            1,
            None,
            definitions(
                r#"[
                {"id": "first", "predicates": ["Path=/a"], "uri": "http://one"},
                {"id": "second", "predicates": ["Path=/a"], "uri": "http://two"}
            ]"#,
            ),
        )
        .unwrap();
        assert_eq!(table.find(&get("/a/b")).unwrap().id(), "first");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = RouteTable::build(
            1,
            None,
            definitions(
                r#"[
                {"id": "dup", "uri": "http://one"},
                {"id": "dup", "uri": "http://two"}
            ]"#,
            ),
        )
        .unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateId("dup".into()));
    }

    #[test]
    fn test_empty_table_matches_nothing() {
        let table = RouteTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.generation(), 0);
        assert_eq!(table.version(), None);
        assert!(table.find(&get("/svc1/x")).is_none());
        assert!(table.get("svc1").is_none());
    }
}
