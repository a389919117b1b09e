//! The entity relationship graph and the path resolver.
//!
//! Relationships form a directed graph resolved lazily per reference.
//! Resolution is memoized by structural equality of the reference, so two
//! references that resolve to the same step list are the same join target and
//! get planned once.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::model::{Cardinality, Catalog};

use super::error::{AggregateError, AggregateResult};

/// One resolved traversal hop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelationshipStep {
    pub from: String,
    pub relationship: String,
    pub to: String,
    pub cardinality: Cardinality,
}

/// A canonical, ordered list of relationship steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedPath {
    pub steps: Vec<RelationshipStep>,
}

impl ResolvedPath {
    /// A path is to-many if any step is to-many.
    pub fn is_to_many(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.cardinality == Cardinality::ToMany)
    }

    /// The entity the path lands on.
    pub fn target(&self) -> Option<&str> {
        self.steps.last().map(|s| s.to.as_str())
    }

    /// Dotted structural key; identical keys mean identical join targets.
    pub fn key(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.relationship.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug)]
struct EntityNode {
    name: String,
}

#[derive(Debug)]
struct RelationEdge {
    name: String,
    cardinality: Cardinality,
}

/// Directed graph over the catalog's entities, one edge per declared
/// relationship.
#[derive(Debug)]
pub struct EntityGraph {
    graph: DiGraph<EntityNode, RelationEdge>,
    node_indices: HashMap<String, NodeIndex>,
    cache: RefCell<HashMap<(String, String), ResolvedPath>>,
}

impl EntityGraph {
    /// Build the graph, verifying that every relationship target exists.
    pub fn from_catalog(catalog: &Catalog) -> AggregateResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for entity in catalog.entities() {
            let idx = graph.add_node(EntityNode {
                name: entity.name.clone(),
            });
            node_indices.insert(entity.name.clone(), idx);
        }

        for entity in catalog.entities() {
            let from = node_indices[&entity.name];
            for relationship in entity.relationships() {
                let to = *node_indices
                    .get(&relationship.target)
                    .ok_or_else(|| AggregateError::UnknownEntity(relationship.target.clone()))?;
                graph.add_edge(
                    from,
                    to,
                    RelationEdge {
                        name: relationship.name.clone(),
                        cardinality: relationship.cardinality,
                    },
                );
            }
        }

        Ok(Self {
            graph,
            node_indices,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Resolve an ordered list of relationship names starting at `root` into
    /// a canonical path.
    ///
    /// Fails with `UnknownRelationship` when a segment does not resolve
    /// against the current entity, and with `CyclicPath` when a reference
    /// revisits the same hop, which could not terminate under lazy graph
    /// resolution.
    pub fn resolve(&self, root: &str, segments: &[String]) -> AggregateResult<ResolvedPath> {
        let cache_key = (root.to_string(), segments.join("."));
        if let Some(path) = self.cache.borrow().get(&cache_key) {
            return Ok(path.clone());
        }

        let mut current = *self
            .node_indices
            .get(root)
            .ok_or_else(|| AggregateError::UnknownEntity(root.to_string()))?;
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut steps = Vec::with_capacity(segments.len());

        for segment in segments {
            let from_name = self.graph[current].name.clone();
            let edge = self
                .graph
                .edges(current)
                .find(|e| e.weight().name == *segment)
                .ok_or_else(|| AggregateError::UnknownRelationship {
                    entity: from_name.clone(),
                    relationship: segment.clone(),
                })?;

            if !visited.insert((from_name.clone(), segment.clone())) {
                let mut trail: Vec<String> =
                    steps.iter().map(|s: &RelationshipStep| s.relationship.clone()).collect();
                trail.push(segment.clone());
                return Err(AggregateError::CyclicPath(trail));
            }

            let target = edge.target();
            steps.push(RelationshipStep {
                from: from_name,
                relationship: segment.clone(),
                to: self.graph[target].name.clone(),
                cardinality: edge.weight().cardinality,
            });
            current = target;
        }

        let path = ResolvedPath { steps };
        self.cache.borrow_mut().insert(cache_key, path.clone());
        Ok(path)
    }
}
