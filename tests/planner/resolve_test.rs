//! Tests for entity graph construction and relationship path resolution.

use tally::model::{Cardinality, Catalog, EntitySchema};
use tally::semantic::{AggregateError, EntityGraph};

fn catalog() -> Catalog {
    Catalog::new()
        .with_entity(
            EntitySchema::new("Customer").with_to_many("orders", "Order"),
        )
        .with_entity(
            EntitySchema::new("Order")
                .with_to_one("customer", "Customer")
                .with_to_many("items", "OrderItem"),
        )
        .with_entity(EntitySchema::new("OrderItem"))
        .with_entity(EntitySchema::new("Node").with_to_one("next", "Node"))
}

fn segments(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_resolve_single_to_one_step() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();
    let path = graph.resolve("Order", &segments(&["customer"])).unwrap();

    assert_eq!(path.steps.len(), 1);
    assert_eq!(path.steps[0].from, "Order");
    assert_eq!(path.steps[0].to, "Customer");
    assert_eq!(path.steps[0].cardinality, Cardinality::ToOne);
    assert!(!path.is_to_many());
    assert_eq!(path.target(), Some("Customer"));
    assert_eq!(path.key(), "customer");
}

#[test]
fn test_multi_step_path_is_to_many_if_any_step_is() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();
    let path = graph
        .resolve("Customer", &segments(&["orders", "items"]))
        .unwrap();

    assert_eq!(path.steps.len(), 2);
    assert!(path.is_to_many());
    assert_eq!(path.target(), Some("OrderItem"));
    assert_eq!(path.key(), "orders.items");
}

#[test]
fn test_unknown_relationship() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();
    let err = graph
        .resolve("Order", &segments(&["warehouse"]))
        .unwrap_err();
    assert!(matches!(
        err,
        AggregateError::UnknownRelationship { entity, relationship }
            if entity == "Order" && relationship == "warehouse"
    ));
}

#[test]
fn test_unknown_root_entity() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();
    let err = graph.resolve("Nope", &segments(&["customer"])).unwrap_err();
    assert!(matches!(err, AggregateError::UnknownEntity(name) if name == "Nope"));
}

#[test]
fn test_cyclic_reference_is_rejected() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();
    let err = graph
        .resolve("Node", &segments(&["next", "next"]))
        .unwrap_err();
    assert!(matches!(
        err,
        AggregateError::CyclicPath(trail) if trail == vec!["next".to_string(), "next".to_string()]
    ));
}

#[test]
fn test_dangling_relationship_target_rejected() {
    let bad = Catalog::new()
        .with_entity(EntitySchema::new("Order").with_to_many("items", "Ghost"));
    let err = EntityGraph::from_catalog(&bad).unwrap_err();
    assert!(matches!(err, AggregateError::UnknownEntity(name) if name == "Ghost"));
}

#[test]
fn test_resolved_paths_are_hashable_join_targets() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();

    let mut targets = std::collections::HashSet::new();
    targets.insert(graph.resolve("Order", &segments(&["items"])).unwrap());
    targets.insert(graph.resolve("Order", &segments(&["items"])).unwrap());
    targets.insert(graph.resolve("Order", &segments(&["customer"])).unwrap());
    assert_eq!(targets.len(), 2);
}

#[test]
fn test_repeated_resolution_is_stable() {
    let catalog = catalog();
    let graph = EntityGraph::from_catalog(&catalog).unwrap();
    let first = graph.resolve("Order", &segments(&["items"])).unwrap();
    let second = graph.resolve("Order", &segments(&["items"])).unwrap();
    assert_eq!(first, second);
}
