//! Entity schemas: typed attributes and declared relationships.

use std::collections::HashMap;

use super::types::AttributeKind;

/// A typed, named accessor on an entity's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// Declared multiplicity of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// A named traversal from one entity type to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
}

/// One entity type: attributes plus outgoing relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    pub name: String,
    attributes: HashMap<String, Attribute>,
    relationships: HashMap<String, Relationship>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: HashMap::new(),
            relationships: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        let name = name.into();
        self.attributes.insert(
            name.clone(),
            Attribute { name, kind },
        );
        self
    }

    pub fn with_to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_relationship(name, target, Cardinality::ToOne)
    }

    pub fn with_to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_relationship(name, target, Cardinality::ToMany)
    }

    fn with_relationship(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        let name = name.into();
        self.relationships.insert(
            name.clone(),
            Relationship {
                name,
                target: target.into(),
                cardinality,
            },
        );
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }
}

/// The set of entity schemas a request can resolve against.
///
/// Immutable once handed to a query; registration happens up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entities: HashMap<String, EntitySchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }
}
