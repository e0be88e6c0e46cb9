//! Collections and the schema registry.
//!
//! A [`Collection`] is a root document type: a slug, an ordered field list,
//! and the kind of its primary key. The [`SchemaRegistry`] holds every
//! collection by slug and is loaded once at startup, then shared read-only
//! across concurrent resolve/transform calls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, MappingResult};
use crate::schema::field::Field;
use crate::schema::naming;

/// Primary key kind of a collection. Foreign keys read back from join rows
/// are coerced to numbers when the target collection uses numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    #[default]
    Number,
    Text,
}

/// A root document type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub slug: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub id_kind: IdKind,
}

impl Collection {
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            fields,
            id_kind: IdKind::default(),
        }
    }

    pub fn with_id_kind(mut self, id_kind: IdKind) -> Self {
        self.id_kind = id_kind;
        self
    }

    /// Root relational table of this collection.
    pub fn table_name(&self) -> String {
        naming::collection_table_name(&self.slug)
    }
}

/// Slug-keyed lookup over every registered collection.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    collections: HashMap<String, Collection>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collection: Collection) {
        self.collections.insert(collection.slug.clone(), collection);
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.register(collection);
        self
    }

    pub fn get(&self, slug: &str) -> Option<&Collection> {
        self.collections.get(slug)
    }

    /// Like [`get`](Self::get), but failing with `UnknownCollection`.
    pub fn require(&self, slug: &str) -> MappingResult<&Collection> {
        self.get(slug).ok_or_else(|| MappingError::UnknownCollection {
            slug: slug.to_string(),
        })
    }
}
