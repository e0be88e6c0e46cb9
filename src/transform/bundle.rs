//! The flat row bundle a read produces before reconstruction.
//!
//! One database round trip yields the collection root row (with child-table
//! rows for arrays and `_locales` side-loaded under their column keys) plus
//! path-keyed side maps for relationships, has-many texts/numbers, and block
//! rows. The bundle is consumed exactly once by the row transformer and is
//! never mutated by it.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// One relational row: column name to raw value.
pub type Row = Map<String, Value>;

/// Tag key on block rows naming which block definition produced the row.
pub const BLOCK_TYPE_KEY: &str = "blockType";

/// Flat result of one read round trip.
#[derive(Debug, Clone, Default)]
pub struct RowBundle {
    /// The root table row. Array child rows ride on it as arrays of row
    /// objects under the field's column key, and localized scalar rows under
    /// `_locales`.
    pub root: Row,
    /// `_rels` rows keyed by dotted field path.
    pub relationships: HashMap<String, Vec<Row>>,
    /// `_texts` rows keyed by dotted field path.
    pub texts: HashMap<String, Vec<Row>>,
    /// `_numbers` rows keyed by dotted field path.
    pub numbers: HashMap<String, Vec<Row>>,
    /// Block child-table rows keyed by dotted field path, each tagged with
    /// `blockType`, `_order`, and optionally `_locale`/`_uuid`.
    pub blocks: HashMap<String, Vec<Row>>,
}

impl RowBundle {
    #[must_use]
    pub fn new(root: Row) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn with_relationships(mut self, path: impl Into<String>, rows: Vec<Row>) -> Self {
        self.relationships.insert(path.into(), rows);
        self
    }

    pub fn with_texts(mut self, path: impl Into<String>, rows: Vec<Row>) -> Self {
        self.texts.insert(path.into(), rows);
        self
    }

    pub fn with_numbers(mut self, path: impl Into<String>, rows: Vec<Row>) -> Self {
        self.numbers.insert(path.into(), rows);
        self
    }

    pub fn with_blocks(mut self, path: impl Into<String>, rows: Vec<Row>) -> Self {
        self.blocks.insert(path.into(), rows);
        self
    }
}
