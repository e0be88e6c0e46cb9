//! The field schema tree.
//!
//! A collection's schema is an ordered list of [`Field`] nodes. Fields are a
//! tagged union over scalars, containers that own child fields (groups,
//! arrays, block sets, rows, collapsibles, tab sets), and references to other
//! collections. Anonymous containers (row, collapsible, unnamed tab) have no
//! name and never consume a path segment; everything else is addressable by
//! its name.

use serde::{Deserialize, Serialize};

/// Scalar value kinds stored directly in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Text,
    Number,
    Email,
    Date,
    Checkbox,
    Code,
    Json,
    Point,
}

/// A scalar field. `has_many` scalars overflow into the shared `_texts` /
/// `_numbers` tables, one row per element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub kind: ScalarKind,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub has_many: bool,
}

impl ScalarField {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            localized: false,
            has_many: false,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn has_many(mut self) -> Self {
        self.has_many = true;
        self
    }
}

/// A select field over a fixed option list. `has_many` selects get a
/// dedicated per-field overflow table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectField {
    pub name: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub has_many: bool,
}

impl SelectField {
    pub fn new(name: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            name: name.into(),
            options,
            localized: false,
            has_many: false,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn has_many(mut self) -> Self {
        self.has_many = true;
        self
    }
}

/// A named group of fields, stored as prefixed columns on the parent table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupField {
    pub name: String,
    #[serde(default)]
    pub localized: bool,
    pub fields: Vec<Field>,
}

impl GroupField {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            localized: false,
            fields,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }
}

/// A repeatable group, stored in its own child table joined on parent id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayField {
    pub name: String,
    #[serde(default)]
    pub localized: bool,
    pub fields: Vec<Field>,
}

impl ArrayField {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            localized: false,
            fields,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }
}

/// One named variant of a blocks field, stored in its own child table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub slug: String,
    pub fields: Vec<Field>,
}

impl Block {
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            fields,
        }
    }
}

/// A polymorphic array whose elements are tagged by `blockType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocksField {
    pub name: String,
    #[serde(default)]
    pub localized: bool,
    pub blocks: Vec<Block>,
}

impl BlocksField {
    pub fn new(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            name: name.into(),
            localized: false,
            blocks,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    /// Find a declared block variant by its slug.
    pub fn block(&self, slug: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.slug == slug)
    }
}

/// Anonymous presentational container; its children live at the parent level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowField {
    pub fields: Vec<Field>,
}

/// Anonymous collapsible container; identical to a row for storage purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapsibleField {
    pub fields: Vec<Field>,
}

/// One tab of a tab set. Named tabs behave like groups (column prefix and
/// sub-path); unnamed tabs are transparent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub localized: bool,
    pub fields: Vec<Field>,
}

impl Tab {
    pub fn named(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: Some(name.into()),
            localized: false,
            fields,
        }
    }

    pub fn unnamed(fields: Vec<Field>) -> Self {
        Self {
            name: None,
            localized: false,
            fields,
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }
}

/// A tab set. The set itself is anonymous; addressing goes through the tabs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabsField {
    pub tabs: Vec<Tab>,
}

/// Target collection(s) of a relationship or upload field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationTarget {
    Single(String),
    Poly(Vec<String>),
}

impl RelationTarget {
    /// All candidate target slugs, one for single-target fields.
    pub fn slugs(&self) -> &[String] {
        match self {
            Self::Single(slug) => std::slice::from_ref(slug),
            Self::Poly(slugs) => slugs,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self, Self::Poly(_))
    }
}

/// A reference to one or more documents in other collections. Uploads are
/// storage-identical to relationships and share this node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipField {
    pub name: String,
    pub relation_to: RelationTarget,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub has_many: bool,
}

impl RelationshipField {
    pub fn new(name: impl Into<String>, relation_to: RelationTarget) -> Self {
        Self {
            name: name.into(),
            relation_to,
            localized: false,
            has_many: false,
        }
    }

    pub fn to_collection(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::new(name, RelationTarget::Single(slug.into()))
    }

    pub fn polymorphic(name: impl Into<String>, slugs: Vec<String>) -> Self {
        Self::new(name, RelationTarget::Poly(slugs))
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn has_many(mut self) -> Self {
        self.has_many = true;
        self
    }

    /// Routed through the shared `_rels` table rather than a plain foreign
    /// key column.
    pub fn uses_rels_table(&self) -> bool {
        self.has_many || self.relation_to.is_polymorphic()
    }
}

/// A field schema node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Field {
    Scalar(ScalarField),
    Select(SelectField),
    Group(GroupField),
    Array(ArrayField),
    Blocks(BlocksField),
    Row(RowField),
    Collapsible(CollapsibleField),
    Tabs(TabsField),
    Relationship(RelationshipField),
}

impl Field {
    pub fn text(name: impl Into<String>) -> ScalarField {
        ScalarField::new(name, ScalarKind::Text)
    }

    pub fn number(name: impl Into<String>) -> ScalarField {
        ScalarField::new(name, ScalarKind::Number)
    }

    pub fn date(name: impl Into<String>) -> ScalarField {
        ScalarField::new(name, ScalarKind::Date)
    }

    pub fn checkbox(name: impl Into<String>) -> ScalarField {
        ScalarField::new(name, ScalarKind::Checkbox)
    }

    pub fn row(fields: Vec<Field>) -> Field {
        Field::Row(RowField { fields })
    }

    pub fn collapsible(fields: Vec<Field>) -> Field {
        Field::Collapsible(CollapsibleField { fields })
    }

    pub fn tabs(tabs: Vec<Tab>) -> Field {
        Field::Tabs(TabsField { tabs })
    }

    /// The addressable name of this field, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Field::Scalar(f) => Some(&f.name),
            Field::Select(f) => Some(&f.name),
            Field::Group(f) => Some(&f.name),
            Field::Array(f) => Some(&f.name),
            Field::Blocks(f) => Some(&f.name),
            Field::Relationship(f) => Some(&f.name),
            Field::Row(_) | Field::Collapsible(_) | Field::Tabs(_) => None,
        }
    }

    /// Whether this field's values vary per locale.
    pub fn localized(&self) -> bool {
        match self {
            Field::Scalar(f) => f.localized,
            Field::Select(f) => f.localized,
            Field::Group(f) => f.localized,
            Field::Array(f) => f.localized,
            Field::Blocks(f) => f.localized,
            Field::Relationship(f) => f.localized,
            Field::Row(_) | Field::Collapsible(_) | Field::Tabs(_) => false,
        }
    }
}

impl From<ScalarField> for Field {
    fn from(f: ScalarField) -> Self {
        Field::Scalar(f)
    }
}

impl From<SelectField> for Field {
    fn from(f: SelectField) -> Self {
        Field::Select(f)
    }
}

impl From<GroupField> for Field {
    fn from(f: GroupField) -> Self {
        Field::Group(f)
    }
}

impl From<ArrayField> for Field {
    fn from(f: ArrayField) -> Self {
        Field::Array(f)
    }
}

impl From<BlocksField> for Field {
    fn from(f: BlocksField) -> Self {
        Field::Blocks(f)
    }
}

impl From<RelationshipField> for Field {
    fn from(f: RelationshipField) -> Self {
        Field::Relationship(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_containers_have_no_name() {
        let row = Field::row(vec![Field::text("a").into()]);
        assert!(row.name().is_none());
        assert!(!row.localized());
    }

    #[test]
    fn builders_set_flags() {
        let field: Field = Field::text("title").localized().into();
        assert_eq!(field.name(), Some("title"));
        assert!(field.localized());

        let rel = RelationshipField::to_collection("author", "users").has_many();
        assert!(rel.uses_rels_table());
        let plain = RelationshipField::to_collection("author", "users");
        assert!(!plain.uses_rels_table());
        let poly = RelationshipField::polymorphic(
            "owner",
            vec!["users".to_string(), "teams".to_string()],
        );
        assert!(poly.uses_rels_table());
        assert_eq!(poly.relation_to.slugs().len(), 2);
    }
}
