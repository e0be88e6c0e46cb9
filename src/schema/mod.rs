//! The shared schema data model: field trees, collections, and the naming
//! rules that tie both mapping walks to the same storage layout.

pub mod collection;
pub mod field;
pub mod naming;

pub use collection::{Collection, IdKind, SchemaRegistry};
pub use field::{
    ArrayField, Block, BlocksField, CollapsibleField, Field, GroupField, RelationTarget,
    RelationshipField, RowField, ScalarField, ScalarKind, SelectField, Tab, TabsField,
};
