//! docrel maps nested, localized documents onto flat relational tables.
//!
//! A document schema is a recursive field tree (scalars, groups, tabs,
//! arrays, blocks, selects, relationships) stored across a deterministic set
//! of tables: one root table per collection plus `_locales`, `_texts`,
//! `_numbers`, `_rels`, and per-array/per-block child tables. Two walks keep
//! the document and row views consistent:
//!
//! - [`query::resolve_path`] turns a dotted filter path into the concrete
//!   table/column it lives at, accumulating the join chain and constraints
//!   into a [`query::QueryPlan`].
//! - [`transform::transform_read`] rebuilds the nested document from the
//!   flat [`transform::RowBundle`] a read round trip produced.
//!
//! Both walks derive names through [`schema::naming`], so they can never
//! disagree on the storage layout.

pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod transform;

pub use config::{LocalizationConfig, MappingConfig, ALL_LOCALES};
pub use error::{MappingError, MappingResult};
pub use query::{
    build_query, resolve_path, BuiltQuery, BuiltWhere, ColumnRef, ColumnTarget, Condition,
    Constraint, Join, JoinCondition, Operator, QueryPlan, ResolvedColumn, ResolvedField,
    ResolvedKind, Where,
};
pub use schema::{
    ArrayField, Block, BlocksField, CollapsibleField, Collection, Field, GroupField, IdKind,
    RelationTarget, RelationshipField, RowField, ScalarField, ScalarKind, SchemaRegistry,
    SelectField, Tab, TabsField,
};
pub use transform::{transform_read, Row, RowBundle};
