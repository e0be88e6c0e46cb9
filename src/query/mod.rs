//! Filter-side mapping: dotted paths to tables, columns, and join chains.

pub mod build;
pub mod filter;
pub mod plan;
pub mod resolve;

pub use build::{build_query, BuiltQuery, BuiltWhere, ResolvedCondition};
pub use filter::{Condition, Operator, Where};
pub use plan::{ColumnTarget, Constraint, Join, JoinCondition, QueryPlan};
pub use resolve::{resolve_path, ColumnRef, ResolvedColumn, ResolvedField, ResolvedKind};
