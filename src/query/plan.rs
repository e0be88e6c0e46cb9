//! Query plan accumulation.
//!
//! A [`QueryPlan`] is created fresh per top-level resolve call and owned by
//! that call alone. The path resolver appends joins, constraints, and select
//! columns to it as the walk descends; the external SQL builder consumes the
//! finished plan. Nothing here is shared across calls, which is what keeps
//! concurrent resolution lock-free.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A column on a table or table alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTarget {
    /// Alias if the table was aliased for this plan, otherwise the table name.
    pub table: String,
    pub column: String,
}

impl ColumnTarget {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// One condition of a join's ON clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinCondition {
    /// `left.column = right.column`
    Columns {
        left: ColumnTarget,
        right: ColumnTarget,
    },
    /// `target.column = literal`
    Value { target: ColumnTarget, value: Value },
    /// `target.column LIKE pattern` (constraint-path disambiguation)
    PathLike {
        target: ColumnTarget,
        pattern: String,
    },
}

/// One table join accumulated while walking a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    /// Set when the same table participates in the plan more than once.
    pub alias: Option<String>,
    pub conditions: Vec<JoinCondition>,
}

impl Join {
    /// The name the rest of the query should reference this join by.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// An extra equality constraint the caller must AND into the WHERE clause
/// (locale pins, block `_path` pins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Alias-or-name of the constrained table.
    pub table: String,
    pub column: String,
    pub value: Value,
}

/// Accumulator for one top-level resolve call.
#[derive(Debug, Default)]
pub struct QueryPlan {
    joins: Vec<Join>,
    constraints: Vec<Constraint>,
    select_fields: BTreeMap<String, ColumnTarget>,
    alias_counts: HashMap<String, usize>,
}

impl QueryPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a join, skipping exact duplicates so that resolving several
    /// filter leaves over the same localized field joins `_locales` once.
    pub fn add_join(&mut self, join: Join) {
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
    }

    /// Append an equality constraint, skipping exact duplicates for the same
    /// reason as [`QueryPlan::add_join`].
    pub fn add_constraint(&mut self, table: impl Into<String>, column: impl Into<String>, value: Value) {
        let constraint = Constraint {
            table: table.into(),
            column: column.into(),
            value,
        };
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }

    pub fn add_select(&mut self, key: impl Into<String>, target: ColumnTarget) {
        self.select_fields.insert(key.into(), target);
    }

    /// Allocate a deterministic alias for another use of `table` within this
    /// plan. Counters are per-table and per-plan, so identical inputs always
    /// produce identical aliases.
    pub fn alias_for(&mut self, table: &str) -> String {
        let count = self.alias_counts.entry(table.to_string()).or_insert(0);
        *count += 1;
        format!("{table}_{count}")
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn select_fields(&self) -> &BTreeMap<String, ColumnTarget> {
        &self.select_fields
    }

    pub(crate) fn checkpoint(&self) -> PlanCheckpoint {
        PlanCheckpoint {
            joins: self.joins.len(),
            constraints: self.constraints.len(),
            select_fields: self.select_fields.clone(),
            alias_counts: self.alias_counts.clone(),
        }
    }

    /// Roll back to a checkpoint taken before a speculative resolution
    /// attempt (the per-block search of a blocks field). Alias counters are
    /// restored too, so a failed attempt never consumes alias numbers and
    /// equivalent schemas plan identical aliases.
    pub(crate) fn rollback(&mut self, checkpoint: PlanCheckpoint) {
        self.joins.truncate(checkpoint.joins);
        self.constraints.truncate(checkpoint.constraints);
        self.select_fields = checkpoint.select_fields;
        self.alias_counts = checkpoint.alias_counts;
    }
}

#[derive(Debug)]
pub(crate) struct PlanCheckpoint {
    joins: usize,
    constraints: usize,
    select_fields: BTreeMap<String, ColumnTarget>,
    alias_counts: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parent_join(table: &str) -> Join {
        Join {
            table: table.to_string(),
            alias: None,
            conditions: vec![JoinCondition::Columns {
                left: ColumnTarget::new("posts", "id"),
                right: ColumnTarget::new(table, "_parent_id"),
            }],
        }
    }

    #[test]
    fn duplicate_joins_collapse() {
        let mut plan = QueryPlan::new();
        plan.add_join(parent_join("posts_locales"));
        plan.add_join(parent_join("posts_locales"));
        assert_eq!(plan.joins().len(), 1);
    }

    #[test]
    fn aliases_count_per_table() {
        let mut plan = QueryPlan::new();
        assert_eq!(plan.alias_for("posts_rels"), "posts_rels_1");
        assert_eq!(plan.alias_for("posts_rels"), "posts_rels_2");
        assert_eq!(plan.alias_for("media"), "media_1");
    }

    #[test]
    fn rollback_discards_speculative_additions() {
        let mut plan = QueryPlan::new();
        plan.add_join(parent_join("posts_locales"));
        plan.add_constraint("posts_locales", "_locale", json!("en"));

        let checkpoint = plan.checkpoint();
        plan.add_join(parent_join("posts_blocks_content"));
        plan.add_constraint("posts_blocks_content", "_locale", json!("en"));
        plan.add_select("x", ColumnTarget::new("posts_blocks_content", "text"));

        plan.rollback(checkpoint);
        assert_eq!(plan.joins().len(), 1);
        assert_eq!(plan.constraints().len(), 1);
        assert!(plan.select_fields().is_empty());
    }

    #[test]
    fn rollback_restores_alias_counters() {
        let mut plan = QueryPlan::new();
        assert_eq!(plan.alias_for("posts_rels"), "posts_rels_1");

        let checkpoint = plan.checkpoint();
        assert_eq!(plan.alias_for("posts_rels"), "posts_rels_2");
        assert_eq!(plan.alias_for("media"), "media_1");

        plan.rollback(checkpoint);
        assert_eq!(plan.alias_for("posts_rels"), "posts_rels_2");
        assert_eq!(plan.alias_for("media"), "media_1");
    }
}
