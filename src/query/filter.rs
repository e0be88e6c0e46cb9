//! The query filter contract.
//!
//! Callers express filters as a nested boolean tree over dotted field paths.
//! Each leaf pairs a path with an operator and a literal value; the path
//! resolver is invoked once per leaf to find the table and column the
//! comparison should run against.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    Like,
    Exists,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

/// One filter leaf: a dotted field path, an operator, and a literal value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub path: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(path: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            path: path.into(),
            operator,
            value,
        }
    }
}

/// A nested boolean filter tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Condition(Condition),
}

impl Where {
    pub fn and(branches: Vec<Where>) -> Self {
        Where::And(branches)
    }

    pub fn or(branches: Vec<Where>) -> Self {
        Where::Or(branches)
    }

    pub fn field(path: impl Into<String>, operator: Operator, value: Value) -> Self {
        Where::Condition(Condition::new(path, operator, value))
    }

    /// All condition leaves in declaration order.
    pub fn leaves(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            Where::And(branches) | Where::Or(branches) => {
                for branch in branches {
                    branch.collect_leaves(out);
                }
            }
            Where::Condition(condition) => out.push(condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_walk_nested_branches_in_order() {
        let filter = Where::and(vec![
            Where::field("title", Operator::Equals, json!("hello")),
            Where::or(vec![
                Where::field("status", Operator::In, json!(["draft", "published"])),
                Where::field("count", Operator::GreaterThan, json!(3)),
            ]),
        ]);

        let leaves = filter.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].path, "title");
        assert_eq!(leaves[1].path, "status");
        assert_eq!(leaves[2].path, "count");
    }

    #[test]
    fn operators_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&Operator::GreaterThanEqual).unwrap(),
            "\"greater_than_equal\""
        );
        assert_eq!(
            serde_json::from_str::<Operator>("\"not_equals\"").unwrap(),
            Operator::NotEquals
        );
    }
}
