//! Walks a filter tree and resolves every leaf against one shared plan.
//!
//! The output pairs each leaf with its resolved table/column so an external
//! SQL builder can emit the comparison, and hands back the accumulated plan
//! (joins, constraints, select columns) in one piece.

use log::debug;

use crate::config::MappingConfig;
use crate::error::MappingResult;
use crate::query::filter::{Condition, Where};
use crate::query::plan::QueryPlan;
use crate::query::resolve::{resolve_path, ResolvedColumn};
use crate::schema::collection::{Collection, SchemaRegistry};

/// One filter leaf with its resolution attached.
#[derive(Debug, Clone)]
pub struct ResolvedCondition {
    pub condition: Condition,
    pub resolved: ResolvedColumn,
}

/// A filter tree whose leaves have been resolved to storage locations.
#[derive(Debug, Clone)]
pub enum BuiltWhere {
    And(Vec<BuiltWhere>),
    Or(Vec<BuiltWhere>),
    Leaf(ResolvedCondition),
}

/// Resolution result for one whole query.
#[derive(Debug)]
pub struct BuiltQuery {
    pub plan: QueryPlan,
    pub filter: Option<BuiltWhere>,
}

/// Resolve every leaf of `filter` against `collection`, accumulating all
/// joins and constraints into a single fresh [`QueryPlan`].
pub fn build_query(
    registry: &SchemaRegistry,
    config: &MappingConfig,
    collection: &Collection,
    filter: Option<&Where>,
    locale: Option<&str>,
) -> MappingResult<BuiltQuery> {
    let mut plan = QueryPlan::new();
    let built = match filter {
        Some(tree) => {
            debug!(
                "building query for collection '{}' ({} leaves)",
                collection.slug,
                tree.leaves().len()
            );
            Some(build_branch(
                registry, config, collection, tree, locale, &mut plan,
            )?)
        }
        None => None,
    };
    Ok(BuiltQuery {
        plan,
        filter: built,
    })
}

fn build_branch(
    registry: &SchemaRegistry,
    config: &MappingConfig,
    collection: &Collection,
    tree: &Where,
    locale: Option<&str>,
    plan: &mut QueryPlan,
) -> MappingResult<BuiltWhere> {
    match tree {
        Where::And(branches) => {
            let mut built = Vec::with_capacity(branches.len());
            for branch in branches {
                built.push(build_branch(
                    registry, config, collection, branch, locale, plan,
                )?);
            }
            Ok(BuiltWhere::And(built))
        }
        Where::Or(branches) => {
            let mut built = Vec::with_capacity(branches.len());
            for branch in branches {
                built.push(build_branch(
                    registry, config, collection, branch, locale, plan,
                )?);
            }
            Ok(BuiltWhere::Or(built))
        }
        Where::Condition(condition) => {
            let resolved = resolve_path(
                registry,
                config,
                collection,
                &condition.path,
                &condition.value,
                locale,
                plan,
            )?;
            Ok(BuiltWhere::Leaf(ResolvedCondition {
                condition: condition.clone(),
                resolved,
            }))
        }
    }
}
