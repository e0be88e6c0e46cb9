//! Whole-filter resolution: one shared plan across every leaf of a boolean
//! filter tree.

use docrel::{build_query, BuiltWhere, ColumnRef, Operator, Where};
use serde_json::json;

use crate::test_helpers::{localized_config, plain_config, registry};

#[path = "test_helpers/mod.rs"]
mod test_helpers;

#[test]
fn test_and_filter_over_blocks_shares_one_plan() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let filter = Where::and(vec![
        Where::field("layout.heading", Operator::Equals, json!("Top")),
        Where::field("layout.blockType", Operator::Equals, json!("hero")),
    ]);

    let built = build_query(&registry, &plain_config(), posts, Some(&filter), None)
        .expect("filter builds");

    // One join from the heading leaf, one aliased join from the blockType
    // leaf; both target the hero block table.
    assert_eq!(built.plan.joins().len(), 2);
    assert_eq!(built.plan.joins()[0].table, "posts_blocks_hero");
    assert!(built.plan.joins()[0].alias.is_none());
    assert_eq!(
        built.plan.joins()[1].alias.as_deref(),
        Some("posts_blocks_hero_1")
    );

    let BuiltWhere::And(branches) = built.filter.expect("filter present") else {
        panic!("expected an AND tree");
    };
    assert_eq!(branches.len(), 2);
    let BuiltWhere::Leaf(heading) = &branches[0] else {
        panic!("expected a leaf");
    };
    assert_eq!(heading.resolved.column, ColumnRef::Name("heading".to_string()));
    assert_eq!(heading.condition.operator, Operator::Equals);
    let BuiltWhere::Leaf(block_type) = &branches[1] else {
        panic!("expected a leaf");
    };
    assert!(matches!(block_type.resolved.column, ColumnRef::NotNullFixed(_)));
}

#[test]
fn test_or_tree_shape_survives_resolution() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let filter = Where::or(vec![
        Where::field("title", Operator::Like, json!("intro")),
        Where::and(vec![
            Where::field("author.email", Operator::Equals, json!("a@b.c")),
            Where::field("owner.relationTo", Operator::Equals, json!("teams")),
        ]),
    ]);

    let built = build_query(&registry, &plain_config(), posts, Some(&filter), None)
        .expect("filter builds");

    let BuiltWhere::Or(branches) = built.filter.expect("filter present") else {
        panic!("expected an OR tree");
    };
    assert_eq!(branches.len(), 2);
    assert!(matches!(branches[0], BuiltWhere::Leaf(_)));
    assert!(matches!(&branches[1], BuiltWhere::And(inner) if inner.len() == 2));
    // users join from the email leaf plus the rels join from relationTo.
    assert_eq!(built.plan.joins().len(), 2);
}

#[test]
fn test_duplicate_leaves_do_not_duplicate_joins() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let filter = Where::and(vec![
        Where::field("meta.description", Operator::Equals, json!("a")),
        Where::field("meta.description", Operator::NotEquals, json!("b")),
    ]);

    let built = build_query(
        &registry,
        &localized_config(),
        posts,
        Some(&filter),
        Some("en"),
    )
    .expect("filter builds");

    assert_eq!(built.plan.joins().len(), 1);
    assert_eq!(built.plan.joins()[0].table, "posts_locales");
    assert_eq!(built.plan.constraints().len(), 1);
}

#[test]
fn test_no_filter_yields_empty_plan() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");

    let built = build_query(&registry, &plain_config(), posts, None, None)
        .expect("empty query builds");

    assert!(built.filter.is_none());
    assert!(built.plan.joins().is_empty());
    assert!(built.plan.constraints().is_empty());
}
