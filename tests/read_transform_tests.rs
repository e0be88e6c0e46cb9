//! Document reconstruction from flat row bundles against the posts fixture
//! schema: locale maps, element ordering, block tagging, and relationship
//! shaping.

use docrel::{transform_read, Row, RowBundle};
use serde_json::{json, Value};

use crate::test_helpers::{localized_config, plain_config, registry};

#[path = "test_helpers/mod.rs"]
mod test_helpers;

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture row must be an object, got {other}"),
    }
}

fn rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(values) => values.into_iter().map(row).collect(),
        other => panic!("fixture rows must be an array, got {other}"),
    }
}

#[test]
fn test_localized_group_builds_locale_map() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 1,
        "title": "Hello",
        "_locales": [
            { "_locale": "en", "meta_description": "Hi", "meta_score": "3.5" },
            { "_locale": "es", "meta_description": "Hola", "meta_score": 4.0 }
        ]
    })));

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("all"));

    assert_eq!(doc["id"], json!(1));
    assert_eq!(doc["title"], json!("Hello"));
    assert_eq!(
        doc["meta"],
        json!({
            "en": { "description": "Hi", "score": 3.5 },
            "es": { "description": "Hola", "score": 4.0 }
        })
    );
    // Absent has-many relationship data still reads as an empty array.
    assert_eq!(doc["related"], json!([]));
}

#[test]
fn test_concrete_locale_flattens_localized_fields() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 11,
        "_locales": [
            { "_locale": "en", "meta_description": "Hi", "meta_score": 3.5 },
            { "_locale": "es", "meta_description": "Hola", "meta_score": 4.0 }
        ]
    })))
    .with_texts(
        "keywords",
        rows(json!([
            { "order": 1, "locale": "en", "value": "alpha" },
            { "order": 1, "locale": "es", "value": "alfa" }
        ])),
    );

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("es"));

    assert_eq!(doc["meta"], json!({ "description": "Hola", "score": 4.0 }));
    assert_eq!(doc["keywords"], json!(["alfa"]));
    // Missing has-many relationship data flattens to a bare empty array too.
    assert_eq!(doc["related"], json!([]));
}

#[test]
fn test_without_localization_group_reads_flat() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 2,
        "meta_description": "plain",
        "meta_score": 7.0
    })));

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(doc["meta"], json!({ "description": "plain", "score": 7.0 }));
}

#[test]
fn test_array_elements_sorted_by_order_with_surrogate_ids() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 3,
        "items": [
            { "_order": 2, "_uuid": "b", "label": "second" },
            { "_order": 1, "_uuid": "a", "id": 99, "label": "first" }
        ]
    })));

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(
        doc["items"],
        json!([
            { "id": "a", "label": "first" },
            { "id": "b", "label": "second" }
        ])
    );
}

#[test]
fn test_has_many_text_inside_array_reads_by_element_path() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 4,
        "items": [{ "_order": 1, "_uuid": "a", "label": "first" }]
    })))
    .with_texts(
        "items.0.tags",
        rows(json!([
            { "order": 2, "value": "beta" },
            { "order": 1, "value": "alpha" }
        ])),
    );

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(doc["items"][0]["tags"], json!(["alpha", "beta"]));
}

#[test]
fn test_localized_has_many_text_groups_by_locale() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({ "id": 5 }))).with_texts(
        "keywords",
        rows(json!([
            { "order": 1, "locale": "en", "value": "alpha" },
            { "order": 1, "locale": "es", "value": "alfa" },
            { "order": 2, "locale": "en", "value": "beta" }
        ])),
    );

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("all"));

    assert_eq!(
        doc["keywords"],
        json!({ "en": ["alpha", "beta"], "es": ["alfa"] })
    );
}

#[test]
fn test_blocks_keep_type_tag_and_tolerate_schema_drift() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({ "id": 6 }))).with_blocks(
        "layout",
        rows(json!([
            { "_order": 2, "blockType": "ghost", "body": "gone" },
            { "_order": 1, "_uuid": "h1", "blockType": "hero", "heading": "Top" }
        ])),
    );

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    // Rows for removed block definitions come out as empty objects, in
    // position, rather than failing the whole read.
    assert_eq!(
        doc["layout"],
        json!([
            { "id": "h1", "blockType": "hero", "heading": "Top" },
            {}
        ])
    );
}

#[test]
fn test_polymorphic_relationship_shapes_relation_to_tuples() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({ "id": 7 })))
        // String-typed foreign key comes back as a number because users
        // declares numeric ids.
        .with_relationships("owner", rows(json!([{ "order": 1, "users_id": "7" }])))
        .with_relationships(
            "related",
            rows(json!([
                { "order": 2, "posts_id": 11 },
                { "order": 1, "posts_id": 10 }
            ])),
        );

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(doc["owner"], json!({ "relationTo": "users", "value": 7.0 }));
    assert_eq!(doc["related"], json!([10, 11]));
}

#[test]
fn test_localized_has_many_relationship_defaults_to_default_locale() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({ "id": 12 })));

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("all"));

    // With no stored rows the default-locale key still carries an array.
    assert_eq!(doc["contributors"], json!({ "en": [] }));

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("es"));
    assert_eq!(doc["contributors"], json!([]));
}

#[test]
fn test_localized_has_many_relationship_groups_by_locale() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({ "id": 13 }))).with_relationships(
        "contributors",
        rows(json!([
            { "order": 2, "locale": "en", "users_id": 5 },
            { "order": 1, "locale": "es", "users_id": 6 },
            { "order": 1, "locale": "en", "users_id": 4 }
        ])),
    );

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("all"));
    assert_eq!(doc["contributors"], json!({ "en": [4, 5], "es": [6] }));

    let doc = transform_read(&registry, &localized_config(), posts, &bundle, Some("en"));
    assert_eq!(doc["contributors"], json!([4, 5]));
}

#[test]
fn test_single_relationship_reads_foreign_key_column() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({ "id": 8, "author_id": 42 })));

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(doc["author"], json!(42));
}

#[test]
fn test_date_scalars_normalize_to_iso_8601() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 9,
        "published_at": "2024-03-01 10:30:00"
    })));

    let doc = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(doc["publishedAt"], json!("2024-03-01T10:30:00.000Z"));
}

#[test]
fn test_input_bundle_is_not_mutated() {
    let registry = registry();
    let posts = registry.get("posts").expect("posts registered");
    let bundle = RowBundle::new(row(json!({
        "id": 10,
        "items": [{ "_order": 1, "_uuid": "a", "label": "only" }]
    })));
    let before = bundle.root.clone();

    let _ = transform_read(&registry, &plain_config(), posts, &bundle, None);

    assert_eq!(bundle.root, before);
}
