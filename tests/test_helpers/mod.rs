//! Shared schema fixtures for the mapping integration tests.

use docrel::{
    ArrayField, Block, BlocksField, Collection, Field, GroupField, LocalizationConfig,
    MappingConfig, RelationshipField, SchemaRegistry,
};

/// Capture `log` output when a test run asks for it (`RUST_LOG=debug`).
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `en`/`es` localization with `en` as the default.
pub fn localized_config() -> MappingConfig {
    MappingConfig::new().with_localization(LocalizationConfig::new(
        vec!["en".to_string(), "es".to_string()],
        "en",
    ))
}

pub fn plain_config() -> MappingConfig {
    MappingConfig::new()
}

/// A posts collection exercising every field shape: plain scalars, a
/// localized group, an array with a nested has-many text, blocks, localized
/// has-many texts at the root, and all three relationship shapes.
pub fn posts_collection() -> Collection {
    Collection::new(
        "posts",
        vec![
            Field::text("title").into(),
            Field::date("publishedAt").into(),
            GroupField::new(
                "meta",
                vec![
                    Field::text("description").into(),
                    Field::number("score").into(),
                ],
            )
            .localized()
            .into(),
            ArrayField::new(
                "items",
                vec![
                    Field::text("label").into(),
                    Field::text("tags").has_many().into(),
                ],
            )
            .into(),
            BlocksField::new(
                "layout",
                vec![
                    Block::new("hero", vec![Field::text("heading").into()]),
                    Block::new(
                        "quote",
                        vec![
                            Field::text("quote").into(),
                            Field::text("attribution").into(),
                        ],
                    ),
                ],
            )
            .into(),
            Field::text("keywords").has_many().localized().into(),
            RelationshipField::to_collection("author", "users").into(),
            RelationshipField::polymorphic(
                "owner",
                vec!["users".to_string(), "teams".to_string()],
            )
            .into(),
            RelationshipField::to_collection("related", "posts")
                .has_many()
                .into(),
            RelationshipField::to_collection("contributors", "users")
                .has_many()
                .localized()
                .into(),
        ],
    )
}

pub fn users_collection() -> Collection {
    Collection::new("users", vec![Field::text("email").into()])
}

pub fn teams_collection() -> Collection {
    Collection::new("teams", vec![Field::text("name").into()])
}

pub fn registry() -> SchemaRegistry {
    init_test_logging();
    SchemaRegistry::new()
        .with_collection(posts_collection())
        .with_collection(users_collection())
        .with_collection(teams_collection())
}
