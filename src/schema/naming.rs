//! Table and column naming rules.
//!
//! The names produced here are a persisted storage contract: every table and
//! column an engine instance derives from a schema must come out the same on
//! every run, with no runtime-generated identifiers. Both the path resolver
//! and the row transformer go through this module, so the two walks can never
//! disagree on where a field lives.

/// Suffix of the per-row localized scalar overflow table.
pub const LOCALES_SUFFIX: &str = "_locales";
/// Suffix of the has-many text overflow table (rooted at the collection table).
pub const TEXTS_SUFFIX: &str = "_texts";
/// Suffix of the has-many number overflow table (rooted at the collection table).
pub const NUMBERS_SUFFIX: &str = "_numbers";
/// Suffix of the relationship overflow table (rooted at the collection table).
pub const RELS_SUFFIX: &str = "_rels";

/// Primary key column of every table.
pub const ID_COLUMN: &str = "id";
/// Parent key column of `_locales`, array, and block child tables.
pub const PARENT_ID_COLUMN: &str = "_parent_id";
/// 1-based element order column of array and block child tables.
pub const ORDER_COLUMN: &str = "_order";
/// Locale marker column of `_locales`, array, and block child tables.
pub const LOCALE_COLUMN: &str = "_locale";
/// Surrogate row id column of array and block child tables.
pub const UUID_COLUMN: &str = "_uuid";
/// Path marker column of block child tables.
pub const BLOCK_PATH_COLUMN: &str = "_path";

/// Parent key column of the `_texts`/`_numbers`/`_rels`/select overflow tables.
pub const OVERFLOW_PARENT_COLUMN: &str = "parent_id";
/// Field-path column of the `_texts`/`_numbers`/`_rels` overflow tables.
pub const OVERFLOW_PATH_COLUMN: &str = "path";
/// Locale column of the `_texts`/`_numbers`/`_rels`/select overflow tables.
pub const OVERFLOW_LOCALE_COLUMN: &str = "locale";
/// 1-based value order column of the `_texts`/`_numbers`/`_rels` overflow tables.
pub const OVERFLOW_ORDER_COLUMN: &str = "order";
/// Value column of the `_texts`/`_numbers`/select overflow tables.
pub const OVERFLOW_VALUE_COLUMN: &str = "value";

/// Convert a field or collection name to its snake_case storage form.
///
/// Handles camelCase, kebab-case, and whitespace; consecutive capitals are
/// treated as one word boundary (`blockID` -> `block_id`).
pub fn snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower = false;
    for ch in input.chars() {
        if ch == '-' || ch == ' ' || ch == '_' {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        } else if ch.is_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out.trim_matches('_').to_string()
}

/// Root table name for a collection slug.
pub fn collection_table_name(slug: &str) -> String {
    snake_case(slug)
}

/// Child table introduced by an array or has-many select field.
///
/// `suffix_chain` is the accumulated `group_` / `tab_` chain between the
/// current table and this field (already snake-cased, trailing underscore).
pub fn child_table_name(parent_table: &str, suffix_chain: &str, field_name: &str) -> String {
    format!("{parent_table}_{suffix_chain}{}", snake_case(field_name))
}

/// Child table holding one named block variant of a blocks field.
pub fn block_table_name(parent_table: &str, block_slug: &str) -> String {
    format!("{parent_table}_blocks_{}", snake_case(block_slug))
}

/// The `_locales` companion of a table.
pub fn locales_table_name(table: &str) -> String {
    format!("{table}{LOCALES_SUFFIX}")
}

/// The has-many text overflow table of a collection root table.
pub fn texts_table_name(root_table: &str) -> String {
    format!("{root_table}{TEXTS_SUFFIX}")
}

/// The has-many number overflow table of a collection root table.
pub fn numbers_table_name(root_table: &str) -> String {
    format!("{root_table}{NUMBERS_SUFFIX}")
}

/// The relationship overflow table of a collection root table.
pub fn rels_table_name(root_table: &str) -> String {
    format!("{root_table}{RELS_SUFFIX}")
}

/// Foreign key column in a `_rels` table pointing at one target collection.
pub fn target_fk_column(target_slug: &str) -> String {
    format!("{}_id", snake_case(target_slug))
}

/// Foreign key column of a single-target relationship field on its own
/// table, under the accumulated group/tab prefix.
pub fn relationship_fk_column(prefix: &str, field_name: &str) -> String {
    format!("{prefix}{}_id", snake_case(field_name))
}

/// Column name of a field under the accumulated group/tab prefix.
pub fn prefixed_column(prefix: &str, field_name: &str) -> String {
    format!("{prefix}{}", snake_case(field_name))
}

/// Extend a group/tab column prefix with one more container name.
pub fn extend_prefix(prefix: &str, container_name: &str) -> String {
    format!("{prefix}{}_", snake_case(container_name))
}
