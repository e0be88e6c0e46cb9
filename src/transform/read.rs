//! Read-side reconstruction: flat row bundles back into nested documents.
//!
//! `transform_read` walks the schema field list in declaration order, reading
//! scalar columns off the root row and pulling has-many scalars, arrays,
//! blocks, and relationships from the bundle's path-keyed side maps. The
//! input bundle is never mutated; the document is built into a fresh value.
//!
//! A concrete requested locale flattens localized fields to that locale's
//! value; `"all"` (or no locale) assembles `{locale: value}` maps instead.
//!
//! Element order is always the stored `_order` column (1-based), never the
//! order the database driver returned child rows in.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::debug;
use serde_json::{Map, Value};

use crate::config::{LocalizationConfig, MappingConfig, ALL_LOCALES};
use crate::schema::collection::{Collection, SchemaRegistry};
use crate::schema::field::{
    ArrayField, Block, BlocksField, Field, RelationTarget, RelationshipField, ScalarField,
    ScalarKind, SelectField,
};
use crate::schema::naming::{
    self, ID_COLUMN, LOCALES_SUFFIX, LOCALE_COLUMN, ORDER_COLUMN, OVERFLOW_LOCALE_COLUMN,
    OVERFLOW_ORDER_COLUMN, OVERFLOW_VALUE_COLUMN, UUID_COLUMN,
};
use crate::transform::bundle::{Row, RowBundle, BLOCK_TYPE_KEY};
use crate::transform::has_many_number::transform_has_many_number;
use crate::transform::has_many_text::transform_has_many_text;
use crate::transform::relationship::{coerce_relationship_id, transform_relationship};

/// Side array of `_locales` rows riding on a table row.
const LOCALES_KEY: &str = LOCALES_SUFFIX;

/// Reconstruct the nested, localized document for one root row.
pub fn transform_read(
    registry: &SchemaRegistry,
    config: &MappingConfig,
    collection: &Collection,
    bundle: &RowBundle,
    locale: Option<&str>,
) -> Value {
    debug!(
        "transforming read row for collection '{}' (locale {:?})",
        collection.slug, locale
    );
    let transformer = Transformer {
        registry,
        localization: config.localization(),
        locale,
        bundle,
    };
    let mut out = Map::new();
    if let Some(id) = bundle.root.get(ID_COLUMN) {
        out.insert(ID_COLUMN.to_string(), id.clone());
    }
    transformer.traverse(&collection.fields, &bundle.root, "", "", None, &mut out);
    Value::Object(out)
}

struct Transformer<'a> {
    registry: &'a SchemaRegistry,
    localization: Option<&'a LocalizationConfig>,
    /// Requested locale; `"all"` and `None` both mean every stored locale.
    locale: Option<&'a str>,
    bundle: &'a RowBundle,
}

fn order_of(row: &Row, column: &str) -> i64 {
    row.get(column).and_then(Value::as_i64).unwrap_or(i64::MAX)
}

fn row_locale<'r>(row: &'r Row, column: &str) -> Option<&'r str> {
    row.get(column).and_then(Value::as_str)
}

impl<'a> Transformer<'a> {
    fn localized(&self, flag: bool) -> bool {
        flag && self.localization.is_some()
    }

    /// The requested locale when it names exactly one locale.
    fn concrete_locale(&self) -> Option<&'a str> {
        self.locale.filter(|l| *l != ALL_LOCALES)
    }

    fn traverse(
        &self,
        fields: &[Field],
        row: &Row,
        prefix: &str,
        path: &str,
        within_locale: Option<&str>,
        out: &mut Map<String, Value>,
    ) {
        let sanitized = if path.is_empty() {
            String::new()
        } else {
            format!("{path}.")
        };

        for field in fields {
            match field {
                Field::Tabs(tabs) => {
                    for tab in &tabs.tabs {
                        match &tab.name {
                            Some(name) => self.transform_group(
                                name,
                                &tab.fields,
                                tab.localized,
                                row,
                                prefix,
                                &sanitized,
                                within_locale,
                                out,
                            ),
                            None => self.traverse(&tab.fields, row, prefix, path, within_locale, out),
                        }
                    }
                }
                Field::Row(f) => self.traverse(&f.fields, row, prefix, path, within_locale, out),
                Field::Collapsible(f) => {
                    self.traverse(&f.fields, row, prefix, path, within_locale, out)
                }
                Field::Group(group) => self.transform_group(
                    &group.name,
                    &group.fields,
                    group.localized,
                    row,
                    prefix,
                    &sanitized,
                    within_locale,
                    out,
                ),
                Field::Array(array) => {
                    self.transform_array(array, row, prefix, &sanitized, within_locale, out)
                }
                Field::Blocks(blocks) => {
                    self.transform_blocks(blocks, &sanitized, within_locale, out)
                }
                Field::Select(select) if select.has_many => {
                    self.transform_has_many_select(select, row, prefix, out)
                }
                Field::Scalar(scalar)
                    if scalar.has_many
                        && matches!(scalar.kind, ScalarKind::Text | ScalarKind::Number) =>
                {
                    self.transform_has_many_scalar(scalar, &sanitized, within_locale, out)
                }
                Field::Relationship(rel) => self.transform_relationship_field(
                    rel,
                    row,
                    prefix,
                    &sanitized,
                    within_locale,
                    out,
                ),
                Field::Scalar(scalar) => self.transform_scalar(
                    &scalar.name,
                    Some(scalar.kind),
                    scalar.localized,
                    row,
                    prefix,
                    out,
                ),
                Field::Select(select) => {
                    self.transform_scalar(&select.name, None, select.localized, row, prefix, out)
                }
            }
        }
    }

    /// Groups and named tabs: recurse with an extended column prefix and
    /// dotted path. Localized containers read from the `_locales` side rows,
    /// either the one row of a concrete requested locale or one sub-object
    /// per stored locale.
    #[allow(clippy::too_many_arguments)]
    fn transform_group(
        &self,
        name: &str,
        fields: &[Field],
        localized: bool,
        row: &Row,
        prefix: &str,
        sanitized: &str,
        within_locale: Option<&str>,
        out: &mut Map<String, Value>,
    ) {
        let group_prefix = naming::extend_prefix(prefix, name);
        let group_path = format!("{sanitized}{name}");

        if self.localized(localized) {
            if let Some(locale_rows) = row.get(LOCALES_KEY).and_then(Value::as_array) {
                if let Some(requested) = self.concrete_locale() {
                    let mut sub = Map::new();
                    if let Some(locale_row) = locale_rows
                        .iter()
                        .filter_map(Value::as_object)
                        .find(|r| row_locale(r, LOCALE_COLUMN) == Some(requested))
                    {
                        self.traverse(
                            fields,
                            locale_row,
                            &group_prefix,
                            &group_path,
                            within_locale,
                            &mut sub,
                        );
                    }
                    out.insert(name.to_string(), Value::Object(sub));
                } else {
                    let mut locale_map = Map::new();
                    for locale_row in locale_rows.iter().filter_map(Value::as_object) {
                        let Some(locale) = row_locale(locale_row, LOCALE_COLUMN) else {
                            continue;
                        };
                        let mut sub = Map::new();
                        self.traverse(
                            fields,
                            locale_row,
                            &group_prefix,
                            &group_path,
                            within_locale,
                            &mut sub,
                        );
                        locale_map.insert(locale.to_string(), Value::Object(sub));
                    }
                    out.insert(name.to_string(), Value::Object(locale_map));
                }
                return;
            }
        }

        let mut sub = Map::new();
        self.traverse(fields, row, &group_prefix, &group_path, within_locale, &mut sub);
        out.insert(name.to_string(), Value::Object(sub));
    }

    fn transform_array(
        &self,
        array: &ArrayField,
        row: &Row,
        prefix: &str,
        sanitized: &str,
        within_locale: Option<&str>,
        out: &mut Map<String, Value>,
    ) {
        let key = naming::prefixed_column(prefix, &array.name);
        let Some(raw_rows) = row.get(&key).and_then(Value::as_array) else {
            return;
        };
        let mut rows: Vec<&Row> = raw_rows.iter().filter_map(Value::as_object).collect();
        rows.sort_by_key(|r| order_of(r, ORDER_COLUMN));
        let path_base = format!("{sanitized}{}", array.name);

        if self.localized(array.localized) {
            if let Some(requested) = self.concrete_locale() {
                let elements = rows
                    .iter()
                    .filter(|r| row_locale(r, LOCALE_COLUMN) == Some(requested))
                    .enumerate()
                    .map(|(index, element_row)| {
                        self.child_element(
                            &array.fields,
                            element_row,
                            &format!("{path_base}.{index}"),
                            Some(requested),
                        )
                    })
                    .collect();
                out.insert(array.name.clone(), Value::Array(elements));
            } else {
                let mut by_locale: BTreeMap<String, Vec<Value>> = BTreeMap::new();
                for element_row in rows {
                    let Some(locale) = row_locale(element_row, LOCALE_COLUMN) else {
                        continue;
                    };
                    let index = order_of(element_row, ORDER_COLUMN).saturating_sub(1).max(0);
                    let element = self.child_element(
                        &array.fields,
                        element_row,
                        &format!("{path_base}.{index}"),
                        Some(locale),
                    );
                    by_locale.entry(locale.to_string()).or_default().push(element);
                }
                out.insert(array.name.clone(), locale_map_of_arrays(by_locale));
            }
        } else {
            let mut elements = Vec::new();
            for (index, element_row) in rows.iter().enumerate() {
                if let Some(within) = within_locale {
                    if row_locale(element_row, LOCALE_COLUMN) != Some(within) {
                        continue;
                    }
                }
                elements.push(self.child_element(
                    &array.fields,
                    element_row,
                    &format!("{path_base}.{index}"),
                    within_locale,
                ));
            }
            out.insert(array.name.clone(), Value::Array(elements));
        }
    }

    /// One array or block element: a fresh object with the surrogate `_uuid`
    /// (or the real id) promoted to `id`, recursed with an empty column
    /// prefix since child tables store unprefixed columns.
    fn child_element(
        &self,
        fields: &[Field],
        row: &Row,
        path: &str,
        within_locale: Option<&str>,
    ) -> Value {
        let mut element = Map::new();
        if let Some(uuid) = row.get(UUID_COLUMN) {
            element.insert(ID_COLUMN.to_string(), uuid.clone());
        } else if let Some(id) = row.get(ID_COLUMN) {
            element.insert(ID_COLUMN.to_string(), id.clone());
        }
        self.traverse(fields, row, "", path, within_locale, &mut element);
        Value::Object(element)
    }

    fn block_element(
        &self,
        field: &BlocksField,
        row: &Row,
        path: &str,
        within_locale: Option<&str>,
    ) -> Value {
        let block_type = row_locale(row, BLOCK_TYPE_KEY).unwrap_or_default();
        match field.block(block_type) {
            Some(block) => self.block_row(block, row, path, within_locale),
            // Historical rows may reference removed block definitions.
            None => Value::Object(Map::new()),
        }
    }

    fn block_row(
        &self,
        block: &Block,
        row: &Row,
        path: &str,
        within_locale: Option<&str>,
    ) -> Value {
        let mut element = Map::new();
        if let Some(uuid) = row.get(UUID_COLUMN) {
            element.insert(ID_COLUMN.to_string(), uuid.clone());
        } else if let Some(id) = row.get(ID_COLUMN) {
            element.insert(ID_COLUMN.to_string(), id.clone());
        }
        if let Some(block_type) = row.get(BLOCK_TYPE_KEY) {
            element.insert(BLOCK_TYPE_KEY.to_string(), block_type.clone());
        }
        self.traverse(&block.fields, row, "", path, within_locale, &mut element);
        Value::Object(element)
    }

    fn transform_blocks(
        &self,
        field: &BlocksField,
        sanitized: &str,
        within_locale: Option<&str>,
        out: &mut Map<String, Value>,
    ) {
        let block_path = format!("{sanitized}{}", field.name);
        let Some(raw_rows) = self.bundle.blocks.get(&block_path) else {
            return;
        };
        let mut rows: Vec<&Row> = raw_rows.iter().collect();
        rows.sort_by_key(|r| order_of(r, ORDER_COLUMN));

        if self.localized(field.localized) {
            if let Some(requested) = self.concrete_locale() {
                let elements = rows
                    .iter()
                    .filter(|r| row_locale(r, LOCALE_COLUMN) == Some(requested))
                    .enumerate()
                    .map(|(index, row)| {
                        self.block_element(
                            field,
                            row,
                            &format!("{block_path}.{index}"),
                            Some(requested),
                        )
                    })
                    .collect();
                out.insert(field.name.clone(), Value::Array(elements));
            } else {
                let mut by_locale: BTreeMap<String, Vec<Value>> = BTreeMap::new();
                for row in rows {
                    let Some(locale) = row_locale(row, LOCALE_COLUMN) else {
                        continue;
                    };
                    let index = order_of(row, ORDER_COLUMN).saturating_sub(1).max(0);
                    let element = self.block_element(
                        field,
                        row,
                        &format!("{block_path}.{index}"),
                        Some(locale),
                    );
                    by_locale.entry(locale.to_string()).or_default().push(element);
                }
                out.insert(field.name.clone(), locale_map_of_arrays(by_locale));
            }
        } else {
            let mut elements = Vec::new();
            for (index, row) in rows.iter().enumerate() {
                let block_type = row_locale(row, BLOCK_TYPE_KEY).unwrap_or_default();
                match field.block(block_type) {
                    Some(block) => {
                        if let Some(within) = within_locale {
                            if row_locale(row, LOCALE_COLUMN) != Some(within) {
                                continue;
                            }
                        }
                        elements.push(self.block_row(
                            block,
                            row,
                            &format!("{block_path}.{index}"),
                            within_locale,
                        ));
                    }
                    None => elements.push(Value::Object(Map::new())),
                }
            }
            out.insert(field.name.clone(), Value::Array(elements));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn transform_relationship_field(
        &self,
        field: &RelationshipField,
        row: &Row,
        prefix: &str,
        sanitized: &str,
        within_locale: Option<&str>,
        out: &mut Map<String, Value>,
    ) {
        if !field.uses_rels_table() {
            let RelationTarget::Single(slug) = &field.relation_to else {
                return;
            };
            let column = naming::relationship_fk_column(prefix, &field.name);
            if self.localized(field.localized) {
                if let Some(locale_rows) = row.get(LOCALES_KEY).and_then(Value::as_array) {
                    if let Some(requested) = self.concrete_locale() {
                        let value = locale_rows
                            .iter()
                            .filter_map(Value::as_object)
                            .find(|r| row_locale(r, LOCALE_COLUMN) == Some(requested))
                            .and_then(|r| r.get(&column));
                        if let Some(value) = value {
                            out.insert(
                                field.name.clone(),
                                coerce_relationship_id(self.registry, slug, value),
                            );
                        }
                    } else {
                        let mut locale_map = Map::new();
                        for locale_row in locale_rows.iter().filter_map(Value::as_object) {
                            let Some(locale) = row_locale(locale_row, LOCALE_COLUMN) else {
                                continue;
                            };
                            if let Some(value) = locale_row.get(&column) {
                                locale_map.insert(
                                    locale.to_string(),
                                    coerce_relationship_id(self.registry, slug, value),
                                );
                            }
                        }
                        if !locale_map.is_empty() {
                            out.insert(field.name.clone(), Value::Object(locale_map));
                        }
                    }
                    return;
                }
            }
            if let Some(value) = row.get(&column) {
                out.insert(
                    field.name.clone(),
                    coerce_relationship_id(self.registry, slug, value),
                );
            }
            return;
        }

        let rel_path = format!("{sanitized}{}", field.name);
        let Some(raw_rows) = self.bundle.relationships.get(&rel_path) else {
            // Callers must always see an array for has-many relationships,
            // never a missing key.
            if field.has_many {
                if self.localized(field.localized) && self.concrete_locale().is_none() {
                    let mut locale_map = Map::new();
                    if let Some(localization) = self.localization {
                        locale_map.insert(
                            localization.default_locale.clone(),
                            Value::Array(Vec::new()),
                        );
                    }
                    out.insert(field.name.clone(), Value::Object(locale_map));
                } else {
                    out.insert(field.name.clone(), Value::Array(Vec::new()));
                }
            }
            return;
        };

        let mut rows: Vec<&Row> = raw_rows.iter().collect();
        rows.sort_by_key(|r| order_of(r, OVERFLOW_ORDER_COLUMN));

        if self.localized(field.localized) {
            if let Some(requested) = self.concrete_locale() {
                let locale_rows: Vec<&Row> = rows
                    .into_iter()
                    .filter(|r| row_locale(r, OVERFLOW_LOCALE_COLUMN) == Some(requested))
                    .collect();
                out.insert(
                    field.name.clone(),
                    transform_relationship(self.registry, field, &locale_rows, None),
                );
            } else {
                let mut by_locale: BTreeMap<String, Vec<&Row>> = BTreeMap::new();
                for row in rows {
                    let Some(locale) = row_locale(row, OVERFLOW_LOCALE_COLUMN) else {
                        continue;
                    };
                    by_locale.entry(locale.to_string()).or_default().push(row);
                }
                let mut locale_map = Map::new();
                for (locale, locale_rows) in by_locale {
                    locale_map.insert(
                        locale,
                        transform_relationship(self.registry, field, &locale_rows, None),
                    );
                }
                out.insert(field.name.clone(), Value::Object(locale_map));
            }
        } else {
            out.insert(
                field.name.clone(),
                transform_relationship(self.registry, field, &rows, within_locale),
            );
        }
    }

    fn transform_has_many_scalar(
        &self,
        field: &ScalarField,
        sanitized: &str,
        within_locale: Option<&str>,
        out: &mut Map<String, Value>,
    ) {
        let side_map = match field.kind {
            ScalarKind::Number => &self.bundle.numbers,
            _ => &self.bundle.texts,
        };
        let path_key = format!("{sanitized}{}", field.name);
        let Some(raw_rows) = side_map.get(&path_key) else {
            return;
        };
        let mut rows: Vec<&Row> = raw_rows.iter().collect();
        rows.sort_by_key(|r| order_of(r, OVERFLOW_ORDER_COLUMN));

        let shape = |rows: &[&Row], within: Option<&str>| match field.kind {
            ScalarKind::Number => transform_has_many_number(rows, within),
            _ => transform_has_many_text(rows, within),
        };

        if self.localized(field.localized) {
            if let Some(requested) = self.concrete_locale() {
                out.insert(field.name.clone(), shape(&rows, Some(requested)));
            } else {
                let mut by_locale: BTreeMap<String, Vec<&Row>> = BTreeMap::new();
                for row in rows {
                    let Some(locale) = row_locale(row, OVERFLOW_LOCALE_COLUMN) else {
                        continue;
                    };
                    by_locale.entry(locale.to_string()).or_default().push(row);
                }
                let mut locale_map = Map::new();
                for (locale, locale_rows) in by_locale {
                    locale_map.insert(locale, shape(&locale_rows, None));
                }
                out.insert(field.name.clone(), Value::Object(locale_map));
            }
        } else {
            out.insert(field.name.clone(), shape(&rows, within_locale));
        }
    }

    /// Has-many selects arrive structurally on the flat row as an array of
    /// `{value, locale}` rows; no side-table lookup.
    fn transform_has_many_select(
        &self,
        field: &SelectField,
        row: &Row,
        prefix: &str,
        out: &mut Map<String, Value>,
    ) {
        let key = naming::prefixed_column(prefix, &field.name);
        let Some(raw_rows) = row.get(&key).and_then(Value::as_array) else {
            return;
        };

        let option_value = |option_row: &Row| {
            option_row
                .get(OVERFLOW_VALUE_COLUMN)
                .cloned()
                .unwrap_or(Value::Null)
        };

        if self.localized(field.localized) {
            if let Some(requested) = self.concrete_locale() {
                let values = raw_rows
                    .iter()
                    .filter_map(Value::as_object)
                    .filter(|r| row_locale(r, OVERFLOW_LOCALE_COLUMN) == Some(requested))
                    .map(option_value)
                    .collect();
                out.insert(field.name.clone(), Value::Array(values));
            } else {
                let mut by_locale: BTreeMap<String, Vec<Value>> = BTreeMap::new();
                for option_row in raw_rows.iter().filter_map(Value::as_object) {
                    let Some(locale) = row_locale(option_row, OVERFLOW_LOCALE_COLUMN) else {
                        continue;
                    };
                    by_locale
                        .entry(locale.to_string())
                        .or_default()
                        .push(option_value(option_row));
                }
                out.insert(field.name.clone(), locale_map_of_arrays(by_locale));
            }
        } else {
            let values = raw_rows
                .iter()
                .map(|value| match value {
                    Value::Object(option_row) => option_value(option_row),
                    other => other.clone(),
                })
                .collect();
            out.insert(field.name.clone(), Value::Array(values));
        }
    }

    /// Plain scalar (or single select) terminal: read the prefixed column
    /// off the row, or pull it out of the `_locales` side rows when the
    /// field is localized.
    fn transform_scalar(
        &self,
        name: &str,
        kind: Option<ScalarKind>,
        localized: bool,
        row: &Row,
        prefix: &str,
        out: &mut Map<String, Value>,
    ) {
        let column = naming::prefixed_column(prefix, name);

        if self.localized(localized) {
            if let Some(locale_rows) = row.get(LOCALES_KEY).and_then(Value::as_array) {
                if let Some(requested) = self.concrete_locale() {
                    let value = locale_rows
                        .iter()
                        .filter_map(Value::as_object)
                        .find(|r| row_locale(r, LOCALE_COLUMN) == Some(requested))
                        .and_then(|r| r.get(&column));
                    if let Some(value) = value {
                        out.insert(name.to_string(), coerce_scalar(kind, value));
                    }
                } else {
                    let mut locale_map = Map::new();
                    for locale_row in locale_rows.iter().filter_map(Value::as_object) {
                        let Some(locale) = row_locale(locale_row, LOCALE_COLUMN) else {
                            continue;
                        };
                        if let Some(value) = locale_row.get(&column) {
                            locale_map.insert(locale.to_string(), coerce_scalar(kind, value));
                        }
                    }
                    if !locale_map.is_empty() {
                        out.insert(name.to_string(), Value::Object(locale_map));
                    }
                }
                return;
            }
            // Inside localized arrays and blocks the locale variant is the
            // row itself; fall through to a direct read.
        }

        if let Some(value) = row.get(&column) {
            out.insert(name.to_string(), coerce_scalar(kind, value));
        }
    }
}

fn locale_map_of_arrays(by_locale: BTreeMap<String, Vec<Value>>) -> Value {
    Value::Object(
        by_locale
            .into_iter()
            .map(|(locale, values)| (locale, Value::Array(values)))
            .collect(),
    )
}

/// Light runtime coercion for values read back from loosely typed storage
/// (the `_locales` overflow stores everything as it came from the driver).
fn coerce_scalar(kind: Option<ScalarKind>, value: &Value) -> Value {
    match (kind, value) {
        (Some(ScalarKind::Number), Value::String(raw)) => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (Some(ScalarKind::Date), Value::String(raw)) => normalize_date(raw),
        _ => value.clone(),
    }
}

/// Normalize stored date strings to ISO-8601 with millisecond precision.
/// Unparseable input is passed through untouched.
fn normalize_date(raw: &str) -> Value {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Value::String(
            parsed
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Value::String(
            DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
            return Value::String(
                DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            );
        }
    }
    Value::String(raw.to_string())
}
