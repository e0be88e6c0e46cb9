//! Shapes `_rels` rows into relationship values.

use serde_json::{json, Value};

use crate::schema::collection::{IdKind, SchemaRegistry};
use crate::schema::field::{RelationTarget, RelationshipField};
use crate::schema::naming;
use crate::transform::bundle::Row;

/// Coerce a foreign key read back from a join row to a number when the
/// target collection declares numeric ids. Join drivers frequently hand
/// back string-typed keys.
pub(crate) fn coerce_relationship_id(
    registry: &SchemaRegistry,
    target_slug: &str,
    value: &Value,
) -> Value {
    if let Some(collection) = registry.get(target_slug) {
        if collection.id_kind == IdKind::Number {
            if let Value::String(raw) = value {
                if let Ok(parsed) = raw.parse::<f64>() {
                    if let Some(number) = serde_json::Number::from_f64(parsed) {
                        return Value::Number(number);
                    }
                }
            }
        }
    }
    value.clone()
}

/// The populated target of one `_rels` row: the first declared target whose
/// foreign key column carries a value.
fn populated_target<'a>(
    field: &'a RelationshipField,
    row: &'a Row,
) -> Option<(&'a str, &'a Value)> {
    for slug in field.relation_to.slugs() {
        let column = naming::target_fk_column(slug);
        if let Some(value) = row.get(&column) {
            if !value.is_null() {
                return Some((slug.as_str(), value));
            }
        }
    }
    None
}

/// Shape `_rels` rows for one field into its document value.
///
/// Polymorphic targets come out as `{relationTo, value}` tuples, plain
/// targets as bare ids. Has-many fields always yield an array; single
/// polymorphic fields yield the last stored reference.
pub(crate) fn transform_relationship(
    registry: &SchemaRegistry,
    field: &RelationshipField,
    rows: &[&Row],
    within_locale: Option<&str>,
) -> Value {
    let polymorphic = matches!(field.relation_to, RelationTarget::Poly(_));
    let mut values = Vec::with_capacity(rows.len());

    for row in rows {
        if let Some(within) = within_locale {
            let row_locale = row
                .get(naming::OVERFLOW_LOCALE_COLUMN)
                .and_then(Value::as_str);
            if row_locale != Some(within) {
                continue;
            }
        }
        let Some((slug, id)) = populated_target(field, row) else {
            continue;
        };
        let id = coerce_relationship_id(registry, slug, id);
        if polymorphic {
            values.push(json!({ "relationTo": slug, "value": id }));
        } else {
            values.push(id);
        }
    }

    if field.has_many {
        Value::Array(values)
    } else {
        values.pop().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::collection::{Collection, SchemaRegistry};

    #[test]
    fn test_populated_target_returns_first_non_null_fk() {
        let field =
            RelationshipField::polymorphic("owner", vec!["users".into(), "teams".into()]);
        let row: Row = match json!({ "users_id": Value::Null, "teams_id": 3 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let (slug, id) = populated_target(&field, &row).expect("teams fk is set");
        assert_eq!(slug, "teams");
        assert_eq!(id, &json!(3));
        assert!(populated_target(&field, &Row::new()).is_none());
    }

    #[test]
    fn test_single_polymorphic_keeps_last_reference() {
        let registry = SchemaRegistry::new()
            .with_collection(Collection::new("users", Vec::new()))
            .with_collection(Collection::new("teams", Vec::new()));
        let field =
            RelationshipField::polymorphic("owner", vec!["users".into(), "teams".into()]);
        let rows: Vec<Row> = [json!({ "users_id": 1 }), json!({ "teams_id": 2 })]
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect();
        let refs: Vec<&Row> = rows.iter().collect();

        let value = transform_relationship(&registry, &field, &refs, None);
        assert_eq!(value, json!({ "relationTo": "teams", "value": 2 }));
    }
}
