//! Shapes `_numbers` overflow rows into has-many number values.

use serde_json::Value;

use crate::schema::naming::{OVERFLOW_LOCALE_COLUMN, OVERFLOW_VALUE_COLUMN};
use crate::transform::bundle::Row;

/// Collect the `value` column of each row as a number, in row order. The
/// overflow table stores values loosely typed, so strings are parsed back to
/// floats here.
pub(crate) fn transform_has_many_number(rows: &[&Row], within_locale: Option<&str>) -> Value {
    let values = rows
        .iter()
        .filter(|row| match within_locale {
            Some(within) => {
                row.get(OVERFLOW_LOCALE_COLUMN).and_then(Value::as_str) == Some(within)
            }
            None => true,
        })
        .map(|row| coerce_number(row.get(OVERFLOW_VALUE_COLUMN)))
        .collect();
    Value::Array(values)
}

fn coerce_number(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(raw)) => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.clone())),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}
