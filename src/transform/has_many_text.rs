//! Shapes `_texts` overflow rows into has-many text values.

use serde_json::Value;

use crate::schema::naming::{OVERFLOW_LOCALE_COLUMN, OVERFLOW_VALUE_COLUMN};
use crate::transform::bundle::Row;

/// Collect the `value` column of each row, in row order, skipping rows
/// stored under a different locale when inside a localized array or block.
pub(crate) fn transform_has_many_text(rows: &[&Row], within_locale: Option<&str>) -> Value {
    let values = rows
        .iter()
        .filter(|row| match within_locale {
            Some(within) => {
                row.get(OVERFLOW_LOCALE_COLUMN).and_then(Value::as_str) == Some(within)
            }
            None => true,
        })
        .map(|row| row.get(OVERFLOW_VALUE_COLUMN).cloned().unwrap_or(Value::Null))
        .collect();
    Value::Array(values)
}
