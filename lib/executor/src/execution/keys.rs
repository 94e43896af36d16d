use std::borrow::Cow;

use serde_json::Value;

use crate::execution::error::PlanExecutionError;

/// Separates the parts of a composite key.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// Renders one key value. Strings are verbatim, numbers use their JSON text.
pub fn format_key_value<'a>(
    variable: &str,
    value: &'a Value,
) -> Result<Cow<'a, str>, PlanExecutionError> {
    match value {
        Value::String(text) => Ok(Cow::Borrowed(text.as_str())),
        Value::Number(number) => Ok(Cow::Owned(number.to_string())),
        Value::Bool(true) => Ok(Cow::Borrowed("true")),
        Value::Bool(false) => Ok(Cow::Borrowed("false")),
        Value::Null => Ok(Cow::Borrowed("null")),
        Value::Array(_) => Err(PlanExecutionError::UnsupportedKeyValue {
            variable: variable.to_string(),
            kind: "list",
        }),
        Value::Object(_) => Err(PlanExecutionError::UnsupportedKeyValue {
            variable: variable.to_string(),
            kind: "object",
        }),
    }
}

/// Concatenates key values in the given order.
///
/// Parts are joined with `KEY_SEPARATOR` rather than concatenated directly,
/// so `("ab", "c")` and `("a", "bc")` compose different keys.
pub fn compose_key<'a, I>(parts: I) -> Result<String, PlanExecutionError>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut key = String::new();
    for (position, (variable, value)) in parts.into_iter().enumerate() {
        if position > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&format_key_value(variable, value)?);
    }
    Ok(key)
}
