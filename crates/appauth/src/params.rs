//! Parameter normalization shared by the request and response models.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{BuildError, ParseError};

/// Caller-supplied or server-returned parameters with no dedicated field.
/// Iteration order is insertion order.
pub type AdditionalParameters = IndexMap<String, String>;

// =============================================================================
// Space-delimited lists
// =============================================================================

/// Joins `values` with single spaces, dropping duplicates while keeping the
/// first occurrence. Returns `None` when nothing remains.
#[must_use]
pub fn iterable_to_string<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref();
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    if seen.is_empty() {
        None
    } else {
        Some(seen.join(" "))
    }
}

/// Normalizes an already space-delimited string.
#[must_use]
pub fn normalize_space_delimited(value: Option<&str>) -> Option<String> {
    value.and_then(|v| iterable_to_string(v.split_whitespace()))
}

/// Splits a space-delimited string into its distinct values.
#[must_use]
pub fn string_to_set(value: Option<&str>) -> Option<Vec<String>> {
    let value = value?;
    let mut set: Vec<String> = Vec::new();
    for item in value.split_whitespace() {
        if !set.iter().any(|s| s == item) {
            set.push(item.to_string());
        }
    }
    Some(set)
}

// =============================================================================
// Additional parameters
// =============================================================================

/// Rejects additional parameters that shadow a built-in parameter.
///
/// # Errors
///
/// Returns `BuildError::ReservedParameter` naming the first offending key.
pub fn check_additional_params(
    params: &AdditionalParameters,
    built_in: &[&str],
) -> Result<(), BuildError> {
    match params.keys().find(|k| built_in.contains(&k.as_str())) {
        Some(key) => Err(BuildError::ReservedParameter(key.clone())),
        None => Ok(()),
    }
}

/// Collects the entries of `pairs` whose key is not built in.
pub fn extract_additional_params<'a, I>(pairs: I, built_in: &[&str]) -> AdditionalParameters
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    pairs
        .into_iter()
        .filter(|(k, _)| !built_in.contains(k))
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Collects the non-built-in members of a JSON object. Non-string values are
/// kept in their JSON text form.
pub fn extract_additional_json_params(
    json: &Map<String, Value>,
    built_in: &[&str],
) -> AdditionalParameters {
    extract_additional_params(
        json.iter().map(|(k, v)| (k.as_str(), json_value_to_string(v))),
        built_in,
    )
}

fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// JSON field access
// =============================================================================

/// Reads an optional string member. Null counts as absent.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` if the member is not a string.
pub fn get_string(json: &Map<String, Value>, key: &str) -> Result<Option<String>, ParseError> {
    match json.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::invalid(key, "expected a string")),
    }
}

/// Reads a mandatory string member.
///
/// # Errors
///
/// Returns `ParseError::MissingArgument` if the member is absent or null.
pub fn require_string(json: &Map<String, Value>, key: &str) -> Result<String, ParseError> {
    get_string(json, key)?.ok_or_else(|| ParseError::missing(key))
}

/// Reads an optional integer member. Numeric strings are accepted.
///
/// # Errors
///
/// Returns `ParseError::InvalidValue` if the member is not an integer.
pub fn get_i64(json: &Map<String, Value>, key: &str) -> Result<Option<i64>, ParseError> {
    match json.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ParseError::invalid(key, "expected an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ParseError::invalid(key, "expected an integer")),
        Some(_) => Err(ParseError::invalid(key, "expected an integer")),
    }
}

/// Parses `json` and requires the top level to be an object.
///
/// # Errors
///
/// Returns `ParseError::Json` for malformed input, `InvalidValue` for
/// non-object documents.
pub fn parse_json_object(json: &str) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::invalid("document", "expected a JSON object")),
    }
}
