use serde_json::{Map, Value};

use crate::domain::validation::ConfigError;
use crate::domain::value::{Pattern, PatternId};

/// Unvalidated backend settings as supplied by the host application.
pub type RawConfig = Map<String, Value>;

/// Configuration key holding the pattern list (`patterns`).
pub const PATTERNS_FIELD: &str = "patterns";

/// Parse settings from a JSON document; the top level must be an object.
pub fn parse_raw_config(json: &str) -> Result<RawConfig, ConfigError> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ConfigError::InvalidType {
            field: "config",
            expected: "a JSON object",
        }),
    }
}

pub(crate) fn required_str<'a>(
    raw: &'a RawConfig,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    optional_str(raw, field)?.ok_or(ConfigError::Missing { field })
}

pub(crate) fn optional_str<'a>(
    raw: &'a RawConfig,
    field: &'static str,
) -> Result<Option<&'a str>, ConfigError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(ConfigError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

/// Validate the optional `patterns` list; entries are keyed by `id_field`
/// (`code` for IPPanel, `id` for MeliPayamak).
pub(crate) fn patterns(
    raw: &RawConfig,
    id_field: &'static str,
) -> Result<Vec<Pattern>, ConfigError> {
    let entries = match raw.get(PATTERNS_FIELD) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ConfigError::InvalidType {
                field: PATTERNS_FIELD,
                expected: "a list of pattern objects",
            });
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| pattern(index, entry, id_field))
        .collect()
}

fn pattern(index: usize, entry: &Value, id_field: &'static str) -> Result<Pattern, ConfigError> {
    let malformed = |reason: String| ConfigError::MalformedPattern { index, reason };

    let Value::Object(fields) = entry else {
        return Err(malformed("expected an object".to_owned()));
    };

    let id = match fields.get(id_field) {
        Some(Value::Number(number)) => number
            .as_i64()
            .map(PatternId::Number)
            .ok_or_else(|| malformed(format!("`{id_field}` must be an integer")))?,
        Some(Value::String(code)) if !code.trim().is_empty() => PatternId::Code(code.clone()),
        Some(_) => return Err(malformed(format!("`{id_field}` has an invalid value"))),
        None => return Err(malformed(format!("missing `{id_field}`"))),
    };

    let text = |key: &'static str| match fields.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(malformed(format!("`{key}` must be a string"))),
        None => Err(malformed(format!("missing `{key}`"))),
    };

    Ok(Pattern {
        id,
        name: text("name")?,
        body: text("body")?,
    })
}
