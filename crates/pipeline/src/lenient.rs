//! Forgiving field readers for JSON written by other tools or by hand.
//!
//! `gh --json` output and scan payloads are external input. A field of the
//! wrong shape degrades to its empty value here instead of failing the whole
//! document, so one odd issue never hides its neighbours.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads a string field; any other JSON value becomes the empty string.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string(deserializer)?.unwrap_or_default())
}

/// Reads an optional string field; any non-string value becomes `None`.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Reads a label list.
///
/// Entries may be bare names (`"bug"`, the payload shape) or objects with a
/// `name` (`{"name": "bug"}`, the `gh` shape). Names are trimmed; blank,
/// non-string, and otherwise malformed entries are dropped. A value that is
/// not an array yields no labels.
pub fn label_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries.iter().filter_map(label_name).collect(),
        _ => Vec::new(),
    })
}

/// Extracts one trimmed, non-blank label name from a list entry.
pub fn label_name(entry: &Value) -> Option<String> {
    let name = match entry {
        Value::String(s) => s.as_str(),
        Value::Object(fields) => fields.get("name")?.as_str()?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
