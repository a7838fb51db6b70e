//! Decoding of Move struct fields as rendered in JSON by the full node.
//!
//! Integers wider than 32 bits are rendered as decimal strings, narrower ones as
//! numbers, so both forms are accepted. `UID` fields are nested (`{"id": "0x.."}`)
//! while `ID` fields are plain strings.

use blackjack_house_types::ObjectId;
use serde_json::Value;

fn field<'a>(fields: &'a Value, name: &str) -> Result<&'a Value, String> {
    fields
        .get(name)
        .filter(|value| !value.is_null())
        .ok_or_else(|| format!("missing field `{name}`"))
}

pub fn u64_field(fields: &Value, name: &str) -> Result<u64, String> {
    let value = field(fields, name)?;
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("field `{name}` is not an unsigned integer: {value}"))
}

/// Read an integer field and check it fits in `T`.
pub fn uint_field<T: TryFrom<u64>>(fields: &Value, name: &str) -> Result<T, String> {
    let value = u64_field(fields, name)?;
    T::try_from(value).map_err(|_| {
        format!(
            "field `{name}` is out of range for {}: {value}",
            std::any::type_name::<T>()
        )
    })
}

pub fn bytes_field(fields: &Value, name: &str) -> Result<Vec<u8>, String> {
    let value = field(fields, name)?;
    let items = value
        .as_array()
        .ok_or_else(|| format!("field `{name}` is not a byte vector: {value}"))?;
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|byte| u8::try_from(byte).ok())
                .ok_or_else(|| format!("field `{name}` contains a non-byte element: {item}"))
        })
        .collect()
}

/// Like [bytes_field], but an absent field reads as empty.
pub fn optional_bytes_field(fields: &Value, name: &str) -> Result<Vec<u8>, String> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(_) => bytes_field(fields, name),
    }
}

pub fn id_field(fields: &Value, name: &str) -> Result<ObjectId, String> {
    let value = field(fields, name)?;
    let text = match value {
        Value::String(text) => Some(text.as_str()),
        Value::Object(_) => value.get("id").and_then(Value::as_str),
        _ => None,
    }
    .ok_or_else(|| format!("field `{name}` is not an object id: {value}"))?;
    text.parse()
        .map_err(|err| format!("field `{name}` is not an object id: {err}"))
}
