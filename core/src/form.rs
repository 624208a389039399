//! `application/x-www-form-urlencoded` encoding of serializable values.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::HttpError;

/// Encode the top-level fields of `data` as form pairs.
///
/// Scalars are written as their plain text, `null` fields are skipped, arrays
/// repeat the key once per element and nested objects are written as JSON.
pub fn encode<T: Serialize + ?Sized>(data: &T) -> Result<String, HttpError> {
    let value = serde_json::to_value(data).map_err(|e| HttpError::Serialization(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(HttpError::Serialization(
            "form data must serialize to a map or struct".into(),
        ));
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &scalar(item));
                }
            }
            other => {
                serializer.append_pair(key, &scalar(other));
            }
        }
    }
    Ok(serializer.finish())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
