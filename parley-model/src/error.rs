use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the backend on non-2xx responses.
///
/// `errors` is usually a map of field name to a list of messages, but a flat
/// list or a single string per field is accepted too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl ApiErrorBody {
    /// Parse an error body, yielding `None` for anything that is not a JSON
    /// object (HTML error pages, empty bodies).
    pub fn parse(body: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(body) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Backend message, ignoring blank strings.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }

    /// Field-level validation messages flattened into one list, in field
    /// order as sent by the backend.
    pub fn field_errors(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(errors) = &self.errors {
            flatten_into(errors, &mut out);
        }
        out
    }
}

fn flatten_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(message) => out.push(message.clone()),
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(fields) => {
            for item in fields.values() {
                flatten_into(item, out);
            }
        }
        Value::Null => {}
        other => out.push(other.to_string()),
    }
}
