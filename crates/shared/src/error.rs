use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error body returned by the backend on non-2xx responses.
///
/// `detail` is either a plain message or a list of field validation
/// entries, each carrying a `msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Value,
}

impl ApiErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match &self.detail {
            Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
            Value::Array(entries) => {
                let messages = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .collect::<Vec<_>>();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp '{0}'")]
pub struct InvalidTimestamp(pub String);
