//! Decode failures for inbound payloads.

use thiserror::Error;

/// A malformed inbound payload.
///
/// `field` is the dotted path of the offending value inside the argument
/// map (for example `response.headers.Content-Length`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed field `{field}`: {reason}")]
pub struct DecodeError {
	pub field: String,
	pub reason: String,
}

impl DecodeError {
	pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			reason: reason.into(),
		}
	}

	pub(crate) fn missing(field: impl Into<String>) -> Self {
		Self::new(field, "missing")
	}

	pub(crate) fn expected(field: impl Into<String>, expected: &str, found: &serde_json::Value) -> Self {
		Self::new(field, format!("expected {expected}, found {}", kind_of(found)))
	}
}

fn kind_of(value: &serde_json::Value) -> &'static str {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "boolean",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	}
}
