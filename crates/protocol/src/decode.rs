//! Defensive field access over loosely-typed argument maps.
//!
//! The remote side builds argument maps from platform collections whose
//! value types are not guaranteed (header values arrive as numbers, byte
//! buffers as base64 strings or integer arrays, integers as whole floats).
//! [`Payload`] coerces what can be coerced without loss and reports
//! everything else as a [`DecodeError`] naming the dotted field path.

use std::collections::HashMap;

use base64::Engine;
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Read-only view over one (possibly nested) argument map.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
	map: Option<&'a Map<String, Value>>,
	path: &'a str,
}

impl<'a> Payload<'a> {
	/// Wraps the top-level argument map. `null` is treated as an empty map
	/// since argument-less events are sent that way.
	pub fn root(params: &'a Value) -> Result<Self, DecodeError> {
		match params {
			Value::Object(map) => Ok(Self {
				map: Some(map),
				path: "",
			}),
			Value::Null => Ok(Self {
				map: None,
				path: "",
			}),
			other => Err(DecodeError::expected("arguments", "object", other)),
		}
	}

	fn get(&self, key: &str) -> Option<&'a Value> {
		self.map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
	}

	/// Dotted path of `key` relative to the root map.
	pub fn path_of(&self, key: &str) -> String {
		if self.path.is_empty() {
			key.to_string()
		} else {
			format!("{}.{}", self.path, key)
		}
	}

	/// Required nested map. The returned view borrows `path` so callers keep
	/// the owned path string alive for the duration of the nested reads.
	pub fn object<'b>(&self, key: &str, path: &'b str) -> Result<Payload<'b>, DecodeError>
	where
		'a: 'b,
	{
		match self.get(key) {
			Some(Value::Object(map)) => Ok(Payload {
				map: Some(map),
				path,
			}),
			Some(other) => Err(DecodeError::expected(self.path_of(key), "object", other)),
			None => Err(DecodeError::missing(self.path_of(key))),
		}
	}

	pub fn string(&self, key: &str) -> Result<String, DecodeError> {
		self.opt_string(key)?
			.ok_or_else(|| DecodeError::missing(self.path_of(key)))
	}

	pub fn opt_string(&self, key: &str) -> Result<Option<String>, DecodeError> {
		match self.get(key) {
			Some(Value::String(s)) => Ok(Some(s.clone())),
			Some(other) => Err(DecodeError::expected(self.path_of(key), "string", other)),
			None => Ok(None),
		}
	}

	pub fn int(&self, key: &str) -> Result<i64, DecodeError> {
		self.opt_int(key)?
			.ok_or_else(|| DecodeError::missing(self.path_of(key)))
	}

	/// Integers may arrive as `i64`, `u64` within range, or whole floats.
	pub fn opt_int(&self, key: &str) -> Result<Option<i64>, DecodeError> {
		let Some(value) = self.get(key) else {
			return Ok(None);
		};
		let Value::Number(n) = value else {
			return Err(DecodeError::expected(self.path_of(key), "integer", value));
		};
		if let Some(i) = n.as_i64() {
			return Ok(Some(i));
		}
		match n.as_f64() {
			Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
				Ok(Some(f as i64))
			}
			_ => Err(DecodeError::new(
				self.path_of(key),
				format!("{n} is not representable as an integer"),
			)),
		}
	}

	/// Header-style map coerced to `String -> String`.
	///
	/// Missing or `null` yields an empty map. Scalar values are stringified;
	/// nested arrays and objects are rejected.
	pub fn string_map(&self, key: &str) -> Result<HashMap<String, String>, DecodeError> {
		let map = match self.get(key) {
			None => return Ok(HashMap::new()),
			Some(Value::Object(map)) => map,
			Some(other) => return Err(DecodeError::expected(self.path_of(key), "object", other)),
		};

		let mut out = HashMap::with_capacity(map.len());
		for (name, value) in map {
			let coerced = match value {
				Value::String(s) => s.clone(),
				Value::Number(n) => n.to_string(),
				Value::Bool(b) => b.to_string(),
				Value::Null => continue,
				other => {
					return Err(DecodeError::expected(
						format!("{}.{}", self.path_of(key), name),
						"string",
						other,
					));
				}
			};
			out.insert(name.clone(), coerced);
		}
		Ok(out)
	}

	/// Binary buffer sent either as standard base64 or as an array of bytes.
	/// Missing or `null` yields an empty buffer.
	pub fn bytes(&self, key: &str) -> Result<Vec<u8>, DecodeError> {
		match self.get(key) {
			None => Ok(Vec::new()),
			Some(value) => bytes_value(&self.path_of(key), value),
		}
	}
}

/// Decodes a standalone binary value (a call result rather than a map field).
pub fn bytes_value(field: &str, value: &Value) -> Result<Vec<u8>, DecodeError> {
	match value {
		Value::Null => Ok(Vec::new()),
		Value::String(encoded) => base64::engine::general_purpose::STANDARD
			.decode(encoded)
			.map_err(|e| DecodeError::new(field, format!("invalid base64: {e}"))),
		Value::Array(items) => items
			.iter()
			.enumerate()
			.map(|(i, item)| {
				item.as_u64()
					.and_then(|b| u8::try_from(b).ok())
					.ok_or_else(|| DecodeError::new(format!("{field}[{i}]"), "expected byte"))
			})
			.collect(),
		other => Err(DecodeError::expected(
			field,
			"base64 string or byte array",
			other,
		)),
	}
}
