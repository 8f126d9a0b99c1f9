//! Resource timing payloads carried by `onLoadResource`.

use std::collections::HashMap;

use crate::decode::Payload;
use crate::error::DecodeError;

/// The request half of a loaded resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebResourceRequest {
	pub url: String,
	pub headers: HashMap<String, String>,
	pub method: String,
}

/// The response half of a loaded resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebResourceResponse {
	pub url: String,
	pub headers: HashMap<String, String>,
	pub status_code: i64,
	/// Milliseconds since the epoch when loading started.
	pub start_time: i64,
	/// Load duration in milliseconds.
	pub duration: i64,
	pub data: Vec<u8>,
}

impl WebResourceRequest {
	pub(crate) fn decode(payload: &Payload<'_>) -> Result<Self, DecodeError> {
		Ok(Self {
			url: payload.string("url")?,
			headers: payload.string_map("headers")?,
			method: payload
				.opt_string("method")?
				.unwrap_or_else(|| "GET".to_string()),
		})
	}
}

impl WebResourceResponse {
	pub(crate) fn decode(payload: &Payload<'_>) -> Result<Self, DecodeError> {
		Ok(Self {
			url: payload.string("url")?,
			headers: payload.string_map("headers")?,
			status_code: payload.int("statusCode")?,
			start_time: payload.opt_int("startTime")?.unwrap_or(0),
			duration: payload.opt_int("duration")?.unwrap_or(0),
			data: payload.bytes("data")?,
		})
	}

	/// Response body as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.data).into_owned()
	}
}
