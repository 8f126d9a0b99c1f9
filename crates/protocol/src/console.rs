//! Console messages emitted by the remote browsing context.

use serde::{Deserialize, Serialize};

use crate::decode::Payload;
use crate::error::DecodeError;

/// Severity of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsoleMessageLevel {
	Tip,
	Log,
	Warning,
	Error,
	Debug,
}

impl ConsoleMessageLevel {
	/// Parses the wire name. Matching is case-insensitive.
	pub fn from_name(name: &str) -> Option<Self> {
		match name.to_ascii_uppercase().as_str() {
			"TIP" => Some(Self::Tip),
			"LOG" => Some(Self::Log),
			"WARNING" => Some(Self::Warning),
			"ERROR" => Some(Self::Error),
			"DEBUG" => Some(Self::Debug),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Tip => "TIP",
			Self::Log => "LOG",
			Self::Warning => "WARNING",
			Self::Error => "ERROR",
			Self::Debug => "DEBUG",
		}
	}
}

/// Payload of `onConsoleMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
	pub source_url: String,
	pub line_number: i64,
	pub message: String,
	pub level: ConsoleMessageLevel,
}

impl ConsoleMessage {
	pub(crate) fn decode(payload: &Payload<'_>) -> Result<Self, DecodeError> {
		let raw_level = payload.opt_string("messageLevel")?;
		let level = match raw_level {
			None => ConsoleMessageLevel::Log,
			Some(name) => ConsoleMessageLevel::from_name(&name).ok_or_else(|| {
				DecodeError::new(
					payload.path_of("messageLevel"),
					format!("unknown level '{name}'"),
				)
			})?,
		};

		Ok(Self {
			source_url: payload.opt_string("sourceURL")?.unwrap_or_default(),
			line_number: payload.opt_int("lineNumber")?.unwrap_or(0),
			message: payload.string("message")?,
			level,
		})
	}
}
