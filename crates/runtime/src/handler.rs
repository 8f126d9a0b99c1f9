//! Inbound message routing target.

use serde_json::Value;

use crate::error::Result;

/// An inbound call from the remote context, before it is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
	pub method: String,
	pub params: Value,
}

impl InboundMessage {
	pub fn new(method: impl Into<String>, params: Value) -> Self {
		Self {
			method: method.into(),
			params,
		}
	}

	/// Correlation id carried by shared-channel messages.
	pub fn uuid(&self) -> Option<&str> {
		self.params.get("uuid").and_then(Value::as_str)
	}
}

/// Receives inbound messages addressed to one peer.
///
/// Implemented by every peer proxy. Handlers run on the connection's message
/// loop, so they must not block; long work should be spawned.
pub trait InboundHandler: Send + Sync {
	fn on_message(&self, message: &InboundMessage) -> Result<()>;
}

impl<F> InboundHandler for F
where
	F: Fn(&InboundMessage) -> Result<()> + Send + Sync,
{
	fn on_message(&self, message: &InboundMessage) -> Result<()> {
		self(message)
	}
}
