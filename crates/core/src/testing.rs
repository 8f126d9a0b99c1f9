//! In-process connection double for peer unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use webbridge_runtime::{
	ChannelId, ConnectionLike, CorrelationRegistry, Error, InboundHandler, InboundMessage,
	InstanceChannels, Result,
};

use crate::context::BridgeContext;

/// Records every call and answers from a per-method script; unscripted
/// methods reply `null`. Inbound messages are injected with `deliver_*`.
#[derive(Default)]
pub(crate) struct MockConnection {
	calls: Mutex<Vec<(ChannelId, String, Value)>>,
	replies: Mutex<HashMap<String, std::result::Result<Value, String>>>,
	registry: CorrelationRegistry,
	instances: InstanceChannels,
}

impl MockConnection {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn context(self: &Arc<Self>) -> BridgeContext {
		BridgeContext::from_connection(Arc::clone(self) as Arc<dyn ConnectionLike>)
	}

	pub(crate) fn reply(&self, method: &str, value: Value) {
		self.replies.lock().insert(method.to_string(), Ok(value));
	}

	pub(crate) fn fail(&self, method: &str, message: &str) {
		self.replies
			.lock()
			.insert(method.to_string(), Err(message.to_string()));
	}

	pub(crate) fn calls(&self) -> Vec<(ChannelId, String, Value)> {
		self.calls.lock().clone()
	}

	pub(crate) fn registry(&self) -> &CorrelationRegistry {
		&self.registry
	}

	pub(crate) fn deliver_shared(&self, method: &str, params: Value) -> Result<()> {
		self.registry.dispatch(&InboundMessage::new(method, params))
	}

	pub(crate) fn deliver_instance(&self, id: u64, method: &str, params: Value) -> Result<()> {
		self.instances.dispatch(id, &InboundMessage::new(method, params))
	}
}

impl ConnectionLike for MockConnection {
	fn send_message(
		&self,
		channel: ChannelId,
		method: &str,
		params: Value,
	) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
		self.calls.lock().push((channel, method.to_string(), params));
		let reply = self
			.replies
			.lock()
			.get(method)
			.cloned()
			.unwrap_or(Ok(Value::Null));
		Box::pin(async move {
			reply.map_err(|message| Error::Remote {
				name: "Error".to_string(),
				message,
				stack: None,
			})
		})
	}

	fn register_peer(&self, uuid: Arc<str>, handler: &Arc<dyn InboundHandler>) -> bool {
		self.registry.register(uuid, handler)
	}

	fn unregister_peer(&self, uuid: &str) -> bool {
		self.registry.unregister(uuid)
	}

	fn open_instance(&self, id: u64, handler: &Arc<dyn InboundHandler>) -> Result<()> {
		self.instances.open(id, handler)
	}

	fn close_instance(&self, id: u64) -> bool {
		self.instances.close(id)
	}
}
