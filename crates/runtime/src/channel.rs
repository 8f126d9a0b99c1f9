//! Channel - outbound call handle for one peer.
//!
//! A Channel pairs a [`Route`] with the connection. Peers on the shared
//! channel get their correlation id injected into every argument map;
//! embedded views talk on their own instance channel and send the map
//! untouched.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use webbridge_protocol::OutboundMethod;

use crate::connection::ConnectionLike;
use crate::error::{Error, Result};

/// Logical channel a frame travels on.
///
/// Serializes as `"shared"` or `{"instance": <id>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelId {
	Shared,
	Instance(u64),
}

/// Addressing of one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
	/// Multiplexed on the shared channel by correlation id.
	Shared { uuid: Arc<str> },
	/// Scoped to one embedded view.
	Instance(u64),
}

impl Route {
	pub fn channel_id(&self) -> ChannelId {
		match self {
			Route::Shared { .. } => ChannelId::Shared,
			Route::Instance(id) => ChannelId::Instance(*id),
		}
	}
}

/// Channel provides outbound calls for one peer.
#[derive(Clone)]
pub struct Channel {
	route: Route,
	connection: Arc<dyn ConnectionLike>,
}

impl Channel {
	/// Channel on the shared transport, addressed by `uuid`.
	pub fn shared(uuid: Arc<str>, connection: Arc<dyn ConnectionLike>) -> Self {
		Self {
			route: Route::Shared { uuid },
			connection,
		}
	}

	/// Channel scoped to the embedded view `id`.
	pub fn instance(id: u64, connection: Arc<dyn ConnectionLike>) -> Self {
		Self {
			route: Route::Instance(id),
			connection,
		}
	}

	/// Sends a call to the remote context and awaits the reply.
	pub async fn send<P: Serialize, R: DeserializeOwned>(
		&self,
		method: OutboundMethod,
		params: P,
	) -> Result<R> {
		let params = self.build_params(serde_json::to_value(params)?)?;
		let response = self
			.connection
			.send_message(self.route.channel_id(), method.as_str(), params)
			.await?;
		serde_json::from_value(response).map_err(Into::into)
	}

	/// Sends a call with no arguments of its own.
	pub async fn send_no_params<R: DeserializeOwned>(&self, method: OutboundMethod) -> Result<R> {
		self.send(method, Value::Null).await
	}

	/// Sends a call whose reply carries no value.
	pub async fn send_no_result<P: Serialize>(&self, method: OutboundMethod, params: P) -> Result<()> {
		let _: Value = self.send(method, params).await?;
		Ok(())
	}

	/// Sends a call and returns the raw reply.
	pub async fn send_raw<P: Serialize>(&self, method: OutboundMethod, params: P) -> Result<Value> {
		self.send(method, params).await
	}

	fn build_params(&self, params: Value) -> Result<Value> {
		let mut map = match params {
			Value::Null => Map::new(),
			Value::Object(map) => map,
			other => {
				return Err(Error::ProtocolError(format!(
					"call arguments must be a map, got {other}"
				)));
			}
		};
		if let Route::Shared { uuid } = &self.route {
			map.insert("uuid".to_string(), Value::String(uuid.to_string()));
		}
		Ok(Value::Object(map))
	}

	pub fn route(&self) -> &Route {
		&self.route
	}

	/// Correlation id, for shared-channel peers.
	pub fn uuid(&self) -> Option<&str> {
		match &self.route {
			Route::Shared { uuid } => Some(uuid),
			Route::Instance(_) => None,
		}
	}

	pub fn connection(&self) -> &Arc<dyn ConnectionLike> {
		&self.connection
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn channel_id_wire_shape() {
		assert_eq!(serde_json::to_value(ChannelId::Shared).unwrap(), json!("shared"));
		assert_eq!(
			serde_json::to_value(ChannelId::Instance(4)).unwrap(),
			json!({"instance": 4})
		);
		let parsed: ChannelId = serde_json::from_value(json!({"instance": 9})).unwrap();
		assert_eq!(parsed, ChannelId::Instance(9));
	}

	#[test]
	fn route_maps_to_channel() {
		let shared = Route::Shared {
			uuid: Arc::from("u"),
		};
		assert_eq!(shared.channel_id(), ChannelId::Shared);
		assert_eq!(Route::Instance(2).channel_id(), ChannelId::Instance(2));
	}
}
