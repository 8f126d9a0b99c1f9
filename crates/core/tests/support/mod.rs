//! Scripted stand-in for the remote context, speaking the framed protocol
//! over in-memory pipes.

#![allow(dead_code)]

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use webbridge::BridgeContext;
use webbridge_runtime::{ChannelId, ConnectionLike};

pub struct FakeRemote {
	from_bridge: DuplexStream,
	to_bridge: DuplexStream,
}

/// Returns a running context and the remote end of its pipes.
pub fn connect() -> (BridgeContext, FakeRemote) {
	let (from_bridge, bridge_writer) = duplex(64 * 1024);
	let (bridge_reader, to_bridge) = duplex(64 * 1024);
	let ctx = BridgeContext::over(bridge_writer, bridge_reader);
	(
		ctx,
		FakeRemote {
			from_bridge,
			to_bridge,
		},
	)
}

impl FakeRemote {
	/// Next call sent by the bridge.
	pub async fn next_request(&mut self) -> Value {
		let mut len_buf = [0u8; 4];
		self.from_bridge.read_exact(&mut len_buf).await.unwrap();
		let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
		self.from_bridge.read_exact(&mut body).await.unwrap();
		serde_json::from_slice(&body).unwrap()
	}

	/// Reads the next call, checks its method and replies with `result`.
	pub async fn answer(&mut self, method: &str, result: Value) -> Value {
		let request = self.next_request().await;
		assert_eq!(request["method"], method, "unexpected call {request}");
		self.reply(&request, result).await;
		request
	}

	pub async fn reply(&mut self, request: &Value, result: Value) {
		self.send(&json!({"id": request["id"], "result": result})).await;
	}

	pub async fn reply_error(&mut self, request: &Value, message: &str) {
		self.send(&json!({
			"id": request["id"],
			"error": {"error": {"message": message, "name": "Error"}}
		}))
		.await;
	}

	/// Emits an event on the shared channel.
	pub async fn emit_shared(&mut self, method: &str, params: Value) {
		self.send(&json!({"channel": "shared", "method": method, "params": params}))
			.await;
	}

	/// Emits an event on the instance channel `id`.
	pub async fn emit_instance(&mut self, id: u64, method: &str, params: Value) {
		self.send(&json!({"channel": {"instance": id}, "method": method, "params": params}))
			.await;
	}

	/// Round trip that guarantees every earlier event has been dispatched:
	/// events and replies are handled in arrival order.
	pub async fn sync(&mut self, ctx: &BridgeContext) {
		let connection = ctx.connection();
		let call = connection.send_message(ChannelId::Shared, "getUrl", json!({}));
		let (reply, _) = tokio::join!(call, self.answer("getUrl", Value::Null));
		reply.unwrap();
	}

	async fn send(&mut self, message: &Value) {
		let bytes = serde_json::to_vec(message).unwrap();
		self.to_bridge
			.write_all(&(bytes.len() as u32).to_le_bytes())
			.await
			.unwrap();
		self.to_bridge.write_all(&bytes).await.unwrap();
		self.to_bridge.flush().await.unwrap();
	}

	/// Closes both pipes, as if the remote process exited.
	pub fn hang_up(self) {}
}
