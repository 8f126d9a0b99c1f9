//! Control-channel connection to the remote context
//!
//! This module implements the request/response correlation layer on top of
//! the transport. It handles:
//! - Generating unique request IDs
//! - Correlating replies with pending calls, in whatever order they arrive
//! - Distinguishing events from replies
//! - Routing events to peers by channel and correlation id
//!
//! # Message Flow
//!
//! 1. A peer's [`Channel`](crate::Channel) calls `send_message()` with a
//!    channel id, method, and argument map
//! 2. Connection generates a unique ID and parks a oneshot sender
//! 3. The request is queued for the writer task and framed onto the transport
//! 4. The caller awaits the oneshot receiver
//! 5. The message loop receives the reply from the transport
//! 6. The reply is correlated by ID and delivered through the oneshot
//!
//! Events take the other branch of step 5: shared-channel events go to the
//! [`CorrelationRegistry`], instance-channel events to [`InstanceChannels`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use crate::channel::ChannelId;
use crate::error::{Error, Result};
use crate::handler::{InboundHandler, InboundMessage};
use crate::transport::{PipeTransport, Transport, TransportParts, TransportReceiver};

mod registry;

pub use registry::{CorrelationRegistry, InstanceChannels};

/// Interface peers need from a connection.
///
/// Lets peer proxies work against a trait object, so tests and embedders can
/// substitute their own routing without the transport machinery.
pub trait ConnectionLike: Send + Sync {
	/// Send a call to the remote context and await its reply
	fn send_message(
		&self,
		channel: ChannelId,
		method: &str,
		params: Value,
	) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;

	/// Register a shared-channel peer under its correlation id
	fn register_peer(&self, uuid: Arc<str>, handler: &Arc<dyn InboundHandler>) -> bool;

	/// Remove a shared-channel peer
	fn unregister_peer(&self, uuid: &str) -> bool;

	/// Open the instance channel for an embedded view
	fn open_instance(&self, id: u64, handler: &Arc<dyn InboundHandler>) -> Result<()>;

	/// Close an instance channel, failing its pending calls with
	/// [`Error::Disposed`]
	fn close_instance(&self, id: u64) -> bool;
}

/// Call sent to the remote context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Unique request ID for correlating the reply
	pub id: u32,
	/// Logical channel the call travels on
	pub channel: ChannelId,
	/// Method name to invoke
	pub method: String,
	/// Argument map
	pub params: Value,
}

/// Reply from the remote context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Request ID this reply correlates to
	pub id: u32,
	/// Success result (mutually exclusive with error)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorWrapper>,
}

/// Wrapper for remote error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorWrapper {
	pub error: ErrorPayload,
}

/// Remote error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Error message
	pub message: String,
	/// Error type name
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Stack trace
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// Event sent by the remote context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	/// Channel the event is addressed to
	pub channel: ChannelId,
	/// Event method name
	pub method: String,
	/// Argument map
	#[serde(default)]
	pub params: Value,
}

/// Discriminated union of inbound frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Reply (has `id` field)
	Response(Response),
	/// Event (has `channel` and `method`, no `id`)
	Event(Event),
	/// Unknown frame (forward-compatible catch-all)
	Unknown(Value),
}

struct PendingCall {
	channel: ChannelId,
	tx: oneshot::Sender<Result<Value>>,
}

/// Pending calls keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u32, PendingCall>>>;

/// Frame queued for the writer task, tagged with its request ID so a write
/// failure can be delivered to the right caller.
struct OutboundFrame {
	id: u32,
	frame: Value,
}

/// RAII guard ensuring callback cleanup when a call future is dropped.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned callback");
		}
	}
}

/// Future returned by [`Connection::send_message`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Connection to the remote context
///
/// Owns the transport, the pending-call table and both routing tables.
/// Calls may be issued before [`run`](Self::run) starts; they are queued
/// and written once the writer task is up.
pub struct Connection {
	/// Sequential request ID counter
	last_id: AtomicU32,
	/// Pending calls keyed by request ID
	callbacks: CallbackMap,
	/// Queue feeding the writer task
	outbound_tx: mpsc::UnboundedSender<OutboundFrame>,
	/// Taken by run() to start the writer task
	outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundFrame>>>,
	/// Taken by run() to start the writer task
	transport_sender: Mutex<Option<Box<dyn Transport>>>,
	/// Taken by run() to start the reader task
	transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	/// Frames decoded by the reader task
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
	/// Shared-channel peers by correlation id
	registry: CorrelationRegistry,
	/// Embedded views by instance id
	instances: InstanceChannels,
}

impl Connection {
	/// Create a new Connection with the given transport
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			outbound_rx: Mutex::new(Some(outbound_rx)),
			transport_sender: Mutex::new(Some(sender)),
			transport_receiver: Mutex::new(Some(receiver)),
			message_rx: Mutex::new(Some(message_rx)),
			registry: CorrelationRegistry::new(),
			instances: InstanceChannels::new(),
		}
	}

	/// Create a Connection over a pair of byte streams.
	pub fn over<W, R>(writer: W, reader: R) -> Self
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (transport, message_rx) = PipeTransport::new(writer, reader);
		Self::new(transport.into_transport_parts(message_rx))
	}

	pub fn registry(&self) -> &CorrelationRegistry {
		&self.registry
	}

	pub fn instances(&self) -> &InstanceChannels {
		&self.instances
	}

	/// Number of calls still waiting for a reply.
	pub fn pending_calls(&self) -> usize {
		self.callbacks.lock().len()
	}

	/// Sends a call to the remote context and awaits the reply.
	pub async fn send_message(&self, channel: ChannelId, method: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);

		tracing::debug!(id, ?channel, method, "sending call");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, PendingCall { channel, tx });

		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		let request = Request {
			id,
			channel,
			method: method.to_string(),
			params,
		};
		let frame = serde_json::to_value(&request)?;
		tracing::trace!("Request JSON: {}", frame);

		if self.outbound_tx.send(OutboundFrame { id, frame }).is_err() {
			tracing::error!("Failed to queue message: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Runs the message loop until the transport closes.
	///
	/// When the loop ends every pending call is failed with
	/// [`Error::TransportError`] carrying the reader's failure.
	pub async fn run(self: &Arc<Self>) {
		let parts = (
			self.transport_receiver.lock().take(),
			self.transport_sender.lock().take(),
			self.outbound_rx.lock().take(),
			self.message_rx.lock().take(),
		);
		let (Some(transport_receiver), Some(mut transport_sender), Some(mut outbound_rx), Some(mut message_rx)) =
			parts
		else {
			tracing::error!("Connection::run() called more than once");
			return;
		};

		let reader_handle = tokio::spawn(transport_receiver.run());

		let callbacks = Arc::clone(&self.callbacks);
		let writer_handle = tokio::spawn(async move {
			while let Some(OutboundFrame { id, frame }) = outbound_rx.recv().await {
				if let Err(e) = transport_sender.send(frame).await {
					tracing::error!(id, "Transport write error: {}", e);
					if let Some(pending) = callbacks.lock().remove(&id) {
						let _ = pending.tx.send(Err(Error::TransportError(e.to_string())));
					}
				}
			}
		});

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(message_value) {
				Ok(message) => {
					if let Err(e) = self.dispatch(message) {
						tracing::error!("Error dispatching message: {}", e);
					}
				}
				Err(e) => {
					tracing::error!("Failed to parse message: {}", e);
				}
			}
		}

		let reason = match reader_handle.await {
			Ok(Ok(())) => "transport closed".to_string(),
			Ok(Err(e)) => e.to_string(),
			Err(e) => format!("transport reader stopped: {e}"),
		};
		tracing::debug!(%reason, "message loop finished");

		writer_handle.abort();
		let _ = writer_handle.await;

		self.fail_pending(None, || Error::TransportError(reason.clone()));
	}

	/// Dispatches one inbound frame.
	///
	/// Errors are scoped to this frame: the pending-call table and the
	/// routing tables are left consistent whatever a handler returns.
	pub fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				tracing::debug!(id = response.id, "processing reply");
				let pending = self.callbacks.lock().remove(&response.id).ok_or_else(|| {
					Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id))
				})?;

				let result = if let Some(error_wrapper) = response.error {
					Err(parse_remote_error(error_wrapper.error))
				} else {
					Ok(response.result.unwrap_or(Value::Null))
				};

				let _ = pending.tx.send(result);
				Ok(())
			}
			Message::Event(event) => {
				let message = InboundMessage::new(event.method, event.params);
				match event.channel {
					ChannelId::Shared => self.registry.dispatch(&message),
					ChannelId::Instance(id) => self.instances.dispatch(id, &message),
				}
			}
			Message::Unknown(value) => {
				// an event whose channel did not parse cannot be routed anywhere
				if let Some(method) = value.get("method").and_then(Value::as_str) {
					let channel = value.get("channel").cloned().unwrap_or(Value::Null);
					return Err(Error::ProtocolError(format!(
						"Unroutable event {method}: invalid channel {channel}"
					)));
				}
				tracing::debug!(
					"Unknown message type (forward-compatible, ignored): {}",
					serde_json::to_string(&value)
						.unwrap_or_else(|_| "<serialization failed>".to_string())
				);
				Ok(())
			}
		}
	}

	fn fail_pending(&self, channel: Option<ChannelId>, error: impl Fn() -> Error) -> usize {
		let drained: Vec<PendingCall> = {
			let mut callbacks = self.callbacks.lock();
			let ids: Vec<u32> = callbacks
				.iter()
				.filter(|(_, pending)| channel.is_none_or(|c| pending.channel == c))
				.map(|(id, _)| *id)
				.collect();
			ids.into_iter()
				.filter_map(|id| callbacks.remove(&id))
				.collect()
		};

		let count = drained.len();
		for pending in drained {
			let _ = pending.tx.send(Err(error()));
		}
		if count > 0 {
			tracing::debug!(count, ?channel, "failed pending calls");
		}
		count
	}
}

/// Converts [`ErrorPayload`] from the remote side into [`Error::Remote`].
fn parse_remote_error(error: ErrorPayload) -> Error {
	Error::Remote {
		name: error.name.unwrap_or_else(|| "Error".to_string()),
		message: error.message,
		stack: error.stack,
	}
}

impl ConnectionLike for Connection {
	fn send_message(
		&self,
		channel: ChannelId,
		method: &str,
		params: Value,
	) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
		let method = method.to_string();
		Box::pin(async move { Connection::send_message(self, channel, &method, params).await })
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
		let was_open = self.instances.close(id);
		self.fail_pending(Some(ChannelId::Instance(id)), || Error::Disposed);
		was_open
	}
}
