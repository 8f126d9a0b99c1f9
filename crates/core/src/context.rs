//! [`BridgeContext`] - the explicit owner of the control channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use webbridge_runtime::{Connection, ConnectionLike, TransportParts};

/// Control channel shared by every peer created from it.
///
/// Created once and passed by reference to each peer constructor. Cloning
/// is cheap; all clones share the same connection.
#[derive(Clone)]
pub struct BridgeContext {
	connection: Arc<dyn ConnectionLike>,
	run_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BridgeContext {
	/// Starts the message loop over `parts`.
	///
	/// Must be called from within a Tokio runtime.
	pub fn new(parts: TransportParts) -> Self {
		let connection = Arc::new(Connection::new(parts));
		let runner = Arc::clone(&connection);
		let run_task = tokio::spawn(async move {
			runner.run().await;
			tracing::debug!("control channel closed");
		});

		Self {
			connection,
			run_task: Arc::new(Mutex::new(Some(run_task))),
		}
	}

	/// Starts the message loop over a pair of byte streams, such as the
	/// stdio of the process hosting the rendering engine.
	pub fn over<W, R>(writer: W, reader: R) -> Self
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (transport, message_rx) = webbridge_runtime::PipeTransport::new(writer, reader);
		Self::new(transport.into_transport_parts(message_rx))
	}

	/// Wraps a connection whose message loop is driven elsewhere.
	pub fn from_connection(connection: Arc<dyn ConnectionLike>) -> Self {
		Self {
			connection,
			run_task: Arc::new(Mutex::new(None)),
		}
	}

	pub fn connection(&self) -> Arc<dyn ConnectionLike> {
		Arc::clone(&self.connection)
	}

	/// Waits until the transport closes and every pending call has failed.
	///
	/// Returns immediately if the loop is not owned by this context or was
	/// already awaited through another clone.
	pub async fn closed(&self) {
		let task = self.run_task.lock().take();
		if let Some(task) = task {
			if let Err(e) = task.await {
				tracing::error!("control channel loop stopped abnormally: {}", e);
			}
		}
	}
}

impl std::fmt::Debug for BridgeContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BridgeContext")
			.field("owns_loop", &self.run_task.lock().is_some())
			.finish()
	}
}
