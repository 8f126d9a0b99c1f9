//! Framed pipe transport.
//!
//! Every frame is a little-endian `u32` byte length followed by that many
//! bytes of UTF-8 JSON. The transport knows nothing about requests, events
//! or channels; it moves whole JSON values in both directions.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Upper bound on a single frame; larger prefixes are treated as corruption.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Sending half of a transport.
pub trait Transport: Send {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport. `run` reads until the pipe closes and
/// forwards every decoded frame to the message channel.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves plus the channel that `run` feeds, as consumed by
/// [`Connection::new`](crate::Connection::new).
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Transport over a pair of async byte streams (child stdio, socket halves,
/// or in-memory duplex pipes in tests).
pub struct PipeTransport<W, R> {
	sender: PipeTransportSender<W>,
	receiver: PipeTransportReceiver<R>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport writing to `writer` and reading from `reader`.
	///
	/// Returns the receiver that [`run`](Self::run) feeds.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let transport = Self {
			sender: PipeTransportSender { writer },
			receiver: PipeTransportReceiver { reader, message_tx },
		};
		(transport, message_rx)
	}

	/// Writes one frame.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		self.sender.send_frame(&message).await
	}

	/// Reads frames until the pipe closes or a frame is malformed.
	pub async fn run(&mut self) -> Result<()> {
		self.receiver.read_loop().await
	}

	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(self.sender, self.receiver)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		TransportParts {
			sender: Box::new(self.sender),
			receiver: Box::new(self.receiver),
			message_rx,
		}
	}
}

/// Writing half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
	writer: W,
}

impl<W> PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	pub async fn send(&mut self, message: Value) -> Result<()> {
		self.send_frame(&message).await
	}

	async fn send_frame(&mut self, message: &Value) -> Result<()> {
		let bytes = serde_json::to_vec(message)?;
		let length = u32::try_from(bytes.len())
			.map_err(|_| Error::TransportError(format!("Frame too large: {} bytes", bytes.len())))?;

		self.writer
			.write_all(&length.to_le_bytes())
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write length prefix: {e}")))?;
		self.writer
			.write_all(&bytes)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write frame: {e}")))?;
		self.writer
			.flush()
			.await
			.map_err(|e| Error::TransportError(format!("Failed to flush frame: {e}")))?;

		tracing::trace!(len = length, "frame written");
		Ok(())
	}
}

impl<W> Transport for PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { self.send_frame(&message).await })
	}
}

/// Reading half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> PipeTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send,
{
	async fn read_loop(&mut self) -> Result<()> {
		loop {
			let mut len_buf = [0u8; 4];
			self.reader
				.read_exact(&mut len_buf)
				.await
				.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;

			let length = u32::from_le_bytes(len_buf) as usize;
			if length > MAX_FRAME_LEN {
				return Err(Error::TransportError(format!(
					"Frame length {length} exceeds limit of {MAX_FRAME_LEN}"
				)));
			}

			let mut frame = vec![0u8; length];
			self.reader
				.read_exact(&mut frame)
				.await
				.map_err(|e| Error::TransportError(format!("Failed to read frame body: {e}")))?;

			let message: Value = serde_json::from_slice(&frame)
				.map_err(|e| Error::TransportError(format!("Frame is not valid JSON: {e}")))?;

			if self.message_tx.send(message).is_err() {
				tracing::debug!("message receiver dropped, stopping transport reader");
				return Ok(());
			}
		}
	}
}

impl<R> TransportReceiver for PipeTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move { self.read_loop().await })
	}
}

#[cfg(test)]
mod tests;
