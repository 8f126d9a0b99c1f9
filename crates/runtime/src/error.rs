//! Error types for the bridge runtime.

use thiserror::Error;
use webbridge_protocol::DecodeError;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the remote context.
#[derive(Debug, Error)]
pub enum Error {
	/// `open` was called on a peer that is already open.
	#[error("Peer is already open")]
	AlreadyOpen,

	/// An operation other than `open` was called on a closed peer.
	#[error("Peer is not open")]
	NotOpen,

	/// No handler is registered for the correlation id of an inbound message.
	#[error("No peer registered for correlation id '{uuid}'")]
	Routing { uuid: String },

	/// No handler is registered for an instance channel.
	#[error("No view registered on instance channel {0}")]
	UnknownInstance(u64),

	/// An instance channel with this id is already open.
	#[error("Instance channel {0} is already open")]
	InstanceInUse(u64),

	/// The inbound method name is not part of the protocol for this peer.
	#[error("Unsupported inbound method '{0}'")]
	UnsupportedOperation(String),

	/// Inbound payload did not have the declared shape.
	#[error("Decode error: {0}")]
	Decode(#[from] DecodeError),

	/// Transport-level error (framing or pipe I/O).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Protocol-level error (unexpected frame, unknown reply id).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Remote context replied with an error.
	#[error("{name}: {message}")]
	Remote {
		/// Error type name reported by the remote side
		name: String,
		/// Human-readable error message
		message: String,
		/// Remote stack trace, if it sent one
		stack: Option<String>,
	},

	/// The embedded view was disposed while the invocation was pending.
	#[error("View was disposed before the call completed")]
	Disposed,

	/// The connection shut down before the invocation completed.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// The asset server is already listening.
	#[error("Asset server is already started")]
	AlreadyStarted,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true for lifecycle precondition failures.
	pub fn is_lifecycle(&self) -> bool {
		matches!(self, Error::AlreadyOpen | Error::NotOpen)
	}

	/// Returns true if the inbound message could not be routed to a peer.
	pub fn is_routing(&self) -> bool {
		matches!(self, Error::Routing { .. } | Error::UnknownInstance(_))
	}

	/// Returns the offending field if this is a decode error.
	pub fn decode_field(&self) -> Option<&str> {
		match self {
			Error::Decode(e) => Some(&e.field),
			_ => None,
		}
	}

	/// Returns true if the call failed because the transport went away.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::TransportError(_) | Error::ChannelClosed)
	}
}
