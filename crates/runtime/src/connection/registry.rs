//! Inbound routing tables.
//!
//! [`CorrelationRegistry`] routes shared-channel messages by the `uuid` in
//! their argument map; [`InstanceChannels`] routes per-view messages by the
//! numeric id of the instance channel they arrived on.
//!
//! Both tables hold handlers weakly: a peer that has been dropped stops
//! receiving messages and its entry is pruned on the next lookup, so a
//! registration never outlives the peer that made it.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{Error, Result};
use crate::handler::{InboundHandler, InboundMessage};

/// Table of shared-channel peers keyed by correlation id.
#[derive(Default)]
pub struct CorrelationRegistry {
	handlers: DashMap<Arc<str>, Weak<dyn InboundHandler>>,
}

impl CorrelationRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `handler` for `uuid`, replacing any live registration.
	///
	/// Returns true if a live handler was replaced. Correlation ids are
	/// random v4 UUIDs, so a collision means two peers were given the same
	/// id; it is logged loudly and the newer peer wins.
	pub fn register(&self, uuid: Arc<str>, handler: &Arc<dyn InboundHandler>) -> bool {
		let replaced = self
			.handlers
			.insert(Arc::clone(&uuid), Arc::downgrade(handler))
			.is_some_and(|previous| previous.strong_count() > 0);

		if replaced {
			tracing::warn!(%uuid, "correlation id registered twice; replacing previous peer");
		} else {
			tracing::debug!(%uuid, "peer registered");
		}
		replaced
	}

	/// Removes the registration for `uuid`. Returns true if one existed.
	pub fn unregister(&self, uuid: &str) -> bool {
		self.handlers.remove(uuid).is_some()
	}

	/// Returns true if a live peer is registered for `uuid`.
	pub fn contains(&self, uuid: &str) -> bool {
		self.handlers
			.get(uuid)
			.is_some_and(|entry| entry.strong_count() > 0)
	}

	/// Number of entries, including ones whose peer has not yet been pruned.
	pub fn len(&self) -> usize {
		self.handlers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}

	/// Routes `message` to the peer named by its `uuid` argument.
	pub fn dispatch(&self, message: &InboundMessage) -> Result<()> {
		let uuid = message.uuid().ok_or_else(|| {
			Error::Decode(webbridge_protocol::DecodeError::new(
				"uuid",
				format!("shared-channel message '{}' has no correlation id", message.method),
			))
		})?;

		let handler = self.lookup(uuid).ok_or_else(|| Error::Routing {
			uuid: uuid.to_string(),
		})?;

		tracing::debug!(uuid, method = %message.method, "dispatching to peer");
		handler.on_message(message)
	}

	// The map guard is released before the handler runs, so handlers may
	// register or unregister peers re-entrantly.
	fn lookup(&self, uuid: &str) -> Option<Arc<dyn InboundHandler>> {
		let weak = self.handlers.get(uuid).map(|entry| entry.value().clone())?;
		match weak.upgrade() {
			Some(handler) => Some(handler),
			None => {
				self.handlers
					.remove_if(uuid, |_, entry| entry.strong_count() == 0);
				tracing::debug!(uuid, "pruned registration of dropped peer");
				None
			}
		}
	}
}

/// Table of embedded views keyed by instance channel id.
#[derive(Default)]
pub struct InstanceChannels {
	handlers: DashMap<u64, Weak<dyn InboundHandler>>,
}

impl InstanceChannels {
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens the instance channel `id`. Fails if a live view already owns it.
	pub fn open(&self, id: u64, handler: &Arc<dyn InboundHandler>) -> Result<()> {
		match self.handlers.entry(id) {
			Entry::Occupied(mut entry) => {
				if entry.get().strong_count() > 0 {
					return Err(Error::InstanceInUse(id));
				}
				entry.insert(Arc::downgrade(handler));
			}
			Entry::Vacant(entry) => {
				entry.insert(Arc::downgrade(handler));
			}
		}
		tracing::debug!(id, "instance channel opened");
		Ok(())
	}

	/// Closes the instance channel `id`. Returns true if it was open.
	pub fn close(&self, id: u64) -> bool {
		let closed = self.handlers.remove(&id).is_some();
		if closed {
			tracing::debug!(id, "instance channel closed");
		}
		closed
	}

	pub fn is_open(&self, id: u64) -> bool {
		self.handlers
			.get(&id)
			.is_some_and(|entry| entry.strong_count() > 0)
	}

	/// Routes `message` to the view that owns instance channel `id`.
	pub fn dispatch(&self, id: u64, message: &InboundMessage) -> Result<()> {
		let weak = self
			.handlers
			.get(&id)
			.map(|entry| entry.value().clone())
			.ok_or(Error::UnknownInstance(id))?;

		let Some(handler) = weak.upgrade() else {
			self.handlers
				.remove_if(&id, |_, entry| entry.strong_count() == 0);
			return Err(Error::UnknownInstance(id));
		};

		tracing::debug!(id, method = %message.method, "dispatching to view");
		handler.on_message(message)
	}
}
