//! [`ChromeSafariBrowser`] - platform custom tab with an in-app fallback.

use std::sync::Arc;

use webbridge_protocol::{BrowserOptions, ChromeSafariOpenArgs, Headers, InboundEvent, OutboundMethod};
use webbridge_runtime::{Channel, Error, InboundHandler, InboundMessage, Result};

use crate::browser::InAppBrowser;
use crate::context::BridgeContext;
use crate::peer::{Lifecycle, decode_event};

/// Hooks for custom-tab lifecycle events. All default to no-ops.
pub trait ChromeSafariEvents: Send + Sync {
	fn on_opened(&self) {}

	fn on_loaded(&self) {}

	/// The tab was dismissed. The browser is already marked closed.
	fn on_closed(&self) {}
}

impl ChromeSafariEvents for () {}

struct CustomTabInner {
	channel: Channel,
	lifecycle: Lifecycle,
	fallback: Option<InAppBrowser>,
	events: Arc<dyn ChromeSafariEvents>,
}

impl InboundHandler for CustomTabInner {
	fn on_message(&self, message: &InboundMessage) -> Result<()> {
		match decode_event(message)? {
			InboundEvent::ChromeSafariBrowserOpened => self.events.on_opened(),
			InboundEvent::ChromeSafariBrowserLoaded => self.events.on_loaded(),
			InboundEvent::ChromeSafariBrowserClosed => {
				self.lifecycle.mark_closed();
				tracing::debug!(uuid = ?self.channel.uuid(), "custom tab closed");
				self.events.on_closed();
			}
			other => return Err(Error::UnsupportedOperation(other.method().to_string())),
		}
		Ok(())
	}
}

impl Drop for CustomTabInner {
	fn drop(&mut self) {
		if let Some(uuid) = self.channel.uuid() {
			self.channel.connection().unregister_peer(uuid);
		}
	}
}

/// A platform custom tab (Chrome Custom Tabs, SFSafariViewController).
///
/// When the platform cannot show a custom tab, the remote side falls back
/// to the optional [`InAppBrowser`]. The fallback keeps its own correlation
/// id and lifecycle: its events go to it, not to this tab.
#[derive(Clone)]
pub struct ChromeSafariBrowser {
	inner: Arc<CustomTabInner>,
}

impl ChromeSafariBrowser {
	pub fn new(ctx: &BridgeContext, fallback: Option<InAppBrowser>) -> Self {
		Self::with_events(ctx, fallback, ())
	}

	pub fn with_events(
		ctx: &BridgeContext,
		fallback: Option<InAppBrowser>,
		events: impl ChromeSafariEvents + 'static,
	) -> Self {
		let uuid: Arc<str> = Arc::from(uuid::Uuid::new_v4().to_string());
		let connection = ctx.connection();

		let inner = Arc::new(CustomTabInner {
			channel: Channel::shared(Arc::clone(&uuid), Arc::clone(&connection)),
			lifecycle: Lifecycle::closed(),
			fallback,
			events: Arc::new(events),
		});

		let handler: Arc<dyn InboundHandler> = inner.clone();
		connection.register_peer(uuid, &handler);

		Self { inner }
	}

	pub fn uuid(&self) -> &str {
		self.inner.channel.uuid().unwrap_or_default()
	}

	pub fn is_open(&self) -> bool {
		self.inner.lifecycle.is_open()
	}

	pub fn fallback(&self) -> Option<&InAppBrowser> {
		self.inner.fallback.as_ref()
	}

	/// Opens `url` in a custom tab.
	///
	/// `headers_fallback` and `options_fallback` apply only if the remote
	/// side falls back to the in-app browser.
	///
	/// # Errors
	///
	/// Returns [`Error::AlreadyOpen`] without sending anything if the tab
	/// is open or an `open` is in flight.
	pub async fn open(
		&self,
		url: impl Into<String>,
		options: BrowserOptions,
		headers_fallback: Headers,
		options_fallback: BrowserOptions,
	) -> Result<()> {
		self.inner.lifecycle.begin_open()?;

		let args = ChromeSafariOpenArgs {
			url: url.into(),
			options,
			uuid_fallback: self
				.inner
				.fallback
				.as_ref()
				.map(|browser| browser.uuid().to_string())
				.unwrap_or_default(),
			headers: headers_fallback,
			options_fallback,
			open_with_system_browser: false,
			is_local_file: false,
			use_chrome_safari_browser: true,
		};
		tracing::debug!(
			uuid = self.uuid(),
			fallback = %args.uuid_fallback,
			url = %args.url,
			"opening custom tab"
		);

		let result = self
			.inner
			.channel
			.send_no_result(OutboundMethod::Open, args)
			.await;
		self.inner.lifecycle.finish_open(result.is_ok());
		result
	}

	/// Opens `url` with empty option maps.
	pub async fn open_url(&self, url: impl Into<String>) -> Result<()> {
		self.open(url, BrowserOptions::new(), Headers::new(), BrowserOptions::new())
			.await
	}
}

impl std::fmt::Debug for ChromeSafariBrowser {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChromeSafariBrowser")
			.field("uuid", &self.uuid())
			.field("open", &self.is_open())
			.field("fallback", &self.inner.fallback)
			.finish()
	}
}
