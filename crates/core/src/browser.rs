//! [`InAppBrowser`] - standalone browser window on the shared channel.

use std::sync::Arc;

use serde_json::Value;
use webbridge_protocol::{
	BrowserOptions, ConsoleMessage, Headers, InboundEvent, LoadDataArgs, OpenArgs, OutboundMethod,
	WebResourceRequest, WebResourceResponse,
};
use webbridge_runtime::{Channel, Error, InboundHandler, InboundMessage, Result};

use crate::context::BridgeContext;
use crate::peer::{Lifecycle, PeerCore, decode_event};
use crate::script_handler::{HandlerId, ScriptHandlerMultiplexer};

/// Hooks for events delivered to a standalone browser or an embedded view.
///
/// Every method has a no-op default; implement the ones you need. Hooks run
/// on the connection's message loop and must not block.
#[allow(unused_variables)]
pub trait BrowserEvents: Send + Sync {
	/// The browser was closed on the remote side. Not delivered to
	/// embedded views.
	fn on_exit(&self) {}

	fn on_load_start(&self, url: &str) {}

	fn on_load_stop(&self, url: &str) {}

	fn on_load_error(&self, url: &str, code: i64, message: &str) {}

	/// Load progress in percent, 0 to 100.
	fn on_progress_changed(&self, progress: i64) {}

	fn should_override_url_loading(&self, url: &str) {}

	fn on_load_resource(&self, response: &WebResourceResponse, request: &WebResourceRequest) {}

	fn on_console_message(&self, message: &ConsoleMessage) {}
}

impl BrowserEvents for () {}

/// Delivers the navigation events shared by browsers and embedded views.
///
/// Returns the event back if it is not one of them. A script handler call
/// whose `args` is not a JSON array fails with a decode error.
pub(crate) fn deliver_navigation(
	core: &PeerCore,
	events: &dyn BrowserEvents,
	event: InboundEvent,
) -> Result<Option<InboundEvent>> {
	match event {
		InboundEvent::LoadStart { url } => events.on_load_start(&url),
		InboundEvent::LoadStop { url } => events.on_load_stop(&url),
		InboundEvent::LoadError { url, code, message } => events.on_load_error(&url, code, &message),
		InboundEvent::ProgressChanged { progress } => events.on_progress_changed(progress),
		InboundEvent::ShouldOverrideUrlLoading { url } => events.should_override_url_loading(&url),
		InboundEvent::LoadResource { response, request } => {
			events.on_load_resource(&response, &request)
		}
		InboundEvent::ConsoleMessage(message) => events.on_console_message(&message),
		InboundEvent::CallJsHandler { handler_name, args } => core.call_js_handler(&handler_name, &args)?,
		other => return Ok(Some(other)),
	}
	Ok(None)
}

struct BrowserInner {
	core: PeerCore,
	events: Arc<dyn BrowserEvents>,
}

impl InboundHandler for BrowserInner {
	fn on_message(&self, message: &InboundMessage) -> Result<()> {
		let event = decode_event(message)?;
		let Some(event) = deliver_navigation(&self.core, self.events.as_ref(), event)? else {
			return Ok(());
		};

		match event {
			InboundEvent::Exit => {
				self.core.lifecycle().mark_closed();
				tracing::debug!(uuid = ?self.core.channel().uuid(), "browser exited");
				self.events.on_exit();
				Ok(())
			}
			other => Err(Error::UnsupportedOperation(other.method().to_string())),
		}
	}
}

impl Drop for BrowserInner {
	fn drop(&mut self) {
		if let Some(uuid) = self.core.channel().uuid() {
			self.core.channel().connection().unregister_peer(uuid);
		}
	}
}

/// A standalone browser window shown over the app.
///
/// Routed on the shared channel by a correlation id generated at
/// construction. The browser starts closed; [`open`](Self::open) makes it
/// open, and it closes again on [`close`](Self::close) or when the user
/// dismisses it on the remote side.
///
/// Cloning yields another handle to the same browser.
#[derive(Clone)]
pub struct InAppBrowser {
	inner: Arc<BrowserInner>,
}

impl InAppBrowser {
	/// Creates a browser with no event hooks.
	pub fn new(ctx: &BridgeContext) -> Self {
		Self::with_events(ctx, ())
	}

	/// Creates a browser that reports events to `events`.
	pub fn with_events(ctx: &BridgeContext, events: impl BrowserEvents + 'static) -> Self {
		let uuid: Arc<str> = Arc::from(uuid::Uuid::new_v4().to_string());
		let connection = ctx.connection();
		let channel = Channel::shared(Arc::clone(&uuid), Arc::clone(&connection));

		let inner = Arc::new(BrowserInner {
			core: PeerCore::new(channel, Lifecycle::closed(), "InAppBrowserOptions"),
			events: Arc::new(events),
		});

		let handler: Arc<dyn InboundHandler> = inner.clone();
		connection.register_peer(uuid, &handler);

		Self { inner }
	}

	/// Correlation id of this browser.
	pub fn uuid(&self) -> &str {
		self.inner.core.channel().uuid().unwrap_or_default()
	}

	pub fn is_open(&self) -> bool {
		self.inner.core.lifecycle().is_open()
	}

	/// Opens the browser.
	///
	/// # Errors
	///
	/// Returns [`Error::AlreadyOpen`] without sending anything if the
	/// browser is open or an `open` is in flight.
	pub async fn open(&self, args: OpenArgs) -> Result<()> {
		let lifecycle = self.inner.core.lifecycle();
		lifecycle.begin_open()?;
		tracing::debug!(uuid = self.uuid(), url = %args.url, "opening browser");

		let result = self
			.inner
			.core
			.channel()
			.send_no_result(OutboundMethod::Open, args)
			.await;
		lifecycle.finish_open(result.is_ok());
		result
	}

	/// Opens `url` with no headers or options.
	pub async fn open_url(&self, url: impl Into<String>) -> Result<()> {
		self.open(OpenArgs::new(url)).await
	}

	/// Opens a bundled asset, `path` being relative to the app's assets.
	pub async fn open_file(&self, path: impl Into<String>, headers: Headers) -> Result<()> {
		self.open(OpenArgs::new(path).local_file().headers(headers)).await
	}

	/// Hands `url` to the platform's default browser.
	///
	/// This browser stays closed: no in-app surface is created.
	pub async fn open_with_system_browser(&self, url: impl Into<String>) -> Result<()> {
		self.inner.core.lifecycle().ensure_closed()?;
		self.inner
			.core
			.channel()
			.send_no_result(OutboundMethod::Open, OpenArgs::new(url).system_browser())
			.await
	}

	pub async fn show(&self) -> Result<()> {
		self.inner.core.call_no_result(OutboundMethod::Show, Value::Null).await
	}

	pub async fn hide(&self) -> Result<()> {
		self.inner.core.call_no_result(OutboundMethod::Hide, Value::Null).await
	}

	/// Closes the browser. It is marked closed once the remote side
	/// acknowledges; `on_exit` follows when the remote side reports it.
	pub async fn close(&self) -> Result<()> {
		self.inner.core.call_no_result(OutboundMethod::Close, Value::Null).await?;
		self.inner.core.lifecycle().mark_closed();
		Ok(())
	}

	pub async fn is_hidden(&self) -> Result<bool> {
		let hidden: Option<bool> = self.inner.core.call(OutboundMethod::IsHidden, Value::Null).await?;
		Ok(hidden.unwrap_or(false))
	}

	pub async fn set_options(&self, options: BrowserOptions) -> Result<()> {
		self.inner.core.set_options(options).await
	}

	pub async fn get_options(&self) -> Result<Option<BrowserOptions>> {
		self.inner.core.get_options().await
	}

	pub async fn load_url(&self, url: &str, headers: Headers) -> Result<()> {
		self.inner.core.load_url(url, headers).await
	}

	/// Loads `url` with a POST request whose body is `post_data`.
	pub async fn post_url(&self, url: &str, post_data: Vec<u8>) -> Result<()> {
		self.inner.core.post_url(url, post_data).await
	}

	pub async fn load_data(&self, args: LoadDataArgs) -> Result<()> {
		self.inner.core.load_data(args).await
	}

	/// Loads a bundled asset.
	pub async fn load_file(&self, path: &str, headers: Headers) -> Result<()> {
		self.inner.core.load_file(path, headers).await
	}

	pub async fn reload(&self) -> Result<()> {
		self.inner.core.reload().await
	}

	pub async fn go_back(&self) -> Result<()> {
		self.inner.core.go_back().await
	}

	pub async fn can_go_back(&self) -> Result<bool> {
		self.inner.core.can_go_back().await
	}

	pub async fn go_forward(&self) -> Result<()> {
		self.inner.core.go_forward().await
	}

	pub async fn can_go_forward(&self) -> Result<bool> {
		self.inner.core.can_go_forward().await
	}

	pub async fn is_loading(&self) -> Result<bool> {
		self.inner.core.is_loading().await
	}

	pub async fn stop_loading(&self) -> Result<()> {
		self.inner.core.stop_loading().await
	}

	/// Evaluates `source` in the page, returning the script's result.
	pub async fn inject_script_code(&self, source: &str) -> Result<Value> {
		self.inner.core.inject_script_code(source).await
	}

	pub async fn inject_script_file(&self, url: &str) -> Result<()> {
		self.inner.core.inject_script_file(url).await
	}

	pub async fn inject_style_code(&self, source: &str) -> Result<()> {
		self.inner.core.inject_style_code(source).await
	}

	pub async fn inject_style_file(&self, url: &str) -> Result<()> {
		self.inner.core.inject_style_file(url).await
	}

	/// Captures the visible page as PNG bytes.
	pub async fn take_screenshot(&self) -> Result<Option<Vec<u8>>> {
		self.inner.core.take_screenshot().await
	}

	pub async fn get_url(&self) -> Result<Option<String>> {
		self.inner.core.get_url().await
	}

	pub async fn get_title(&self) -> Result<Option<String>> {
		self.inner.core.get_title().await
	}

	pub async fn get_progress(&self) -> Result<Option<i64>> {
		self.inner.core.get_progress().await
	}

	/// Registers a script handler callable from the page as `name`.
	///
	/// Handlers live on this side only; nothing is sent to the remote
	/// context, so they may be added before the browser is opened.
	pub fn add_javascript_handler<F>(&self, name: impl Into<String>, callback: F) -> HandlerId
	where
		F: Fn(&[Value]) -> Result<()> + Send + Sync + 'static,
	{
		self.inner.core.scripts().register(name, callback)
	}

	pub fn remove_javascript_handler(&self, name: &str, id: HandlerId) -> bool {
		self.inner.core.scripts().unregister(name, id)
	}

	pub fn script_handlers(&self) -> &ScriptHandlerMultiplexer {
		self.inner.core.scripts()
	}
}

impl std::fmt::Debug for InAppBrowser {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InAppBrowser")
			.field("uuid", &self.uuid())
			.field("open", &self.is_open())
			.finish()
	}
}
