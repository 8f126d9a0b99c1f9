//! [`WebViewController`] - embedded view on its own instance channel.

use std::sync::Arc;

use serde_json::Value;
use webbridge_protocol::{BrowserOptions, Headers, LoadDataArgs, OutboundMethod};
use webbridge_runtime::{Channel, Error, InboundHandler, InboundMessage, Result};

use crate::browser::{BrowserEvents, deliver_navigation};
use crate::context::BridgeContext;
use crate::peer::{Lifecycle, PeerCore, decode_event};
use crate::script_handler::{HandlerId, ScriptHandlerMultiplexer};

struct WebViewInner {
	id: u64,
	core: PeerCore,
	events: Arc<dyn BrowserEvents>,
}

impl InboundHandler for WebViewInner {
	fn on_message(&self, message: &InboundMessage) -> Result<()> {
		let event = decode_event(message)?;
		match deliver_navigation(&self.core, self.events.as_ref(), event)? {
			None => Ok(()),
			// onExit and the custom-tab events never target an embedded view
			Some(event) => Err(Error::UnsupportedOperation(event.method().to_string())),
		}
	}
}

impl Drop for WebViewInner {
	fn drop(&mut self) {
		if self.core.lifecycle().mark_closed() {
			tracing::debug!(id = self.id, "web view dropped without dispose");
			self.core.channel().connection().close_instance(self.id);
		}
	}
}

/// Controller of a web view embedded in the host layout.
///
/// The view's numeric id is assigned by the host when it embeds the view;
/// all traffic for it travels on that id's instance channel, so no
/// correlation id is needed. A controller is open from construction until
/// [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct WebViewController {
	inner: Arc<WebViewInner>,
}

impl WebViewController {
	/// Attaches to the embedded view `id`.
	///
	/// # Errors
	///
	/// Returns [`Error::InstanceInUse`] if another live controller is
	/// attached to `id`.
	pub fn attach(ctx: &BridgeContext, id: u64) -> Result<Self> {
		Self::attach_with_events(ctx, id, ())
	}

	pub fn attach_with_events(
		ctx: &BridgeContext,
		id: u64,
		events: impl BrowserEvents + 'static,
	) -> Result<Self> {
		let connection = ctx.connection();
		let inner = Arc::new(WebViewInner {
			id,
			core: PeerCore::new(
				Channel::instance(id, Arc::clone(&connection)),
				Lifecycle::open(),
				"InAppWebViewOptions",
			),
			events: Arc::new(events),
		});

		let handler: Arc<dyn InboundHandler> = inner.clone();
		if let Err(e) = connection.open_instance(id, &handler) {
			// never attached, so dropping must not close the other view's channel
			inner.core.lifecycle().mark_closed();
			return Err(e);
		}

		Ok(Self { inner })
	}

	pub fn id(&self) -> u64 {
		self.inner.id
	}

	/// False once [`dispose`](Self::dispose) has been called.
	pub fn is_open(&self) -> bool {
		self.inner.core.lifecycle().is_open()
	}

	/// Releases the view.
	///
	/// The instance channel is torn down first: calls still waiting on this
	/// view fail with [`Error::Disposed`] and later calls fail with
	/// [`Error::NotOpen`]. Then `dispose` is sent so the remote side frees
	/// its native resources.
	pub async fn dispose(&self) -> Result<()> {
		if !self.inner.core.lifecycle().mark_closed() {
			return Err(Error::NotOpen);
		}
		let channel = self.inner.core.channel();
		channel.connection().close_instance(self.inner.id);
		tracing::debug!(id = self.inner.id, "web view disposed");

		channel.send_no_result(OutboundMethod::Dispose, Value::Null).await
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

	pub async fn post_url(&self, url: &str, post_data: Vec<u8>) -> Result<()> {
		self.inner.core.post_url(url, post_data).await
	}

	pub async fn load_data(&self, args: LoadDataArgs) -> Result<()> {
		self.inner.core.load_data(args).await
	}

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

impl std::fmt::Debug for WebViewController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebViewController")
			.field("id", &self.id())
			.field("open", &self.is_open())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use webbridge_runtime::ChannelId;

	use super::*;
	use crate::testing::MockConnection;

	#[tokio::test]
	async fn calls_travel_on_instance_channel_without_uuid() {
		let mock = MockConnection::new();
		let view = WebViewController::attach(&mock.context(), 7).unwrap();

		view.load_url("https://example.com", Headers::new()).await.unwrap();

		let calls = mock.calls();
		let (channel, method, params) = &calls[0];
		assert_eq!(*channel, ChannelId::Instance(7));
		assert_eq!(method, "loadUrl");
		assert_eq!(params, &json!({"url": "https://example.com", "headers": {}}));
	}

	#[tokio::test]
	async fn set_options_names_view_options() {
		let mock = MockConnection::new();
		let view = WebViewController::attach(&mock.context(), 1).unwrap();
		let mut options = BrowserOptions::new();
		options.insert("javaScriptEnabled".into(), json!(false));

		view.set_options(options).await.unwrap();

		let params = &mock.calls()[0].2;
		assert_eq!(params["optionsType"], "InAppWebViewOptions");
		assert_eq!(params["options"]["javaScriptEnabled"], false);
	}

	#[tokio::test]
	async fn dispose_closes_view() {
		let mock = MockConnection::new();
		let view = WebViewController::attach(&mock.context(), 2).unwrap();

		view.dispose().await.unwrap();

		assert!(!view.is_open());
		assert_eq!(mock.calls().last().unwrap().1, "dispose");
		assert!(matches!(view.reload().await, Err(Error::NotOpen)));
		assert!(matches!(view.dispose().await, Err(Error::NotOpen)));
		assert!(mock.deliver_instance(2, "onLoadStop", json!({"url": "x"})).is_err());
	}

	#[test]
	fn second_controller_for_same_id_is_rejected() {
		let mock = MockConnection::new();
		let ctx = mock.context();
		let first = WebViewController::attach(&ctx, 3).unwrap();

		let err = WebViewController::attach(&ctx, 3).unwrap_err();
		assert!(matches!(err, Error::InstanceInUse(3)));

		// the rejected controller must not have torn down the first one
		assert!(mock.deliver_instance(3, "onLoadStop", json!({"url": "x"})).is_ok());
		drop(first);
		WebViewController::attach(&ctx, 3).unwrap();
	}

	#[test]
	fn malformed_js_handler_args_fail_on_embedded_view() {
		let mock = MockConnection::new();
		let _view = WebViewController::attach(&mock.context(), 6).unwrap();
		let err = mock
			.deliver_instance(6, "onCallJsHandler", json!({"handlerName": "ping", "args": "[1,"}))
			.unwrap_err();
		assert_eq!(err.decode_field(), Some("args"));
	}

	#[test]
	fn exit_is_unsupported_on_embedded_view() {
		let mock = MockConnection::new();
		let view = WebViewController::attach(&mock.context(), 4).unwrap();
		let err = mock.deliver_instance(4, "onExit", json!({})).unwrap_err();
		assert!(matches!(err, Error::UnsupportedOperation(ref m) if m == "onExit"));
		assert!(view.is_open());
	}
}
