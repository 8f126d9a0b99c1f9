//! State and operations shared by every peer proxy.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use webbridge_protocol::decode::bytes_value;
use webbridge_protocol::{
	BrowserOptions, Headers, InboundEvent, InboundMethod, InjectArgs, LoadDataArgs, LoadUrlArgs,
	OutboundMethod, PostUrlArgs, SetOptionsArgs,
};
use webbridge_runtime::{Channel, Error, InboundMessage, Result};

use crate::script_handler::ScriptHandlerMultiplexer;

const CLOSED: u8 = 0;
const OPENING: u8 = 1;
const OPEN: u8 = 2;

/// Open/closed flag of a peer.
///
/// `Opening` covers the `open` round trip: a second `open` fails with
/// [`Error::AlreadyOpen`] while other operations still fail with
/// [`Error::NotOpen`].
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
	pub(crate) fn closed() -> Self {
		Self(AtomicU8::new(CLOSED))
	}

	pub(crate) fn open() -> Self {
		Self(AtomicU8::new(OPEN))
	}

	pub(crate) fn is_open(&self) -> bool {
		self.0.load(Ordering::SeqCst) == OPEN
	}

	pub(crate) fn ensure_open(&self) -> Result<()> {
		if self.is_open() { Ok(()) } else { Err(Error::NotOpen) }
	}

	pub(crate) fn ensure_closed(&self) -> Result<()> {
		if self.0.load(Ordering::SeqCst) == CLOSED {
			Ok(())
		} else {
			Err(Error::AlreadyOpen)
		}
	}

	/// Claims the open transition. Must be followed by [`finish_open`](Self::finish_open).
	pub(crate) fn begin_open(&self) -> Result<()> {
		self.0
			.compare_exchange(CLOSED, OPENING, Ordering::SeqCst, Ordering::SeqCst)
			.map(|_| ())
			.map_err(|_| Error::AlreadyOpen)
	}

	pub(crate) fn finish_open(&self, succeeded: bool) {
		let next = if succeeded { OPEN } else { CLOSED };
		let _ = self
			.0
			.compare_exchange(OPENING, next, Ordering::SeqCst, Ordering::SeqCst);
	}

	/// Marks the peer closed, returning true if it was open.
	pub(crate) fn mark_closed(&self) -> bool {
		self.0.swap(CLOSED, Ordering::SeqCst) == OPEN
	}
}

/// Decodes a raw inbound message into the closed event set.
pub(crate) fn decode_event(message: &InboundMessage) -> Result<InboundEvent> {
	let method = InboundMethod::from_name(&message.method)
		.ok_or_else(|| Error::UnsupportedOperation(message.method.clone()))?;
	Ok(InboundEvent::decode(method, &message.params)?)
}

/// Channel, lifecycle and script handlers of one browsing surface.
///
/// Holds the navigation and injection calls that standalone browsers and
/// embedded views share; each checks the lifecycle before anything is sent.
pub(crate) struct PeerCore {
	channel: Channel,
	lifecycle: Lifecycle,
	scripts: ScriptHandlerMultiplexer,
	options_type: &'static str,
}

impl PeerCore {
	pub(crate) fn new(channel: Channel, lifecycle: Lifecycle, options_type: &'static str) -> Self {
		Self {
			channel,
			lifecycle,
			scripts: ScriptHandlerMultiplexer::new(),
			options_type,
		}
	}

	pub(crate) fn channel(&self) -> &Channel {
		&self.channel
	}

	pub(crate) fn lifecycle(&self) -> &Lifecycle {
		&self.lifecycle
	}

	pub(crate) fn scripts(&self) -> &ScriptHandlerMultiplexer {
		&self.scripts
	}

	pub(crate) async fn call<P: Serialize, R: DeserializeOwned>(
		&self,
		method: OutboundMethod,
		params: P,
	) -> Result<R> {
		self.lifecycle.ensure_open()?;
		self.channel.send(method, params).await
	}

	pub(crate) async fn call_no_result<P: Serialize>(
		&self,
		method: OutboundMethod,
		params: P,
	) -> Result<()> {
		self.lifecycle.ensure_open()?;
		self.channel.send_no_result(method, params).await
	}

	async fn call_no_params<R: DeserializeOwned>(&self, method: OutboundMethod) -> Result<R> {
		self.lifecycle.ensure_open()?;
		self.channel.send_no_params(method).await
	}

	pub(crate) async fn load_url(&self, url: &str, headers: Headers) -> Result<()> {
		let args = LoadUrlArgs {
			url: url.to_string(),
			headers,
		};
		self.call_no_result(OutboundMethod::LoadUrl, args).await
	}

	pub(crate) async fn post_url(&self, url: &str, post_data: Vec<u8>) -> Result<()> {
		let args = PostUrlArgs {
			url: url.to_string(),
			post_data,
		};
		self.call_no_result(OutboundMethod::PostUrl, args).await
	}

	pub(crate) async fn load_data(&self, args: LoadDataArgs) -> Result<()> {
		self.call_no_result(OutboundMethod::LoadData, args).await
	}

	pub(crate) async fn load_file(&self, path: &str, headers: Headers) -> Result<()> {
		let args = LoadUrlArgs {
			url: path.to_string(),
			headers,
		};
		self.call_no_result(OutboundMethod::LoadFile, args).await
	}

	pub(crate) async fn reload(&self) -> Result<()> {
		self.call_no_params::<Value>(OutboundMethod::Reload).await.map(drop)
	}

	pub(crate) async fn go_back(&self) -> Result<()> {
		self.call_no_params::<Value>(OutboundMethod::GoBack).await.map(drop)
	}

	pub(crate) async fn can_go_back(&self) -> Result<bool> {
		self.flag(OutboundMethod::CanGoBack).await
	}

	pub(crate) async fn go_forward(&self) -> Result<()> {
		self.call_no_params::<Value>(OutboundMethod::GoForward).await.map(drop)
	}

	pub(crate) async fn can_go_forward(&self) -> Result<bool> {
		self.flag(OutboundMethod::CanGoForward).await
	}

	pub(crate) async fn is_loading(&self) -> Result<bool> {
		self.flag(OutboundMethod::IsLoading).await
	}

	pub(crate) async fn stop_loading(&self) -> Result<()> {
		self.call_no_params::<Value>(OutboundMethod::StopLoading).await.map(drop)
	}

	/// Evaluates `source` in the page and returns the script's result.
	pub(crate) async fn inject_script_code(&self, source: &str) -> Result<Value> {
		self.call(OutboundMethod::InjectScriptCode, InjectArgs::Source(source.to_string()))
			.await
	}

	pub(crate) async fn inject_script_file(&self, url: &str) -> Result<()> {
		self.call_no_result(OutboundMethod::InjectScriptFile, InjectArgs::UrlFile(url.to_string()))
			.await
	}

	pub(crate) async fn inject_style_code(&self, source: &str) -> Result<()> {
		self.call_no_result(OutboundMethod::InjectStyleCode, InjectArgs::Source(source.to_string()))
			.await
	}

	pub(crate) async fn inject_style_file(&self, url: &str) -> Result<()> {
		self.call_no_result(OutboundMethod::InjectStyleFile, InjectArgs::UrlFile(url.to_string()))
			.await
	}

	/// PNG bytes of the visible page, `None` if the remote side could not
	/// capture one.
	pub(crate) async fn take_screenshot(&self) -> Result<Option<Vec<u8>>> {
		let value: Value = self.call_no_params(OutboundMethod::TakeScreenshot).await?;
		if value.is_null() {
			return Ok(None);
		}
		Ok(Some(bytes_value("result", &value)?))
	}

	pub(crate) async fn get_url(&self) -> Result<Option<String>> {
		self.call_no_params(OutboundMethod::GetUrl).await
	}

	pub(crate) async fn get_title(&self) -> Result<Option<String>> {
		self.call_no_params(OutboundMethod::GetTitle).await
	}

	pub(crate) async fn get_progress(&self) -> Result<Option<i64>> {
		self.call_no_params(OutboundMethod::GetProgress).await
	}

	pub(crate) async fn set_options(&self, options: BrowserOptions) -> Result<()> {
		let args = SetOptionsArgs {
			options,
			options_type: self.options_type,
		};
		self.call_no_result(OutboundMethod::SetOptions, args).await
	}

	pub(crate) async fn get_options(&self) -> Result<Option<BrowserOptions>> {
		self.call_no_params(OutboundMethod::GetOptions).await
	}

	async fn flag(&self, method: OutboundMethod) -> Result<bool> {
		let value: Option<bool> = self.call_no_params(method).await?;
		Ok(value.unwrap_or(false))
	}

	/// Forwards `onCallJsHandler` to the script handlers.
	pub(crate) fn call_js_handler(&self, handler_name: &str, args: &str) -> Result<()> {
		let invoked = self.scripts.dispatch(handler_name, args)?;
		tracing::debug!(handler = handler_name, invoked, "script handler call");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lifecycle_transitions() {
		let lifecycle = Lifecycle::closed();
		assert!(matches!(lifecycle.ensure_open(), Err(Error::NotOpen)));

		lifecycle.begin_open().unwrap();
		assert!(matches!(lifecycle.begin_open(), Err(Error::AlreadyOpen)));
		assert!(matches!(lifecycle.ensure_open(), Err(Error::NotOpen)));

		lifecycle.finish_open(true);
		assert!(lifecycle.is_open());
		assert!(matches!(lifecycle.ensure_closed(), Err(Error::AlreadyOpen)));

		assert!(lifecycle.mark_closed());
		assert!(!lifecycle.mark_closed());
		lifecycle.ensure_closed().unwrap();
	}

	#[test]
	fn failed_open_returns_to_closed() {
		let lifecycle = Lifecycle::closed();
		lifecycle.begin_open().unwrap();
		lifecycle.finish_open(false);
		assert!(!lifecycle.is_open());
		lifecycle.begin_open().unwrap();
	}

	#[test]
	fn unknown_method_is_unsupported() {
		let err = decode_event(&InboundMessage::new("onTeleport", serde_json::json!({}))).unwrap_err();
		assert!(matches!(err, Error::UnsupportedOperation(ref m) if m == "onTeleport"));
	}

	#[test]
	fn malformed_payload_names_field() {
		let err = decode_event(&InboundMessage::new(
			"onLoadError",
			serde_json::json!({"url": "x", "code": "not a number"}),
		))
		.unwrap_err();
		assert_eq!(err.decode_field(), Some("code"));
	}
}
