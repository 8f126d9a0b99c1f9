//! Outbound argument maps.
//!
//! Platform option maps are opaque to the bridge: they are built by the
//! caller, carried as JSON objects and interpreted only by the remote side.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Opaque platform options (`options`, `optionsFallback`, `setOptions`).
pub type BrowserOptions = Map<String, Value>;

/// Request headers attached to a navigation.
pub type Headers = HashMap<String, String>;

/// Arguments of `open` for a standalone browser.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenArgs {
	pub url: String,
	pub headers: Headers,
	pub options: BrowserOptions,
	pub open_with_system_browser: bool,
	pub is_local_file: bool,
	pub use_chrome_safari_browser: bool,
}

impl OpenArgs {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			..Default::default()
		}
	}

	pub fn headers(mut self, headers: Headers) -> Self {
		self.headers = headers;
		self
	}

	pub fn options(mut self, options: BrowserOptions) -> Self {
		self.options = options;
		self
	}

	/// Marks `url` as a path to a bundled asset rather than a remote URL.
	pub fn local_file(mut self) -> Self {
		self.is_local_file = true;
		self
	}

	/// Hands the URL to the platform browser instead of an in-app view.
	pub fn system_browser(mut self) -> Self {
		self.open_with_system_browser = true;
		self
	}
}

/// Arguments of `open` for a custom-tab browser.
///
/// `uuid_fallback` is the fallback browser's correlation id, or an empty
/// string when there is none; the remote side decides at runtime which of
/// the two surfaces to show. `headers` only take effect in the fallback.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeSafariOpenArgs {
	pub url: String,
	pub headers: Headers,
	pub options: BrowserOptions,
	pub open_with_system_browser: bool,
	pub is_local_file: bool,
	pub use_chrome_safari_browser: bool,
	pub uuid_fallback: String,
	pub options_fallback: BrowserOptions,
}

/// Arguments of `postUrl`. `post_data` is sent as raw bytes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUrlArgs {
	pub url: String,
	pub post_data: Vec<u8>,
}

/// Arguments of `loadData`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDataArgs {
	pub data: String,
	pub mime_type: String,
	pub encoding: String,
	pub base_url: String,
}

impl LoadDataArgs {
	pub fn html(data: impl Into<String>) -> Self {
		Self {
			data: data.into(),
			mime_type: "text/html".to_string(),
			encoding: "utf8".to_string(),
			base_url: "about:blank".to_string(),
		}
	}

	pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
		self.mime_type = mime_type.into();
		self
	}

	pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
		self.encoding = encoding.into();
		self
	}

	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}
}

/// Arguments of `loadUrl` and `loadFile`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadUrlArgs {
	pub url: String,
	pub headers: Headers,
}

/// Arguments of the `inject*` family: `source` for code, `urlFile` for files.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectArgs {
	Source(String),
	UrlFile(String),
}

/// Arguments of `setOptions`. `options_type` names the peer kind the map
/// was built for, so the remote side can pick the right decoder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOptionsArgs {
	pub options: BrowserOptions,
	pub options_type: &'static str,
}
