//! webbridge - remote-controlled web views over one control channel
//!
//! Every browsing surface lives in a remote context (the native side that
//! owns the rendering engine). This crate gives each surface a local proxy
//! and multiplexes all of them over a single framed transport:
//!
//! - [`InAppBrowser`]: standalone browser window on the shared channel
//! - [`ChromeSafariBrowser`]: platform custom tab with an optional in-app fallback
//! - [`WebViewController`]: embedded view on its own instance channel
//! - [`ScriptHandlerMultiplexer`]: named callbacks invocable from page scripts
//! - [`LocalAssetServer`]: loopback HTTP server for bundled assets
//!
//! # Example
//!
//! ```ignore
//! use webbridge::{BridgeContext, InAppBrowser};
//!
//! let ctx = BridgeContext::over(stdout, stdin);
//! let browser = InAppBrowser::new(&ctx);
//! browser.open_url("https://example.com").await?;
//! browser.add_javascript_handler("ping", |args| {
//!     println!("ping {args:?}");
//!     Ok(())
//! });
//! ```

mod asset_server;
mod browser;
mod context;
mod custom_tab;
mod peer;
mod script_handler;
mod web_view;

#[cfg(test)]
mod testing;

pub use asset_server::{
	AssetServerConfig, AssetSource, DirAssets, LocalAssetServer, MemoryAssets, content_type_for,
};
pub use browser::{BrowserEvents, InAppBrowser};
pub use context::BridgeContext;
pub use custom_tab::{ChromeSafariBrowser, ChromeSafariEvents};
pub use script_handler::{HandlerId, ScriptCallback, ScriptHandlerMultiplexer};
pub use web_view::WebViewController;
pub use webbridge_protocol::{
	BrowserOptions, ConsoleMessage, ConsoleMessageLevel, DecodeError, Headers, InboundEvent,
	LoadDataArgs, OpenArgs, WebResourceRequest, WebResourceResponse,
};
pub use webbridge_runtime::{Error, Result};
