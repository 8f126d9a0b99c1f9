//! Canonical method names in both directions.

use std::fmt;

macro_rules! method_names {
	(
		$(#[$meta:meta])*
		$vis:vis enum $name:ident { $($variant:ident => $wire:literal,)* }
	) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		$vis enum $name {
			$($variant,)*
		}

		impl $name {
			/// Every method of this direction, in declaration order.
			pub const ALL: &'static [$name] = &[$($name::$variant,)*];

			/// Name as it appears on the wire.
			pub fn as_str(&self) -> &'static str {
				match self {
					$($name::$variant => $wire,)*
				}
			}

			/// Looks up a wire name; `None` for names outside the protocol.
			pub fn from_name(name: &str) -> Option<Self> {
				match name {
					$($wire => Some($name::$variant),)*
					_ => None,
				}
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}
	};
}

method_names! {
	/// Calls sent from a peer to the remote context.
	pub enum OutboundMethod {
		Open => "open",
		Show => "show",
		Hide => "hide",
		Close => "close",
		IsHidden => "isHidden",
		SetOptions => "setOptions",
		GetOptions => "getOptions",
		LoadUrl => "loadUrl",
		PostUrl => "postUrl",
		LoadData => "loadData",
		LoadFile => "loadFile",
		Reload => "reload",
		GoBack => "goBack",
		CanGoBack => "canGoBack",
		GoForward => "goForward",
		CanGoForward => "canGoForward",
		IsLoading => "isLoading",
		StopLoading => "stopLoading",
		InjectScriptCode => "injectScriptCode",
		InjectScriptFile => "injectScriptFile",
		InjectStyleCode => "injectStyleCode",
		InjectStyleFile => "injectStyleFile",
		TakeScreenshot => "takeScreenshot",
		GetUrl => "getUrl",
		GetTitle => "getTitle",
		GetProgress => "getProgress",
		Dispose => "dispose",
	}
}

method_names! {
	/// Events sent from the remote context to a peer.
	pub enum InboundMethod {
		Exit => "onExit",
		ChromeSafariBrowserOpened => "onChromeSafariBrowserOpened",
		ChromeSafariBrowserLoaded => "onChromeSafariBrowserLoaded",
		ChromeSafariBrowserClosed => "onChromeSafariBrowserClosed",
		LoadStart => "onLoadStart",
		LoadStop => "onLoadStop",
		LoadError => "onLoadError",
		ProgressChanged => "onProgressChanged",
		ShouldOverrideUrlLoading => "shouldOverrideUrlLoading",
		LoadResource => "onLoadResource",
		ConsoleMessage => "onConsoleMessage",
		CallJsHandler => "onCallJsHandler",
	}
}
