//! Inbound events, decoded once from raw argument maps.

use serde_json::Value;

use crate::console::ConsoleMessage;
use crate::decode::Payload;
use crate::error::DecodeError;
use crate::method::InboundMethod;
use crate::resource::{WebResourceRequest, WebResourceResponse};

/// Closed set of events the remote context can deliver to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
	/// The standalone browser was closed on the remote side.
	Exit,
	ChromeSafariBrowserOpened,
	ChromeSafariBrowserLoaded,
	ChromeSafariBrowserClosed,
	LoadStart {
		url: String,
	},
	LoadStop {
		url: String,
	},
	LoadError {
		url: String,
		code: i64,
		message: String,
	},
	ProgressChanged {
		progress: i64,
	},
	ShouldOverrideUrlLoading {
		url: String,
	},
	LoadResource {
		response: WebResourceResponse,
		request: WebResourceRequest,
	},
	ConsoleMessage(ConsoleMessage),
	/// A script handler invocation; `args` is a JSON-encoded array.
	CallJsHandler {
		handler_name: String,
		args: String,
	},
}

impl InboundEvent {
	/// Decodes the argument map of `method`.
	pub fn decode(method: InboundMethod, params: &Value) -> Result<Self, DecodeError> {
		let payload = Payload::root(params)?;

		let event = match method {
			InboundMethod::Exit => Self::Exit,
			InboundMethod::ChromeSafariBrowserOpened => Self::ChromeSafariBrowserOpened,
			InboundMethod::ChromeSafariBrowserLoaded => Self::ChromeSafariBrowserLoaded,
			InboundMethod::ChromeSafariBrowserClosed => Self::ChromeSafariBrowserClosed,
			InboundMethod::LoadStart => Self::LoadStart {
				url: payload.string("url")?,
			},
			InboundMethod::LoadStop => Self::LoadStop {
				url: payload.string("url")?,
			},
			InboundMethod::LoadError => Self::LoadError {
				url: payload.string("url")?,
				code: payload.int("code")?,
				message: payload.opt_string("message")?.unwrap_or_default(),
			},
			InboundMethod::ProgressChanged => Self::ProgressChanged {
				progress: payload.int("progress")?,
			},
			InboundMethod::ShouldOverrideUrlLoading => Self::ShouldOverrideUrlLoading {
				url: payload.string("url")?,
			},
			InboundMethod::LoadResource => {
				let response_path = payload.path_of("response");
				let request_path = payload.path_of("request");
				let response = payload.object("response", &response_path)?;
				let request = payload.object("request", &request_path)?;
				Self::LoadResource {
					response: WebResourceResponse::decode(&response)?,
					request: WebResourceRequest::decode(&request)?,
				}
			}
			InboundMethod::ConsoleMessage => Self::ConsoleMessage(ConsoleMessage::decode(&payload)?),
			InboundMethod::CallJsHandler => Self::CallJsHandler {
				handler_name: payload.string("handlerName")?,
				args: payload
					.opt_string("args")?
					.unwrap_or_else(|| "[]".to_string()),
			},
		};

		Ok(event)
	}

	/// The method this event was decoded from.
	pub fn method(&self) -> InboundMethod {
		match self {
			Self::Exit => InboundMethod::Exit,
			Self::ChromeSafariBrowserOpened => InboundMethod::ChromeSafariBrowserOpened,
			Self::ChromeSafariBrowserLoaded => InboundMethod::ChromeSafariBrowserLoaded,
			Self::ChromeSafariBrowserClosed => InboundMethod::ChromeSafariBrowserClosed,
			Self::LoadStart { .. } => InboundMethod::LoadStart,
			Self::LoadStop { .. } => InboundMethod::LoadStop,
			Self::LoadError { .. } => InboundMethod::LoadError,
			Self::ProgressChanged { .. } => InboundMethod::ProgressChanged,
			Self::ShouldOverrideUrlLoading { .. } => InboundMethod::ShouldOverrideUrlLoading,
			Self::LoadResource { .. } => InboundMethod::LoadResource,
			Self::ConsoleMessage(_) => InboundMethod::ConsoleMessage,
			Self::CallJsHandler { .. } => InboundMethod::CallJsHandler,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::console::ConsoleMessageLevel;
	use serde_json::json;

	#[test]
	fn load_error_carries_code_and_message() {
		let event = InboundEvent::decode(
			InboundMethod::LoadError,
			&json!({"uuid": "u", "url": "https://x.test", "code": -6, "message": "refused"}),
		)
		.unwrap();
		assert_eq!(
			event,
			InboundEvent::LoadError {
				url: "https://x.test".into(),
				code: -6,
				message: "refused".into(),
			}
		);
	}

	#[test]
	fn load_resource_decodes_nested_maps() {
		let params = json!({
			"response": {
				"url": "https://x.test/app.js",
				"headers": {"Content-Length": 5},
				"statusCode": 200,
				"startTime": 1700000000000i64,
				"duration": 12,
				"data": "aGVsbG8="
			},
			"request": {
				"url": "https://x.test/app.js",
				"headers": null,
				"method": "GET"
			}
		});
		let InboundEvent::LoadResource { response, request } =
			InboundEvent::decode(InboundMethod::LoadResource, &params).unwrap()
		else {
			panic!("expected LoadResource");
		};
		assert_eq!(response.status_code, 200);
		assert_eq!(response.headers["Content-Length"], "5");
		assert_eq!(response.text(), "hello");
		assert_eq!(request.method, "GET");
		assert!(request.headers.is_empty());
	}

	#[test]
	fn load_resource_reports_nested_field() {
		let params = json!({
			"response": {"url": "u", "statusCode": "200"},
			"request": {"url": "u"}
		});
		let err = InboundEvent::decode(InboundMethod::LoadResource, &params).unwrap_err();
		assert_eq!(err.field, "response.statusCode");
	}

	#[test]
	fn missing_request_object_is_named() {
		let params = json!({"response": {"url": "u", "statusCode": 200}});
		let err = InboundEvent::decode(InboundMethod::LoadResource, &params).unwrap_err();
		assert_eq!(err.field, "request");
		assert_eq!(err.reason, "missing");
	}

	#[test]
	fn console_message_levels() {
		let event = InboundEvent::decode(
			InboundMethod::ConsoleMessage,
			&json!({"sourceURL": "app.js", "lineNumber": 3, "message": "boom", "messageLevel": "error"}),
		)
		.unwrap();
		let InboundEvent::ConsoleMessage(msg) = event else {
			panic!("expected ConsoleMessage");
		};
		assert_eq!(msg.level, ConsoleMessageLevel::Error);
		assert_eq!(msg.line_number, 3);

		let err = InboundEvent::decode(
			InboundMethod::ConsoleMessage,
			&json!({"message": "m", "messageLevel": "VERBOSE"}),
		)
		.unwrap_err();
		assert_eq!(err.field, "messageLevel");
	}

	#[test]
	fn call_js_handler_defaults_to_empty_args() {
		let event =
			InboundEvent::decode(InboundMethod::CallJsHandler, &json!({"handlerName": "ping"}))
				.unwrap();
		assert_eq!(
			event,
			InboundEvent::CallJsHandler {
				handler_name: "ping".into(),
				args: "[]".into(),
			}
		);
		assert_eq!(event.method(), InboundMethod::CallJsHandler);
	}

	#[test]
	fn load_start_requires_string_url() {
		let err =
			InboundEvent::decode(InboundMethod::LoadStart, &json!({"url": 5})).unwrap_err();
		assert_eq!(err.field, "url");
	}
}
