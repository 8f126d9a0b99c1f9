//! Wire types for the webbridge control channel.
//!
//! This crate contains the payload shapes exchanged with the remote
//! browsing context: outbound method names and argument maps, and the
//! closed set of inbound events with their defensive decoders.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No transport or lifecycle behavior
//! - **Decoded once**: Raw argument maps become an [`InboundEvent`] at the
//!   peer boundary, so dispatch is a `match` over a closed set
//! - **Opaque options**: Platform option maps are carried as JSON and never
//!   interpreted
//!
//! Routing, correlation and lifecycle live in `webbridge-runtime` and
//! `webbridge`.

pub mod console;
pub mod decode;
pub mod error;
pub mod events;
pub mod method;
pub mod options;
pub mod resource;

pub use console::{ConsoleMessage, ConsoleMessageLevel};
pub use error::DecodeError;
pub use events::InboundEvent;
pub use method::{InboundMethod, OutboundMethod};
pub use options::*;
pub use resource::{WebResourceRequest, WebResourceResponse};
