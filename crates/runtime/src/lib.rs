//! webbridge runtime - transport, correlation and routing
//!
//! This crate provides the plumbing shared by every peer proxy:
//!
//! - **Transport**: length-prefixed JSON frames over an async byte pipe
//! - **Connection**: request/response correlation and the inbound message loop
//! - **Correlation registry**: routes shared-channel events by correlation id
//! - **Instance channels**: routes per-view events by numeric view id
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  webbridge   │  Peer proxies (InAppBrowser, WebViewController, ...)
//! └──────┬───────┘
//!        │ implements InboundHandler, sends through Channel
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  request ids, pending replies, routing
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  framed pipe transport
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! One physical transport carries two kinds of logical channel. The shared
//! channel multiplexes every standalone peer by the `uuid` in its argument
//! map; an instance channel is scoped to one embedded view and carries no
//! correlation id.

pub mod channel;
pub mod connection;
pub mod error;
pub mod handler;
pub mod transport;

pub use channel::{Channel, ChannelId, Route};
pub use connection::{
	Connection, ConnectionLike, CorrelationRegistry, ErrorPayload, Event, InstanceChannels,
	Message, Request, Response,
};
pub use error::{Error, Result};
pub use handler::{InboundHandler, InboundMessage};
pub use transport::{
	PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
	TransportReceiver,
};
