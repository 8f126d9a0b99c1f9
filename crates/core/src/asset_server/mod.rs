//! [`LocalAssetServer`] - loopback HTTP server for bundled assets.
//!
//! Pages loaded from `http://127.0.0.1:<port>/` get a real origin, which
//! `file://` URLs do not. A missing asset is answered with an empty 404
//! and never surfaces as a server error.

mod mime;
mod source;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use webbridge_runtime::{Error, Result};

pub use mime::{DEFAULT_CONTENT_TYPE, content_type_for};
pub use source::{AssetSource, DirAssets, LoadFuture, MemoryAssets};

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration of a [`LocalAssetServer`] backed by a directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssetServerConfig {
	/// Loopback port; 0 picks a free one.
	pub port: u16,
	/// Directory assets are served from.
	pub root: PathBuf,
}

impl Default for AssetServerConfig {
	fn default() -> Self {
		Self {
			port: DEFAULT_PORT,
			root: PathBuf::from("assets"),
		}
	}
}

struct RunningServer {
	addr: SocketAddr,
	task: JoinHandle<()>,
}

/// Serves assets from an [`AssetSource`] on the loopback interface.
pub struct LocalAssetServer {
	port: u16,
	source: Arc<dyn AssetSource>,
	running: Mutex<Option<RunningServer>>,
}

impl LocalAssetServer {
	pub fn new(port: u16, source: impl AssetSource) -> Self {
		Self {
			port,
			source: Arc::new(source),
			running: Mutex::new(None),
		}
	}

	/// Server reading from `config.root` on `config.port`.
	pub fn from_config(config: &AssetServerConfig) -> Self {
		Self::new(config.port, DirAssets::new(&config.root))
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	/// Binds `127.0.0.1:<port>` and starts serving. Returns the bound
	/// address, which differs from the configured port when that is 0.
	///
	/// # Errors
	///
	/// Returns [`Error::AlreadyStarted`] if the server is running, or
	/// [`Error::Io`] if the port cannot be bound.
	pub async fn start(&self) -> Result<SocketAddr> {
		let mut running = self.running.lock().await;
		if running.is_some() {
			return Err(Error::AlreadyStarted);
		}

		let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.port)).await?;
		let addr = listener.local_addr()?;
		let app = router(Arc::clone(&self.source));

		let task = tokio::spawn(async move {
			if let Err(e) = axum::serve(listener, app.into_make_service()).await {
				tracing::error!("asset server stopped: {}", e);
			}
		});

		tracing::info!(%addr, "asset server listening");
		*running = Some(RunningServer { addr, task });
		Ok(addr)
	}

	/// Stops listening. Does nothing if the server is not running.
	pub async fn close(&self) {
		let Some(server) = self.running.lock().await.take() else {
			return;
		};
		server.task.abort();
		let _ = server.task.await;
		tracing::info!(addr = %server.addr, "asset server closed");
	}

	pub async fn is_running(&self) -> bool {
		self.running.lock().await.is_some()
	}

	/// Bound address while running.
	pub async fn local_addr(&self) -> Option<SocketAddr> {
		self.running.lock().await.as_ref().map(|server| server.addr)
	}
}

impl std::fmt::Debug for LocalAssetServer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalAssetServer")
			.field("port", &self.port)
			.finish_non_exhaustive()
	}
}

fn router(source: Arc<dyn AssetSource>) -> Router {
	Router::new().fallback(serve_asset).with_state(source)
}

/// Maps a request path to an asset path. Directory-style paths get
/// `index.html` appended; the flag reports whether that happened.
fn asset_path(request_path: &str) -> (String, bool) {
	let path = request_path.trim_start_matches('/');
	if path.is_empty() || path.ends_with('/') {
		(format!("{path}index.html"), true)
	} else {
		(path.to_string(), false)
	}
}

async fn serve_asset(State(source): State<Arc<dyn AssetSource>>, uri: Uri) -> Response {
	let (path, directory_style) = asset_path(uri.path());

	let data = match source.load(&path).await {
		Ok(data) => data,
		Err(e) => {
			tracing::debug!(%path, "asset not found: {}", e);
			return (StatusCode::NOT_FOUND, Bytes::new()).into_response();
		}
	};

	let content_type = if directory_style {
		DEFAULT_CONTENT_TYPE
	} else {
		content_type_for(&path, &data)
	};
	tracing::debug!(%path, content_type, len = data.len(), "serving asset");

	([(header::CONTENT_TYPE, content_type)], data).into_response()
}
