use std::path::Path;

use anyhow::{Context, Result, bail};
use webbridge::{AssetServerConfig, LocalAssetServer};

use crate::cli::ServeArgs;

/// Builds the server configuration: defaults, then the config file, then flags.
pub fn resolve_config(args: &ServeArgs) -> Result<AssetServerConfig> {
	let mut config = match &args.config {
		Some(path) => load_config(path)?,
		None => AssetServerConfig::default(),
	};
	if let Some(port) = args.port {
		config.port = port;
	}
	if let Some(root) = &args.root {
		config.root = root.clone();
	}
	Ok(config)
}

fn load_config(path: &Path) -> Result<AssetServerConfig> {
	let text = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
	serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

pub async fn serve(args: ServeArgs) -> Result<()> {
	let config = resolve_config(&args)?;
	if !config.root.is_dir() {
		bail!("asset root {} is not a directory", config.root.display());
	}

	let server = LocalAssetServer::from_config(&config);
	let addr = server
		.start()
		.await
		.with_context(|| format!("failed to listen on 127.0.0.1:{}", config.port))?;
	println!("serving {} at http://{addr}/", config.root.display());

	tokio::signal::ctrl_c().await.context("failed to wait for ctrl-c")?;
	tracing::info!("interrupted, shutting down");
	server.close().await;
	Ok(())
}
