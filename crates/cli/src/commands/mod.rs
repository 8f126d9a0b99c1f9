//! Subcommand implementations.

mod content_type;
mod serve;

use anyhow::Result;

use crate::cli::Commands;

pub use content_type::content_type;
pub use serve::{resolve_config, serve};

pub async fn dispatch(command: Commands) -> Result<()> {
	match command {
		Commands::Serve(args) => serve(args).await,
		Commands::ContentType { path } => content_type(&path).await,
	}
}
