use std::path::Path;

use anyhow::{Context, Result};

/// Prints the content type inferred for the file at `path`.
pub async fn content_type(path: &Path) -> Result<()> {
	let data = tokio::fs::read(path)
		.await
		.with_context(|| format!("failed to read {}", path.display()))?;
	println!("{}", webbridge::content_type_for(&path.to_string_lossy(), &data));
	Ok(())
}
