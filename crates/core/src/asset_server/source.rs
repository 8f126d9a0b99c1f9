//! Where served assets come from.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Boxed future returned by [`AssetSource::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<u8>>> + Send + 'a>>;

/// A store of bundled assets addressed by relative path.
pub trait AssetSource: Send + Sync + 'static {
	/// Loads the asset at `path` (relative, no leading slash).
	fn load<'a>(&'a self, path: &'a str) -> LoadFuture<'a>;
}

/// Assets read from a directory on disk.
///
/// Paths that resolve outside the root, including through `..` or
/// symlinks, are reported as not found.
#[derive(Debug, Clone)]
pub struct DirAssets {
	root: PathBuf,
}

impl DirAssets {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	async fn read(&self, path: &str) -> io::Result<Vec<u8>> {
		let canonical_root = tokio::fs::canonicalize(&self.root).await?;
		let canonical_file = tokio::fs::canonicalize(self.root.join(path)).await?;
		if !canonical_file.starts_with(&canonical_root) {
			return Err(io::Error::new(
				io::ErrorKind::NotFound,
				format!("{path} resolves outside the asset root"),
			));
		}
		tokio::fs::read(&canonical_file).await
	}
}

impl AssetSource for DirAssets {
	fn load<'a>(&'a self, path: &'a str) -> LoadFuture<'a> {
		Box::pin(self.read(path))
	}
}

/// Assets held in memory, for generated content and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
	files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces the asset at `path`. A leading slash is ignored.
	pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
		let path = path.into();
		self.files
			.insert(path.trim_start_matches('/').to_string(), data.into());
		self
	}

	pub fn with(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		self.insert(path, data);
		self
	}
}

impl AssetSource for MemoryAssets {
	fn load<'a>(&'a self, path: &'a str) -> LoadFuture<'a> {
		let found = self.files.get(path).cloned();
		Box::pin(async move {
			found.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
		})
	}
}
