//! Plain files stored as opaque blobs
//!
//! Each file resource owns one blob named by a random UUID inside the files
//! directory. The resource content records which blob and how large it is.

use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, NewResource},
	infra::dispatch::ResourceTypeHandler,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
	io::ErrorKind,
	path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

pub const FILE_TYPE: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
	pub blob: Uuid,
	pub size: u64,
}

impl FileContent {
	pub fn of(resource: &AbstractResource) -> Result<Self> {
		serde_json::from_value(resource.content.clone()).map_err(|e| {
			CoreError::InvalidResource(format!(
				"resource {} carries no file content: {e}",
				resource.id
			))
		})
	}
}

#[derive(Debug, Clone)]
pub struct FileHandler {
	files_dir: PathBuf,
}

impl FileHandler {
	pub fn new(files_dir: impl Into<PathBuf>) -> Self {
		Self {
			files_dir: files_dir.into(),
		}
	}

	pub fn files_dir(&self) -> &Path {
		&self.files_dir
	}

	fn blob_path(&self, blob: Uuid) -> PathBuf {
		self.files_dir.join(blob.to_string())
	}

	/// Stores `bytes` as a new blob, ready to be passed to `create`
	pub async fn import(&self, name: &str, bytes: &[u8]) -> Result<NewResource> {
		let content = self.write_blob(bytes).await?;
		debug!(blob = %content.blob, size = content.size, "Imported file");

		let content = serde_json::to_value(content).map_err(anyhow::Error::from)?;
		Ok(NewResource::new(name).with_content(content))
	}

	pub async fn read(&self, resource: &AbstractResource) -> Result<Vec<u8>> {
		let content = FileContent::of(resource)?;
		Ok(fs::read(self.blob_path(content.blob)).await?)
	}

	async fn write_blob(&self, bytes: &[u8]) -> Result<FileContent> {
		fs::create_dir_all(&self.files_dir).await?;

		let blob = Uuid::new_v4();
		fs::write(self.blob_path(blob), bytes).await?;

		Ok(FileContent {
			blob,
			size: bytes.len() as u64,
		})
	}
}

#[async_trait]
impl ResourceTypeHandler for FileHandler {
	async fn copy(&self, source: &AbstractResource) -> Result<NewResource> {
		let original = FileContent::of(source)?;
		let blob = Uuid::new_v4();

		fs::create_dir_all(&self.files_dir).await?;
		let size = fs::copy(self.blob_path(original.blob), self.blob_path(blob)).await?;

		debug!(from = %original.blob, to = %blob, "Copied file blob");

		let content =
			serde_json::to_value(FileContent { blob, size }).map_err(anyhow::Error::from)?;
		Ok(NewResource::new(source.name.clone())
			.with_share_type(source.share_type)
			.with_content(content))
	}

	async fn delete(&self, resources: &[AbstractResource]) -> Result<()> {
		for resource in resources {
			let content = FileContent::of(resource)?;

			match fs::remove_file(self.blob_path(content.blob)).await {
				Ok(()) => debug!(blob = %content.blob, "Removed file blob"),
				Err(e) if e.kind() == ErrorKind::NotFound => {
					warn!(blob = %content.blob, "File blob already gone");
				}
				Err(e) => return Err(e.into()),
			}
		}

		Ok(())
	}

	async fn export(&self, resource: &AbstractResource) -> Result<Option<PathBuf>> {
		let path = self.blob_path(FileContent::of(resource)?.blob);

		if fs::try_exists(&path).await? {
			Ok(Some(path))
		} else {
			warn!(resource_id = %resource.id, "File blob missing, nothing to export");
			Ok(None)
		}
	}
}
