//! Wiring of a ready-to-use tree manager

use crate::{
	common::errors::Result,
	config::AppConfig,
	infra::{
		db::DbStore,
		dispatch::DispatchBus,
		security::CreatorOwnership,
	},
	ops::{
		handlers::{FileHandler, FILE_TYPE},
		ResourceManager,
	},
};
use arbor_archive::TarFormat;
use std::sync::Arc;
use tracing::info;

/// Everything a caller needs to operate on resource trees
pub struct CoreContext {
	pub config: AppConfig,
	pub db: Arc<DbStore>,
	pub files: Arc<FileHandler>,
	pub resources: ResourceManager,
}

impl CoreContext {
	/// Opens the database (running migrations) and builds the manager
	pub async fn open(config: AppConfig) -> Result<Self> {
		config.ensure_directories()?;

		let db = Arc::new(DbStore::connect(&config.database_url()).await?);

		let bus = Arc::new(DispatchBus::new());
		let files = Arc::new(FileHandler::new(config.files_dir()));
		bus.register(FILE_TYPE, files.clone());

		let types = Arc::new(config.type_registry());
		let resources = ResourceManager::new(db.clone(), types, bus)
			.with_ownership(Arc::new(CreatorOwnership))
			.with_archive_format(Arc::new(TarFormat))
			.with_export_dir(config.export_dir());

		info!(
			data_dir = %config.data_dir.display(),
			types = ?resources.types().names(),
			"Core context ready"
		);

		Ok(Self {
			config,
			db,
			files,
			resources,
		})
	}
}
