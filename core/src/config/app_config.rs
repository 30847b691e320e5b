//! Application configuration

use super::{default_data_dir, Migrate};
use crate::domain::{ResourceType, ResourceTypeRegistry};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{
	fs,
	path::{Path, PathBuf},
};
use tracing::{info, warn};

const CONFIG_FILE: &str = "arbor.json";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Where directory exports are written, the system temp dir when unset
	#[serde(default)]
	pub export_dir: Option<PathBuf>,

	/// Database connection string, `arbor.db` in the data dir when unset
	#[serde(default)]
	pub database_url: Option<String>,

	/// Resource types besides `directory`
	#[serde(default = "default_resource_types")]
	pub resource_types: Vec<ResourceTypeConfig>,
}

/// A registered resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTypeConfig {
	pub name: String,

	#[serde(default)]
	pub config: serde_json::Value,
}

fn default_resource_types() -> Vec<ResourceTypeConfig> {
	vec![ResourceTypeConfig {
		name: "file".to_string(),
		config: serde_json::Value::Null,
	}]
}

impl AppConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)?;

			if config.needs_migration() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Load or create configuration, replacing an unreadable file with defaults
	pub fn load_or_create(data_dir: &Path) -> Result<Self> {
		Self::load_from(data_dir).or_else(|e| {
			warn!("Failed to load config, using defaults: {e:#}");
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		})
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			export_dir: None,
			database_url: None,
			resource_types: default_resource_types(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	/// Blob storage of the built-in file type
	pub fn files_dir(&self) -> PathBuf {
		self.data_dir.join("files")
	}

	pub fn export_dir(&self) -> PathBuf {
		self.export_dir.clone().unwrap_or_else(std::env::temp_dir)
	}

	pub fn database_url(&self) -> String {
		self.database_url.clone().unwrap_or_else(|| {
			format!(
				"sqlite://{}?mode=rwc",
				self.data_dir.join("arbor.db").display()
			)
		})
	}

	/// Registry holding `directory` plus every configured type
	pub fn type_registry(&self) -> ResourceTypeRegistry {
		ResourceTypeRegistry::with_types(self.resource_types.iter().map(|entry| {
			ResourceType::new(entry.name.clone()).with_config(entry.config.clone())
		}))
	}

	/// Ensure all required directories exist
	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		fs::create_dir_all(self.files_dir())?;
		Ok(())
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
		Self::default_with_dir(data_dir)
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		2
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				self.migrate()
			}
			1 => {
				// v2 introduced configurable resource types
				if self.resource_types.is_empty() {
					self.resource_types = default_resource_types();
				}
				self.version = 2;
				Ok(())
			}
			2 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}
