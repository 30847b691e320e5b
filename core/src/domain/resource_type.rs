//! Resource Type Registry
//!
//! Maps a type name ("directory", "file", ...) to its immutable registry
//! entry. The directory type is always present since the tree itself is made
//! of directories.

use super::DIRECTORY_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable registry entry for a kind of resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
	pub name: String,
	/// Type-level configuration, opaque to the tree manager
	#[serde(default)]
	pub config: serde_json::Value,
}

impl ResourceType {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			config: serde_json::Value::Null,
		}
	}

	pub fn with_config(mut self, config: serde_json::Value) -> Self {
		self.config = config;
		self
	}

	pub fn is_directory(&self) -> bool {
		self.name == DIRECTORY_TYPE
	}
}

#[derive(Debug, Clone)]
pub struct ResourceTypeRegistry {
	types: HashMap<String, ResourceType>,
}

impl Default for ResourceTypeRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ResourceTypeRegistry {
	pub fn new() -> Self {
		let mut types = HashMap::new();
		types.insert(DIRECTORY_TYPE.to_string(), ResourceType::new(DIRECTORY_TYPE));

		Self { types }
	}

	pub fn with_types(types: impl IntoIterator<Item = ResourceType>) -> Self {
		let mut registry = Self::new();
		for resource_type in types {
			registry.register(resource_type);
		}
		registry
	}

	/// Registers a type; an existing entry with the same name is kept
	pub fn register(&mut self, resource_type: ResourceType) -> bool {
		if self.types.contains_key(&resource_type.name) {
			return false;
		}

		self.types.insert(resource_type.name.clone(), resource_type);
		true
	}

	pub fn get(&self, name: &str) -> Option<&ResourceType> {
		self.types.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.types.contains_key(name)
	}

	pub fn names(&self) -> Vec<&str> {
		let mut names = self.types.keys().map(String::as_str).collect::<Vec<_>>();
		names.sort_unstable();
		names
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn directory_is_always_registered() {
		let registry = ResourceTypeRegistry::new();
		assert!(registry.get(DIRECTORY_TYPE).is_some_and(ResourceType::is_directory));
	}

	#[test]
	fn entries_are_immutable_once_registered() {
		let mut registry = ResourceTypeRegistry::with_types([
			ResourceType::new("file").with_config(serde_json::json!({ "max_size": 10 })),
		]);

		assert!(!registry.register(ResourceType::new("file")));
		assert_eq!(
			registry.get("file").map(|t| t.config.clone()),
			Some(serde_json::json!({ "max_size": 10 }))
		);
		assert_eq!(registry.names(), vec!["directory", "file"]);
		assert!(registry.get("text").is_none());
	}
}
