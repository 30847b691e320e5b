//! Resources - the content-bearing side of the tree
//!
//! A resource is never placed in a tree directly. Every position that shows it
//! is a [`ResourceInstance`](super::ResourceInstance), and the resource keeps a
//! count of how many instances currently point at it. The count is only moved
//! by the tree manager, through atomic adjustments applied by the store.

use super::Actor;
use crate::common::errors::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type name of the namespace container resource
pub const DIRECTORY_TYPE: &str = "directory";

/// Who besides the creator may link a resource into their own tree
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShareType {
	#[default]
	Private = 0,
	Public = 1,
}

impl From<i32> for ShareType {
	fn from(value: i32) -> Self {
		match value {
			1 => ShareType::Public,
			_ => ShareType::Private,
		}
	}
}

impl From<ShareType> for i32 {
	fn from(share_type: ShareType) -> Self {
		share_type as i32
	}
}

/// A fully constructed resource payload that is not bound to any tree yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
	pub name: String,
	pub share_type: ShareType,
	/// Type-specific attributes, opaque to the tree manager
	pub content: serde_json::Value,
}

impl NewResource {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			share_type: ShareType::Private,
			content: serde_json::Value::Null,
		}
	}

	pub fn with_content(mut self, content: serde_json::Value) -> Self {
		self.content = content;
		self
	}

	pub fn with_share_type(mut self, share_type: ShareType) -> Self {
		self.share_type = share_type;
		self
	}

	/// Names become archive path segments, so they must be a single segment
	pub fn validate(&self) -> Result<()> {
		let name = self.name.trim();

		if name.is_empty() {
			return Err(CoreError::InvalidResource(
				"resource name must not be empty".to_string(),
			));
		}

		if name == "." || name == ".." || name.contains(['/', '\\']) {
			return Err(CoreError::InvalidResource(format!(
				"resource name <{}> is not a single path segment",
				self.name
			)));
		}

		Ok(())
	}
}

/// The identity- and content-bearing entity, independent of tree positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractResource {
	pub id: Uuid,
	pub name: String,
	pub resource_type: String,
	pub creator_id: Uuid,
	pub share_type: ShareType,
	pub content: serde_json::Value,
	pub created_at: DateTime<Utc>,
	pub(crate) instance_count: u32,
}

impl AbstractResource {
	/// Binds a payload to its type and creator. The count starts at zero and
	/// is raised by the change that inserts its first instance.
	pub(crate) fn from_new(new: NewResource, resource_type: &str, creator: &Actor) -> Self {
		Self {
			id: Uuid::new_v4(),
			name: new.name,
			resource_type: resource_type.to_string(),
			creator_id: creator.id,
			share_type: new.share_type,
			content: new.content,
			created_at: Utc::now(),
			instance_count: 0,
		}
	}

	/// Number of tree positions currently referencing this resource
	pub fn instance_count(&self) -> u32 {
		self.instance_count
	}

	pub fn is_directory(&self) -> bool {
		self.resource_type == DIRECTORY_TYPE
	}

	pub fn is_public(&self) -> bool {
		self.share_type == ShareType::Public
	}

	pub fn is_created_by(&self, actor: &Actor) -> bool {
		self.creator_id == actor.id
	}
}
