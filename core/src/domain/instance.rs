//! Resource instances - the nodes of a workspace tree

use super::{AbstractResource, Actor, DIRECTORY_TYPE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named position in a workspace hierarchy pointing at exactly one resource
///
/// The resource type is copied from the resource so directories can be walked
/// without loading what they point at. The name of an instance is the name of
/// its resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInstance {
	pub id: Uuid,
	pub workspace_id: Uuid,
	/// `None` only for workspace roots
	pub parent_id: Option<Uuid>,
	/// The actor who placed this node, not necessarily the resource creator
	pub creator_id: Uuid,
	pub resource_type: String,
	pub resource_id: Uuid,
	pub created_at: DateTime<Utc>,
}

impl ResourceInstance {
	/// A detached node pointing at `resource`; the caller attaches it
	pub(crate) fn detached(resource: &AbstractResource, creator: &Actor) -> Self {
		Self {
			id: Uuid::new_v4(),
			workspace_id: Uuid::nil(),
			parent_id: None,
			creator_id: creator.id,
			resource_type: resource.resource_type.clone(),
			resource_id: resource.id,
			created_at: Utc::now(),
		}
	}

	/// Places the node under `parent`, inheriting the parent's workspace
	pub(crate) fn attach_to(&mut self, parent: &ResourceInstance) {
		self.parent_id = Some(parent.id);
		self.workspace_id = parent.workspace_id;
	}

	pub fn is_root(&self) -> bool {
		self.parent_id.is_none()
	}

	pub fn is_directory(&self) -> bool {
		self.resource_type == DIRECTORY_TYPE
	}
}
