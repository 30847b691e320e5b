//! Instance Tree Store
//!
//! The persistence boundary of the tree manager. Stores answer point lookups
//! and child enumeration, and apply a [`ChangeSet`] as one unit: either every
//! change lands or none does.
//!
//! Instance counts are never written as absolute values. A change carries a
//! delta and the store applies it as a single read-modify-write, so two
//! concurrent operations touching the same resource cannot lose an update.

mod memory;

pub use memory::MemoryStore;

use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, ResourceInstance},
};
use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

/// A single pending persist/remove operation
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
	InsertResource(AbstractResource),
	/// Rewrites name, share type and content; never the instance count
	UpdateResource(AbstractResource),
	AdjustInstanceCount {
		resource_id: Uuid,
		delta: i32,
	},
	/// Drops the record once no instance references it; a no-op otherwise
	RemoveResource(Uuid),
	InsertInstance(ResourceInstance),
	PlaceInstance {
		instance_id: Uuid,
		parent_id: Option<Uuid>,
		workspace_id: Uuid,
	},
	RemoveInstance(Uuid),
}

/// Pending changes of one logical operation, committed by [`InstanceTreeStore::flush`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
	changes: Vec<Change>,
}

impl ChangeSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn persist_resource(&mut self, resource: AbstractResource) -> &mut Self {
		self.changes.push(Change::InsertResource(resource));
		self
	}

	pub fn update_resource(&mut self, resource: AbstractResource) -> &mut Self {
		self.changes.push(Change::UpdateResource(resource));
		self
	}

	/// Inserts the instance and counts it against its resource
	pub fn persist_instance(&mut self, instance: ResourceInstance) -> &mut Self {
		let resource_id = instance.resource_id;
		self.changes.push(Change::InsertInstance(instance));
		self.adjust_instance_count(resource_id, 1)
	}

	/// Removes the instance and uncounts it from its resource
	pub fn remove_instance(&mut self, instance: &ResourceInstance) -> &mut Self {
		self.changes.push(Change::RemoveInstance(instance.id));
		self.adjust_instance_count(instance.resource_id, -1)
	}

	pub fn place_instance(&mut self, instance: &ResourceInstance) -> &mut Self {
		self.changes.push(Change::PlaceInstance {
			instance_id: instance.id,
			parent_id: instance.parent_id,
			workspace_id: instance.workspace_id,
		});
		self
	}

	pub fn adjust_instance_count(&mut self, resource_id: Uuid, delta: i32) -> &mut Self {
		self.changes.push(Change::AdjustInstanceCount { resource_id, delta });
		self
	}

	pub fn remove_resource(&mut self, resource_id: Uuid) -> &mut Self {
		self.changes.push(Change::RemoveResource(resource_id));
		self
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	pub fn len(&self) -> usize {
		self.changes.len()
	}

	pub fn changes(&self) -> &[Change] {
		&self.changes
	}

	pub fn into_changes(self) -> Vec<Change> {
		self.changes
	}
}

#[async_trait]
pub trait InstanceTreeStore: Send + Sync {
	async fn find_resource(&self, id: Uuid) -> Result<Option<AbstractResource>>;

	async fn find_instance(&self, id: Uuid) -> Result<Option<ResourceInstance>>;

	/// Every live instance referencing `resource_id`, oldest first
	async fn instances_of(&self, resource_id: Uuid) -> Result<Vec<ResourceInstance>>;

	/// Immediate children of `parent_id`, oldest first
	async fn children(&self, parent_id: Uuid) -> Result<Vec<ResourceInstance>>;

	/// Applies all changes atomically
	async fn flush(&self, changes: ChangeSet) -> Result<()>;

	/// Every instance below `root_id` in depth-first pre-order
	///
	/// Walks an explicit worklist of ids rather than recursing, and never visits
	/// a node twice even if the stored tree is corrupted into a cycle.
	async fn descendants(&self, root_id: Uuid) -> Result<Vec<ResourceInstance>> {
		let mut visited = HashSet::from([root_id]);
		let mut descendants = Vec::new();

		let mut stack = self.children(root_id).await?;
		stack.reverse();

		while let Some(node) = stack.pop() {
			if !visited.insert(node.id) {
				continue;
			}

			if node.is_directory() {
				let mut children = self.children(node.id).await?;
				children.reverse();
				stack.extend(children);
			}

			descendants.push(node);
		}

		Ok(descendants)
	}

	async fn children_of(
		&self,
		instance: &ResourceInstance,
		recursive: bool,
	) -> Result<Vec<ResourceInstance>> {
		if recursive {
			self.descendants(instance.id).await
		} else {
			self.children(instance.id).await
		}
	}

	async fn get_resource(&self, id: Uuid) -> Result<AbstractResource> {
		self.find_resource(id)
			.await?
			.ok_or(CoreError::ResourceNotFound(id))
	}

	async fn get_instance(&self, id: Uuid) -> Result<ResourceInstance> {
		self.find_instance(id)
			.await?
			.ok_or(CoreError::InstanceNotFound(id))
	}
}
