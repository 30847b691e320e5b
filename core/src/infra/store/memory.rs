//! In-process tree store

use super::{Change, ChangeSet, InstanceTreeStore};
use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, ResourceInstance},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredInstance {
	/// Insertion order, used for deterministic child ordering
	seq: u64,
	instance: ResourceInstance,
}

/// Prior value of one entry touched by a flush
enum Undo {
	Resource(Uuid, Option<AbstractResource>),
	Instance(Uuid, Option<StoredInstance>),
}

#[derive(Debug, Default)]
struct MemoryState {
	resources: HashMap<Uuid, AbstractResource>,
	instances: HashMap<Uuid, StoredInstance>,
	next_seq: u64,
}

impl MemoryState {
	fn apply(&mut self, change: Change) -> Result<()> {
		match change {
			Change::InsertResource(resource) => {
				if self.resources.contains_key(&resource.id) {
					return Err(CoreError::Other(anyhow::anyhow!(
						"resource {} is already persisted",
						resource.id
					)));
				}
				self.resources.insert(resource.id, resource);
			}

			Change::UpdateResource(update) => {
				let resource = self
					.resources
					.get_mut(&update.id)
					.ok_or(CoreError::ResourceNotFound(update.id))?;
				resource.name = update.name;
				resource.share_type = update.share_type;
				resource.content = update.content;
			}

			Change::AdjustInstanceCount { resource_id, delta } => {
				let resource = self
					.resources
					.get_mut(&resource_id)
					.ok_or(CoreError::ResourceNotFound(resource_id))?;
				let count = i64::from(resource.instance_count()) + i64::from(delta);
				let count =
					u32::try_from(count).map_err(|_| CoreError::InstanceCountUnderflow(resource_id))?;
				resource.instance_count = count;
			}

			Change::RemoveResource(resource_id) => {
				if self
					.resources
					.get(&resource_id)
					.is_some_and(|resource| resource.instance_count == 0)
				{
					self.resources.remove(&resource_id);
				}
			}

			Change::InsertInstance(instance) => {
				if self.instances.contains_key(&instance.id) {
					return Err(CoreError::Other(anyhow::anyhow!(
						"instance {} is already persisted",
						instance.id
					)));
				}
				let seq = self.next_seq;
				self.next_seq += 1;
				self.instances
					.insert(instance.id, StoredInstance { seq, instance });
			}

			Change::PlaceInstance {
				instance_id,
				parent_id,
				workspace_id,
			} => {
				let stored = self
					.instances
					.get_mut(&instance_id)
					.ok_or(CoreError::InstanceNotFound(instance_id))?;
				stored.instance.parent_id = parent_id;
				stored.instance.workspace_id = workspace_id;
			}

			Change::RemoveInstance(instance_id) => {
				if self.instances.remove(&instance_id).is_none() {
					return Err(CoreError::InstanceNotFound(instance_id));
				}
			}
		}

		Ok(())
	}

	/// Captures the entry `change` is about to touch
	fn snapshot(&self, change: &Change) -> Undo {
		match change {
			Change::InsertResource(resource) | Change::UpdateResource(resource) => {
				Undo::Resource(resource.id, self.resources.get(&resource.id).cloned())
			}
			Change::AdjustInstanceCount { resource_id, .. } | Change::RemoveResource(resource_id) => {
				Undo::Resource(*resource_id, self.resources.get(resource_id).cloned())
			}
			Change::InsertInstance(instance) => {
				Undo::Instance(instance.id, self.instances.get(&instance.id).cloned())
			}
			Change::PlaceInstance { instance_id, .. } | Change::RemoveInstance(instance_id) => {
				Undo::Instance(*instance_id, self.instances.get(instance_id).cloned())
			}
		}
	}

	fn rollback(&mut self, undo: Vec<Undo>, next_seq: u64) {
		for entry in undo.into_iter().rev() {
			match entry {
				Undo::Resource(id, Some(resource)) => {
					self.resources.insert(id, resource);
				}
				Undo::Resource(id, None) => {
					self.resources.remove(&id);
				}
				Undo::Instance(id, Some(stored)) => {
					self.instances.insert(id, stored);
				}
				Undo::Instance(id, None) => {
					self.instances.remove(&id);
				}
			}
		}
		self.next_seq = next_seq;
	}

	fn ordered(&self, predicate: impl Fn(&ResourceInstance) -> bool) -> Vec<ResourceInstance> {
		let mut matching = self
			.instances
			.values()
			.filter(|stored| predicate(&stored.instance))
			.collect::<Vec<_>>();
		matching.sort_by_key(|stored| stored.seq);

		matching
			.into_iter()
			.map(|stored| stored.instance.clone())
			.collect()
	}
}

/// Tree store kept entirely in memory
///
/// Changes are applied in place under the write lock. Each one records the
/// entry it touches first, and a failing change restores those entries in
/// reverse so the live state is left as it was.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: RwLock<MemoryState>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn resource_total(&self) -> usize {
		self.state.read().await.resources.len()
	}

	pub async fn instance_total(&self) -> usize {
		self.state.read().await.instances.len()
	}
}

#[async_trait]
impl InstanceTreeStore for MemoryStore {
	async fn find_resource(&self, id: Uuid) -> Result<Option<AbstractResource>> {
		Ok(self.state.read().await.resources.get(&id).cloned())
	}

	async fn find_instance(&self, id: Uuid) -> Result<Option<ResourceInstance>> {
		Ok(self
			.state
			.read()
			.await
			.instances
			.get(&id)
			.map(|stored| stored.instance.clone()))
	}

	async fn instances_of(&self, resource_id: Uuid) -> Result<Vec<ResourceInstance>> {
		Ok(self
			.state
			.read()
			.await
			.ordered(|instance| instance.resource_id == resource_id))
	}

	async fn children(&self, parent_id: Uuid) -> Result<Vec<ResourceInstance>> {
		Ok(self
			.state
			.read()
			.await
			.ordered(|instance| instance.parent_id == Some(parent_id)))
	}

	async fn flush(&self, changes: ChangeSet) -> Result<()> {
		if changes.is_empty() {
			return Ok(());
		}

		let mut state = self.state.write().await;
		let next_seq = state.next_seq;
		let total = changes.len();
		let mut undo = Vec::with_capacity(total);

		for change in changes.into_changes() {
			undo.push(state.snapshot(&change));
			if let Err(e) = state.apply(change) {
				state.rollback(undo, next_seq);
				return Err(e);
			}
		}

		trace!(changes = total, "Flushed change set");

		Ok(())
	}
}
