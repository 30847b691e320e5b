use super::ResourceManager;
use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, Actor, NewResource, ResourceInstance, DIRECTORY_TYPE},
	infra::store::ChangeSet,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Which handle `create` hands back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnHandle {
	#[default]
	Instance,
	Resource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Created {
	Instance(ResourceInstance),
	Resource(AbstractResource),
}

impl Created {
	pub fn into_instance(self) -> Option<ResourceInstance> {
		match self {
			Self::Instance(instance) => Some(instance),
			Self::Resource(_) => None,
		}
	}

	pub fn into_resource(self) -> Option<AbstractResource> {
		match self {
			Self::Resource(resource) => Some(resource),
			Self::Instance(_) => None,
		}
	}
}

impl ResourceManager {
	/// Creates a resource together with its first instance under `parent_id`
	///
	/// The actor becomes creator of both, and the instance joins the parent's
	/// workspace. Resource and instance are committed in one change set.
	pub async fn create(
		&self,
		actor: &Actor,
		resource: NewResource,
		parent_id: Uuid,
		resource_type: &str,
		handle: ReturnHandle,
	) -> Result<Created> {
		resource.validate()?;

		let resource_type = self
			.types
			.get(resource_type)
			.ok_or_else(|| CoreError::UnknownResourceType(resource_type.to_string()))?;
		let parent = self.resolve_parent(parent_id).await?;

		let resource = AbstractResource::from_new(resource, &resource_type.name, actor);
		let mut instance = ResourceInstance::detached(&resource, actor);
		instance.attach_to(&parent);

		self.persist_new(actor, &resource, &instance).await?;

		info!(
			resource_id = %resource.id,
			instance_id = %instance.id,
			resource_type = %resource.resource_type,
			%parent_id,
			"Created resource"
		);

		Ok(match handle {
			ReturnHandle::Instance => Created::Instance(instance),
			ReturnHandle::Resource => {
				Created::Resource(self.store.get_resource(resource.id).await?)
			}
		})
	}

	/// Places the root directory of a workspace
	pub async fn create_workspace_root(
		&self,
		actor: &Actor,
		workspace_id: Uuid,
		name: &str,
	) -> Result<ResourceInstance> {
		let new = NewResource::new(name);
		new.validate()?;

		let resource = AbstractResource::from_new(new, DIRECTORY_TYPE, actor);
		let mut instance = ResourceInstance::detached(&resource, actor);
		instance.workspace_id = workspace_id;

		self.persist_new(actor, &resource, &instance).await?;

		info!(
			%workspace_id,
			instance_id = %instance.id,
			"Created workspace root"
		);

		Ok(instance)
	}

	/// Commits a fresh resource with its first instance and records its owner
	pub(super) async fn persist_new(
		&self,
		actor: &Actor,
		resource: &AbstractResource,
		instance: &ResourceInstance,
	) -> Result<()> {
		let mut changes = ChangeSet::new();
		changes
			.persist_resource(resource.clone())
			.persist_instance(instance.clone());
		self.store.flush(changes).await?;

		// A resource nobody owns must not outlive a failed create
		if let Err(e) = self.ownership.register_owner(resource, actor).await {
			let mut undo = ChangeSet::new();
			undo.remove_instance(instance).remove_resource(resource.id);
			if let Err(rollback) = self.store.flush(undo).await {
				warn!(
					resource_id = %resource.id,
					error = %rollback,
					"Failed to discard unowned resource"
				);
			}
			return Err(e);
		}

		Ok(())
	}
}
