//! Resource Instance Tree Manager
//!
//! Creates, moves, links, copies, deletes and exports subtrees of resource
//! instances. The manager holds no state of its own: every lookup goes to the
//! tree store and every mutation is committed through a [`ChangeSet`]. Type
//! specific work is published on the dispatch bus.
//!
//! Reference counts are only ever moved by the change sets built here.

mod copy;
mod create;
mod delete;
mod export;

pub use create::{Created, ReturnHandle};

use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, Actor, ResourceInstance, ResourceTypeRegistry, ShareType},
	infra::{
		dispatch::DispatchBus,
		security::{CreatorOwnership, OwnershipPolicy},
		store::{ChangeSet, InstanceTreeStore},
	},
};
use arbor_archive::{ArchiveFormat, TarFormat};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use uuid::Uuid;

pub struct ResourceManager {
	store: Arc<dyn InstanceTreeStore>,
	types: Arc<ResourceTypeRegistry>,
	bus: Arc<DispatchBus>,
	ownership: Arc<dyn OwnershipPolicy>,
	archive: Arc<dyn ArchiveFormat>,
	export_dir: PathBuf,
}

impl ResourceManager {
	/// Creator-based ownership, tar archives exported to the system temp dir
	pub fn new(
		store: Arc<dyn InstanceTreeStore>,
		types: Arc<ResourceTypeRegistry>,
		bus: Arc<DispatchBus>,
	) -> Self {
		Self {
			store,
			types,
			bus,
			ownership: Arc::new(CreatorOwnership),
			archive: Arc::new(TarFormat),
			export_dir: std::env::temp_dir(),
		}
	}

	pub fn with_ownership(mut self, ownership: Arc<dyn OwnershipPolicy>) -> Self {
		self.ownership = ownership;
		self
	}

	pub fn with_archive_format(mut self, archive: Arc<dyn ArchiveFormat>) -> Self {
		self.archive = archive;
		self
	}

	pub fn with_export_dir(mut self, export_dir: impl Into<PathBuf>) -> Self {
		self.export_dir = export_dir.into();
		self
	}

	pub fn store(&self) -> &Arc<dyn InstanceTreeStore> {
		&self.store
	}

	pub fn types(&self) -> &ResourceTypeRegistry {
		&self.types
	}

	pub fn bus(&self) -> &Arc<DispatchBus> {
		&self.bus
	}

	pub fn export_dir(&self) -> &PathBuf {
		&self.export_dir
	}

	/// Re-parents `instance_id` under `parent_id`
	///
	/// Callers are expected to have authorized the move. Reference counts are
	/// untouched; the moved subtree is re-stamped with the new parent's
	/// workspace.
	pub async fn move_to(&self, instance_id: Uuid, parent_id: Uuid) -> Result<ResourceInstance> {
		let mut child = self.store.get_instance(instance_id).await?;
		let parent = self.resolve_parent(parent_id).await?;

		if parent.id == child.id {
			return Err(CoreError::InvalidMove(format!(
				"instance {instance_id} cannot become its own parent"
			)));
		}

		let descendants = if child.is_directory() {
			self.store.descendants(child.id).await?
		} else {
			Vec::new()
		};

		if descendants.iter().any(|node| node.id == parent.id) {
			return Err(CoreError::InvalidMove(format!(
				"instance {parent_id} is below {instance_id}"
			)));
		}

		let workspace_changed = child.workspace_id != parent.workspace_id;
		child.attach_to(&parent);

		let mut changes = ChangeSet::new();
		changes.place_instance(&child);
		if workspace_changed {
			for mut node in descendants {
				node.workspace_id = parent.workspace_id;
				changes.place_instance(&node);
			}
		}
		self.store.flush(changes).await?;

		info!(
			instance_id = %child.id,
			parent_id = %parent.id,
			workspace_id = %child.workspace_id,
			"Moved resource instance"
		);

		Ok(child)
	}

	/// Changes who may link the resource; owners only
	pub async fn set_share_type(
		&self,
		actor: &Actor,
		resource_id: Uuid,
		share_type: ShareType,
	) -> Result<AbstractResource> {
		let mut resource = self.store.get_resource(resource_id).await?;

		if !self.ownership.is_owner(&resource, actor).await? {
			return Err(CoreError::NotAuthorized(format!(
				"{} does not own resource {resource_id}",
				actor.username
			)));
		}

		resource.share_type = share_type;
		let mut changes = ChangeSet::new();
		changes.update_resource(resource.clone());
		self.store.flush(changes).await?;

		info!(%resource_id, %share_type, "Updated share type");

		Ok(resource)
	}

	/// Resolves a target parent, which must be a directory
	async fn resolve_parent(&self, parent_id: Uuid) -> Result<ResourceInstance> {
		let parent = self
			.store
			.find_instance(parent_id)
			.await?
			.ok_or(CoreError::ParentNotFound(parent_id))?;

		if !parent.is_directory() {
			return Err(CoreError::NotADirectory(parent_id));
		}

		Ok(parent)
	}

	/// Hands ownership bookkeeping back once the record is gone from the store
	async fn release_if_destroyed(&self, resource: &AbstractResource) -> Result<bool> {
		if self.store.find_resource(resource.id).await?.is_some() {
			return Ok(false);
		}

		self.ownership.release(resource).await?;
		Ok(true)
	}
}
