use super::ResourceManager;
use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, Actor, NewResource, ResourceInstance},
	infra::{
		dispatch::{event_name, ResourceAction},
		store::ChangeSet,
	},
};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};
use uuid::Uuid;

/// How non-directory resources land in the placed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafPlacement {
	/// New instance of the same resource
	Reference,
	/// New resource produced by the type handler
	Copy,
}

impl ResourceManager {
	/// Links `resource_id` under `parent_id`
	///
	/// Leaves are shared by reference. A directory is never shared: its node is
	/// recreated for the actor and its children are linked into the new node,
	/// level by level. Resources the actor neither owns nor sees as public are
	/// skipped without an error, and `None` is returned when nothing was placed.
	pub async fn add_to_directory_by_reference(
		&self,
		actor: &Actor,
		resource_id: Uuid,
		parent_id: Uuid,
	) -> Result<Option<ResourceInstance>> {
		self.place_tree(actor, resource_id, parent_id, LeafPlacement::Reference)
			.await
	}

	/// Like [`Self::add_to_directory_by_reference`] but every leaf is cloned by its
	/// type handler, so the placed tree shares nothing with the source
	pub async fn copy(
		&self,
		actor: &Actor,
		resource_id: Uuid,
		parent_id: Uuid,
	) -> Result<Option<ResourceInstance>> {
		self.place_tree(actor, resource_id, parent_id, LeafPlacement::Copy)
			.await
	}

	/// A detached node on a brand new resource created by `actor`
	///
	/// Directories get an empty directory of the same name, every other type
	/// is cloned through its `copy_<type>` handler.
	pub async fn create_copy(
		&self,
		actor: &Actor,
		source: &AbstractResource,
	) -> Result<(AbstractResource, ResourceInstance)> {
		let new = if source.is_directory() {
			NewResource::new(source.name.clone()).with_share_type(source.share_type)
		} else {
			self.bus.publish_copy(source).await?.ok_or_else(|| {
				CoreError::MissingHandler(event_name(ResourceAction::Copy, &source.resource_type))
			})?
		};
		new.validate()?;

		let resource = AbstractResource::from_new(new, &source.resource_type, actor);
		let instance = ResourceInstance::detached(&resource, actor);

		Ok((resource, instance))
	}

	async fn place_tree(
		&self,
		actor: &Actor,
		resource_id: Uuid,
		parent_id: Uuid,
		leaves: LeafPlacement,
	) -> Result<Option<ResourceInstance>> {
		let source = self.store.get_resource(resource_id).await?;
		let parent = self.resolve_parent(parent_id).await?;

		let mut pending = VecDeque::from([(source, parent)]);
		let mut visited = HashSet::new();
		// Directories created here, never walked as sources
		let mut created = HashSet::new();
		let mut top = None;
		let mut placed_total = 0usize;

		while let Some((source, target)) = pending.pop_front() {
			if !(source.is_public() || self.ownership.is_owner(&source, actor).await?) {
				debug!(
					resource_id = %source.id,
					actor = %actor.username,
					"Skipping resource the actor may not link"
				);
				continue;
			}

			let placed = if source.is_directory() {
				if !visited.insert(source.id) {
					continue;
				}

				let placed = self.place_copy(actor, &source, &target).await?;
				created.insert(placed.resource_id);

				if let Some(first) = self.store.instances_of(source.id).await?.first() {
					for child in self.store.children(first.id).await? {
						if created.contains(&child.resource_id) {
							continue;
						}
						let child_resource = self.store.get_resource(child.resource_id).await?;
						pending.push_back((child_resource, placed.clone()));
					}
				}

				placed
			} else if leaves == LeafPlacement::Copy {
				self.place_copy(actor, &source, &target).await?
			} else {
				self.place_reference(actor, &source, &target).await?
			};

			placed_total += 1;
			top.get_or_insert(placed);
		}

		if let Some(top) = &top {
			info!(
				%resource_id,
				instance_id = %top.id,
				placed = placed_total,
				mode = ?leaves,
				"Placed resource tree"
			);
		}

		Ok(top)
	}

	async fn place_copy(
		&self,
		actor: &Actor,
		source: &AbstractResource,
		target: &ResourceInstance,
	) -> Result<ResourceInstance> {
		let (resource, mut instance) = self.create_copy(actor, source).await?;
		instance.attach_to(target);
		self.persist_new(actor, &resource, &instance).await?;

		Ok(instance)
	}

	async fn place_reference(
		&self,
		actor: &Actor,
		source: &AbstractResource,
		target: &ResourceInstance,
	) -> Result<ResourceInstance> {
		let mut instance = ResourceInstance::detached(source, actor);
		instance.attach_to(target);

		let mut changes = ChangeSet::new();
		changes.persist_instance(instance.clone());
		self.store.flush(changes).await?;

		Ok(instance)
	}
}
