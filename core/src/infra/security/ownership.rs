use super::{
	MemoryRightManager, PermissionMask, RestrictedOwnerRightManager, RightManager,
	SecurityTarget, Subject,
};
use crate::{
	common::errors::Result,
	domain::{AbstractResource, Actor},
};
use async_trait::async_trait;

/// The ownership questions the tree manager asks
#[async_trait]
pub trait OwnershipPolicy: Send + Sync {
	async fn is_owner(&self, resource: &AbstractResource, actor: &Actor) -> Result<bool>;

	/// Called once for every resource the tree manager creates
	async fn register_owner(&self, resource: &AbstractResource, actor: &Actor) -> Result<()>;

	/// Called when a resource record is destroyed
	async fn release(&self, resource: &AbstractResource) -> Result<()>;
}

/// The creator of a resource is its owner
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatorOwnership;

#[async_trait]
impl OwnershipPolicy for CreatorOwnership {
	async fn is_owner(&self, resource: &AbstractResource, actor: &Actor) -> Result<bool> {
		Ok(resource.is_created_by(actor))
	}

	async fn register_owner(&self, _resource: &AbstractResource, _actor: &Actor) -> Result<()> {
		Ok(())
	}

	async fn release(&self, _resource: &AbstractResource) -> Result<()> {
		Ok(())
	}
}

/// Ownership recorded as owner grade in an access control list
pub struct AclOwnership<M = MemoryRightManager> {
	rights: RestrictedOwnerRightManager<M>,
}

impl<M: RightManager> AclOwnership<M> {
	pub fn new(rights: RestrictedOwnerRightManager<M>) -> Self {
		Self { rights }
	}

	pub fn rights(&self) -> &RestrictedOwnerRightManager<M> {
		&self.rights
	}
}

impl AclOwnership<MemoryRightManager> {
	pub fn in_memory() -> Self {
		Self::new(RestrictedOwnerRightManager::new(MemoryRightManager::new()))
	}
}

#[async_trait]
impl<M: RightManager> OwnershipPolicy for AclOwnership<M> {
	async fn is_owner(&self, resource: &AbstractResource, actor: &Actor) -> Result<bool> {
		self.rights
			.has_right(
				&SecurityTarget::resource(resource.id),
				&Subject::User(actor.id),
				PermissionMask::OWNER,
			)
			.await
	}

	async fn register_owner(&self, resource: &AbstractResource, actor: &Actor) -> Result<()> {
		self.rights
			.add_right(
				&SecurityTarget::resource(resource.id),
				&Subject::User(actor.id),
				PermissionMask::all(),
			)
			.await
	}

	async fn release(&self, resource: &AbstractResource) -> Result<()> {
		self.rights
			.delete_rights(&SecurityTarget::resource(resource.id))
			.await
	}
}
