//! Access control lists

use super::PermissionMask;
use crate::common::errors::{CoreError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Something rights can be granted on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityTarget {
	/// A single persisted entity
	Object { kind: String, id: Uuid },
	/// Every entity of a kind
	Class(String),
}

impl SecurityTarget {
	pub fn resource(id: Uuid) -> Self {
		Self::Object {
			kind: "resource".to_string(),
			id,
		}
	}
}

/// Something rights can be granted to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
	User(Uuid),
	Role(String),
}

#[async_trait]
pub trait RightManager: Send + Sync {
	/// Adds `mask` to whatever the subject already holds
	async fn add_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()>;

	/// Replaces the subject's rights with `mask`, an empty mask revokes everything
	async fn set_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()>;

	async fn remove_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()>;

	async fn remove_all_rights(&self, target: &SecurityTarget, subject: &Subject) -> Result<()>;

	/// Forgets every grant on `target`
	async fn delete_rights(&self, target: &SecurityTarget) -> Result<()>;

	async fn rights(&self, target: &SecurityTarget, subject: &Subject) -> Result<PermissionMask>;

	async fn has_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<bool> {
		Ok(self.rights(target, subject).await?.contains(mask))
	}

	/// Users holding at least `mask` on `target`
	async fn users_with_right(
		&self,
		target: &SecurityTarget,
		mask: PermissionMask,
	) -> Result<Vec<Uuid>>;
}

#[derive(Debug, Default)]
pub struct MemoryRightManager {
	entries: RwLock<HashMap<SecurityTarget, HashMap<Subject, PermissionMask>>>,
}

impl MemoryRightManager {
	pub fn new() -> Self {
		Self::default()
	}

	async fn update(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		f: impl FnOnce(PermissionMask) -> PermissionMask + Send,
	) {
		let mut entries = self.entries.write().await;
		let grants = entries.entry(target.clone()).or_default();

		let mask = f(grants.get(subject).copied().unwrap_or_default());
		if mask.is_empty() {
			grants.remove(subject);
		} else {
			grants.insert(subject.clone(), mask);
		}

		if grants.is_empty() {
			entries.remove(target);
		}
	}
}

#[async_trait]
impl RightManager for MemoryRightManager {
	async fn add_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()> {
		self.update(target, subject, |current| current | mask).await;
		Ok(())
	}

	async fn set_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()> {
		self.update(target, subject, |_| mask).await;
		Ok(())
	}

	async fn remove_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()> {
		self.update(target, subject, |current| current.difference(mask))
			.await;
		Ok(())
	}

	async fn remove_all_rights(&self, target: &SecurityTarget, subject: &Subject) -> Result<()> {
		self.update(target, subject, |_| PermissionMask::empty())
			.await;
		Ok(())
	}

	async fn delete_rights(&self, target: &SecurityTarget) -> Result<()> {
		self.entries.write().await.remove(target);
		Ok(())
	}

	async fn rights(&self, target: &SecurityTarget, subject: &Subject) -> Result<PermissionMask> {
		Ok(self
			.entries
			.read()
			.await
			.get(target)
			.and_then(|grants| grants.get(subject))
			.copied()
			.unwrap_or_default())
	}

	async fn users_with_right(
		&self,
		target: &SecurityTarget,
		mask: PermissionMask,
	) -> Result<Vec<Uuid>> {
		let entries = self.entries.read().await;
		let mut users = entries
			.get(target)
			.into_iter()
			.flatten()
			.filter_map(|(subject, granted)| match subject {
				Subject::User(id) if granted.contains(mask) => Some(*id),
				_ => None,
			})
			.collect::<Vec<_>>();
		users.sort_unstable();

		Ok(users)
	}
}

/// Keeps owner grade exclusive to a single user per object
///
/// Grants without the owner bit pass straight through. Owner grants are
/// serialized so two concurrent grants cannot both observe "no owner yet".
#[derive(Debug, Default)]
pub struct RestrictedOwnerRightManager<M> {
	inner: M,
	owner_grants: Mutex<()>,
}

impl<M: RightManager> RestrictedOwnerRightManager<M> {
	pub fn new(inner: M) -> Self {
		Self {
			inner,
			owner_grants: Mutex::new(()),
		}
	}

	pub fn inner(&self) -> &M {
		&self.inner
	}

	pub async fn owner(&self, target: &SecurityTarget) -> Result<Option<Uuid>> {
		Ok(self
			.inner
			.users_with_right(target, PermissionMask::OWNER)
			.await?
			.into_iter()
			.next())
	}

	/// Moves owner grade to `user`, revoking it from whoever held it
	pub async fn set_owner(&self, target: &SecurityTarget, user: Uuid) -> Result<()> {
		let subject = Subject::User(user);
		Self::check_owner_subject(target, &subject)?;

		let _guard = self.owner_grants.lock().await;
		for previous in self
			.inner
			.users_with_right(target, PermissionMask::OWNER)
			.await?
		{
			if previous != user {
				self.inner
					.remove_right(target, &Subject::User(previous), PermissionMask::OWNER)
					.await?;
			}
		}

		self.inner
			.add_right(target, &subject, PermissionMask::OWNER)
			.await?;
		info!(?target, %user, "Transferred ownership");

		Ok(())
	}

	fn check_owner_subject(target: &SecurityTarget, subject: &Subject) -> Result<()> {
		if let SecurityTarget::Class(class) = target {
			return Err(CoreError::NotAllowedOwner(format!(
				"class <{class}> cannot be owned"
			)));
		}

		if let Subject::Role(role) = subject {
			return Err(CoreError::NotAllowedOwner(format!(
				"role <{role}> cannot hold owner grade"
			)));
		}

		Ok(())
	}

	async fn check_no_other_owner(&self, target: &SecurityTarget, subject: &Subject) -> Result<()> {
		let owners = self
			.inner
			.users_with_right(target, PermissionMask::OWNER)
			.await?;

		if owners
			.iter()
			.any(|owner| Subject::User(*owner) != *subject)
		{
			debug!(?target, ?subject, "Rejected second owner");
			return Err(CoreError::MultipleOwnersAttempt);
		}

		Ok(())
	}
}

#[async_trait]
impl<M: RightManager> RightManager for RestrictedOwnerRightManager<M> {
	async fn add_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()> {
		if !mask.is_owner_grade() {
			return self.inner.add_right(target, subject, mask).await;
		}

		Self::check_owner_subject(target, subject)?;
		let _guard = self.owner_grants.lock().await;
		self.check_no_other_owner(target, subject).await?;

		self.inner.add_right(target, subject, mask).await
	}

	async fn set_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()> {
		if !mask.is_owner_grade() {
			return self.inner.set_right(target, subject, mask).await;
		}

		Self::check_owner_subject(target, subject)?;
		let _guard = self.owner_grants.lock().await;
		self.check_no_other_owner(target, subject).await?;

		self.inner.set_right(target, subject, mask).await
	}

	async fn remove_right(
		&self,
		target: &SecurityTarget,
		subject: &Subject,
		mask: PermissionMask,
	) -> Result<()> {
		self.inner.remove_right(target, subject, mask).await
	}

	async fn remove_all_rights(&self, target: &SecurityTarget, subject: &Subject) -> Result<()> {
		self.inner.remove_all_rights(target, subject).await
	}

	async fn delete_rights(&self, target: &SecurityTarget) -> Result<()> {
		self.inner.delete_rights(target).await
	}

	async fn rights(&self, target: &SecurityTarget, subject: &Subject) -> Result<PermissionMask> {
		self.inner.rights(target, subject).await
	}

	async fn users_with_right(
		&self,
		target: &SecurityTarget,
		mask: PermissionMask,
	) -> Result<Vec<Uuid>> {
		self.inner.users_with_right(target, mask).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn restricted() -> RestrictedOwnerRightManager<MemoryRightManager> {
		RestrictedOwnerRightManager::new(MemoryRightManager::new())
	}

	#[tokio::test]
	async fn masks_accumulate_and_shrink() {
		let rights = MemoryRightManager::new();
		let target = SecurityTarget::resource(Uuid::new_v4());
		let user = Subject::User(Uuid::new_v4());

		rights
			.add_right(&target, &user, PermissionMask::VIEW)
			.await
			.unwrap();
		rights
			.add_right(&target, &user, PermissionMask::EDIT)
			.await
			.unwrap();
		assert!(rights
			.has_right(&target, &user, PermissionMask::VIEW | PermissionMask::EDIT)
			.await
			.unwrap());

		rights
			.remove_right(&target, &user, PermissionMask::VIEW)
			.await
			.unwrap();
		assert_eq!(
			rights.rights(&target, &user).await.unwrap(),
			PermissionMask::EDIT
		);

		rights.delete_rights(&target).await.unwrap();
		assert!(rights.rights(&target, &user).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn second_owner_is_rejected_and_first_is_kept() {
		let rights = restricted();
		let target = SecurityTarget::resource(Uuid::new_v4());
		let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

		rights
			.add_right(&target, &Subject::User(alice), PermissionMask::OWNER)
			.await
			.unwrap();

		let err = rights
			.set_right(
				&target,
				&Subject::User(bob),
				PermissionMask::OWNER | PermissionMask::VIEW,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::MultipleOwnersAttempt));
		assert_eq!(rights.owner(&target).await.unwrap(), Some(alice));
		assert!(rights
			.rights(&target, &Subject::User(bob))
			.await
			.unwrap()
			.is_empty());

		// Regranting to the current owner is fine
		rights
			.add_right(&target, &Subject::User(alice), PermissionMask::OWNER)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn only_users_may_own_objects() {
		let rights = restricted();
		let target = SecurityTarget::resource(Uuid::new_v4());

		let err = rights
			.add_right(
				&target,
				&Subject::Role("ROLE_ADMIN".to_string()),
				PermissionMask::OWNER,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::NotAllowedOwner(_)));

		let err = rights
			.add_right(
				&SecurityTarget::Class("resource".to_string()),
				&Subject::User(Uuid::new_v4()),
				PermissionMask::OWNER,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::NotAllowedOwner(_)));

		// Roles still get ordinary grades
		rights
			.add_right(
				&target,
				&Subject::Role("ROLE_ADMIN".to_string()),
				PermissionMask::VIEW,
			)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn set_owner_transfers_exclusively() {
		let rights = restricted();
		let target = SecurityTarget::resource(Uuid::new_v4());
		let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

		rights
			.add_right(
				&target,
				&Subject::User(alice),
				PermissionMask::OWNER | PermissionMask::EDIT,
			)
			.await
			.unwrap();
		rights.set_owner(&target, bob).await.unwrap();

		assert_eq!(
			rights
				.users_with_right(&target, PermissionMask::OWNER)
				.await
				.unwrap(),
			vec![bob]
		);
		assert_eq!(
			rights.rights(&target, &Subject::User(alice)).await.unwrap(),
			PermissionMask::EDIT
		);
	}
}
