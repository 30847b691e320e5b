//! Ownership and access rights
//!
//! The tree manager only asks one question of this layer: is the acting user
//! the owner of a resource. Underneath sits a small ACL keyed by securable
//! target and subject, decorated so that owner grade can never be held by more
//! than one user at a time.

mod mask;
mod ownership;
mod rights;

pub use mask::PermissionMask;
pub use ownership::{AclOwnership, CreatorOwnership, OwnershipPolicy};
pub use rights::{
	MemoryRightManager, RestrictedOwnerRightManager, RightManager, SecurityTarget, Subject,
};
