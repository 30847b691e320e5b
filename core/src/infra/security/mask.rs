use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
	/// Grades of access a subject may hold on a target
	#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
	pub struct PermissionMask: u32 {
		const VIEW     = 1 << 0;
		const CREATE   = 1 << 1;
		const EDIT     = 1 << 2;
		const DELETE   = 1 << 3;
		const UNDELETE = 1 << 4;
		const OPERATOR = 1 << 5;
		const MASTER   = 1 << 6;
		/// Exclusive, held by at most one user per target
		const OWNER    = 1 << 7;
	}
}

impl PermissionMask {
	pub fn is_owner_grade(&self) -> bool {
		self.contains(Self::OWNER)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn owner_grade_is_detected_in_combined_masks() {
		assert!((PermissionMask::VIEW | PermissionMask::OWNER).is_owner_grade());
		assert!(!PermissionMask::all()
			.difference(PermissionMask::OWNER)
			.is_owner_grade());
		assert_eq!(PermissionMask::OWNER.bits(), 128);
	}
}
