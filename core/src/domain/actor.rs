//! The acting user of a tree operation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
	pub id: Uuid,
	pub username: String,
}

impl Actor {
	pub fn new(username: impl Into<String>) -> Self {
		Self::with_id(Uuid::new_v4(), username)
	}

	pub fn with_id(id: Uuid, username: impl Into<String>) -> Self {
		Self {
			id,
			username: username.into(),
		}
	}
}
