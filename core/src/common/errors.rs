//! Unified error handling for the core

use thiserror::Error;
use uuid::Uuid;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Invalid resource: {0}")]
	InvalidResource(String),

	#[error("Unknown resource type: {0}")]
	UnknownResourceType(String),

	#[error("Parent instance not found: {0}")]
	ParentNotFound(Uuid),

	#[error("Resource not found: {0}")]
	ResourceNotFound(Uuid),

	#[error("Resource instance not found: {0}")]
	InstanceNotFound(Uuid),

	#[error("Not a directory: {0}")]
	NotADirectory(Uuid),

	#[error("Invalid move: {0}")]
	InvalidMove(String),

	#[error("Not authorized: {0}")]
	NotAuthorized(String),

	#[error("Attempted to set an owner on an object which already has one")]
	MultipleOwnersAttempt,

	#[error("Owner grade not allowed: {0}")]
	NotAllowedOwner(String),

	#[error("No handler answered <{0}>")]
	MissingHandler(String),

	#[error("Instance count of resource {0} would drop below zero")]
	InstanceCountUnderflow(Uuid),

	#[error("Database error: {0}")]
	Database(#[from] sea_orm::DbErr),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Archive error: {0}")]
	Archive(#[from] arbor_archive::ArchiveError),

	#[error("Other error: {0}")]
	Other(#[from] anyhow::Error),
}

impl CoreError {
	/// Whether this error was raised by the ownership/authorization layer
	pub fn is_authorization(&self) -> bool {
		matches!(
			self,
			Self::NotAuthorized(_) | Self::MultipleOwnersAttempt | Self::NotAllowedOwner(_)
		)
	}
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
