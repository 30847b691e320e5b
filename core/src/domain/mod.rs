//! Core domain models
//!
//! - AbstractResource carries content and a count of the tree positions using it
//! - ResourceInstance is one such position inside a workspace tree
//! - ResourceType names a pluggable kind of resource

pub mod actor;
pub mod instance;
pub mod resource;
pub mod resource_type;

// Re-export commonly used types
pub use actor::Actor;
pub use instance::ResourceInstance;
pub use resource::{AbstractResource, NewResource, ShareType, DIRECTORY_TYPE};
pub use resource_type::{ResourceType, ResourceTypeRegistry};
