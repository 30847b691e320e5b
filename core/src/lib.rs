#![warn(clippy::all, rust_2018_idioms)]

//! Resource instance trees
//!
//! Resources hold content, instances place them in per-workspace trees. One
//! resource may appear at several positions; it keeps a count of them and is
//! destroyed with its last one. Type specific behaviour (copying, deleting and
//! exporting payloads) is provided by handlers registered on a dispatch bus.

pub mod common;
pub mod config;
pub mod context;
pub mod domain;
pub mod infra;
pub mod logging;
pub mod ops;

pub use common::errors::{CoreError, Result};
pub use config::AppConfig;
pub use context::CoreContext;
pub use domain::{
	AbstractResource, Actor, NewResource, ResourceInstance, ResourceType, ResourceTypeRegistry,
	ShareType, DIRECTORY_TYPE,
};
pub use infra::{
	dispatch::{DispatchBus, ResourceAction, ResourceTypeHandler},
	security::{OwnershipPolicy, PermissionMask},
	store::{ChangeSet, InstanceTreeStore, MemoryStore},
};
pub use ops::{Created, ResourceManager, ReturnHandle};
