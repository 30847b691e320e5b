//! Operations on the resource tree and the built-in type handlers

pub mod handlers;
pub mod resources;

pub use resources::{Created, ResourceManager, ReturnHandle};
