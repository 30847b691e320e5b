//! Database entities

pub mod resource;
pub mod resource_instance;

pub use resource::Entity as Resource;
pub use resource_instance::Entity as ResourceInstance;
