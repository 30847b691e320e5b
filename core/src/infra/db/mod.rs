//! SQLite persistence for the instance tree

pub mod entities;
pub mod migration;
mod store;

pub use store::DbStore;
