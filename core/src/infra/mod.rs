//! Infrastructure layer - persistence, type dispatch and access rights

pub mod db;
pub mod dispatch;
pub mod security;
pub mod store;
