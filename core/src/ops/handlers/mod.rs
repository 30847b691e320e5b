//! Built-in resource type handlers

mod file;

pub use file::{FileContent, FileHandler, FILE_TYPE};
