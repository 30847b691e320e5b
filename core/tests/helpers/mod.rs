//! Test helper modules for integration tests

pub mod tree_harness;

pub use tree_harness::*;
