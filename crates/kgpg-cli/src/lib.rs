//! kgpg library - expose modules for testing
//!
//! Packaging of plugin directories into `.kgpg` archives, the release catalog
//! and the command handlers behind the `kgpg` binary.

pub mod batch;
pub mod commands;
pub mod common;
pub mod errors;
pub mod index;
pub mod tag;

pub use common::GlobalOpts;
