// src/config/mod.rs

//! Pipeline files.
//!
//! - [`model`] defines the TOML-backed data model.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns a `RawConfigFile` into a checked `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, QueueConfig, RawConfigFile, TaskConfig};
