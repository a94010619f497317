// src/config/mod.rs

//! Optional project settings for rerun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load `Rerun.toml` from the watched root when present (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//!
//! Every setting has a default, so running without a settings file behaves
//! exactly like an empty one.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{CONFIG_FILE_NAME, load_for_root, load_from_path};
pub use model::{CommandSection, ConfigFile, RawConfigFile, WatchSection};
