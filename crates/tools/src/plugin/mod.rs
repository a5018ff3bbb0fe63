//! Plugins: external programs registered as tools.
//!
//! A plugin is described by a [`PluginManifest`] and persisted through a
//! [`ManifestStore`]. [`PluginRegistry::load_all`] turns every stored
//! manifest into a [`PluginLoad`], either a runnable [`CommandTool`] or a
//! failure with its reason.

pub mod command;
pub mod manifest;
pub mod registry;
pub mod store;

pub use command::CommandTool;
pub use manifest::PluginManifest;
pub use registry::{PluginLoad, PluginRegistry, load};
pub use store::{FsManifestStore, ManifestStore, MemoryManifestStore, StoreEntry};
