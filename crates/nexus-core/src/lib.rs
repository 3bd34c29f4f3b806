//! Core types shared across the Nexus package-registry gateway.
//!
//! This crate carries no I/O: ecosystem tags, package keys, manifest
//! records, the error taxonomy, and process configuration. Every other
//! crate in the workspace depends on it.

pub mod config;
pub mod ecosystem;
pub mod error;
pub mod key;
pub mod manifest;

pub use config::NexusConfig;
pub use ecosystem::Ecosystem;
pub use error::NexusError;
pub use key::PackageKey;
pub use manifest::{FileEntry, PackageManifest};
