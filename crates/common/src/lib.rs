//! YAK Common Library
//!
//! Shared types, configuration and hypervisor access for the YAK status console.

pub mod config;
pub mod error;
pub mod hypervisor;
pub mod types;

// Re-export commonly used types
pub use config::YakConfig;
pub use error::{Error, Result};
pub use hypervisor::{DomainFilter, DomainRef, Hypervisor, VirshConnection};
pub use types::*;

/// YAK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default libvirt connection URI
pub const DEFAULT_HYPERVISOR_URI: &str = "qemu:///system";

/// Default config file path
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("/etc/yak/config.toml")
}
