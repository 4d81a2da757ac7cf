//! Error types for YAK

use thiserror::Error;

/// Result type alias using YAK Error
pub type Result<T> = std::result::Result<T, Error>;

/// YAK error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Hypervisor connection failed for {uri}: {reason}")]
    HypervisorConnect { uri: String, reason: String },

    #[error("Hypervisor error: {0}")]
    Hypervisor(String),

    #[error("Domain {domain} lookup failed: {reason}")]
    DomainLookup { domain: String, reason: String },

    #[error("Operation timeout after {millis}ms")]
    Timeout { millis: u64 },
}
