//! Console configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level YAK configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YakConfig {
    /// HTTP listen address
    pub listen: String,

    /// Directory served read-only under `/images/`
    pub static_dir: PathBuf,

    /// Hypervisor configuration
    pub hypervisor: HypervisorConfig,

    /// Credential store configuration
    pub auth: AuthConfig,

    /// Session cookie configuration
    pub session: SessionConfig,
}

impl Default for YakConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8082".to_string(),
            static_dir: PathBuf::from("./data/images"),
            hypervisor: HypervisorConfig::default(),
            auth: AuthConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Hypervisor connection and refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HypervisorConfig {
    /// libvirt connection URI
    pub uri: String,

    /// Only report running domains
    pub active_only: bool,

    /// Delay between refresh cycles
    pub refresh_interval_ms: u64,

    /// Upper bound on a single refresh cycle
    pub refresh_timeout_ms: u64,
}

impl Default for HypervisorConfig {
    fn default() -> Self {
        Self {
            uri: crate::DEFAULT_HYPERVISOR_URI.to_string(),
            active_only: true,
            refresh_interval_ms: 1000,
            refresh_timeout_ms: 5000,
        }
    }
}

impl HypervisorConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

/// Host credential store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PAM service name
    pub pam_service: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pam_service: "check_user".to_string(),
        }
    }
}

/// Session cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tokens older than this are rejected
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 60 * 60 * 12,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl YakConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values the console cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.hypervisor.uri.trim().is_empty() {
            return Err(Error::InvalidConfig("hypervisor.uri must not be empty".to_string()));
        }
        if self.hypervisor.refresh_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "hypervisor.refresh_interval_ms must be positive".to_string(),
            ));
        }
        if self.hypervisor.refresh_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "hypervisor.refresh_timeout_ms must be positive".to_string(),
            ));
        }
        if self.auth.pam_service.trim().is_empty() {
            return Err(Error::InvalidConfig("auth.pam_service must not be empty".to_string()));
        }
        if self.session.max_age_secs == 0 {
            return Err(Error::InvalidConfig("session.max_age_secs must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = YakConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8082");
        assert_eq!(config.hypervisor.uri, "qemu:///system");
        assert!(config.hypervisor.active_only);
        assert_eq!(config.hypervisor.refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.auth.pam_service, "check_user");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
listen = "127.0.0.1:9000"

[hypervisor]
active_only = false
refresh_timeout_ms = 250
"#,
        )
        .unwrap();

        let config = YakConfig::load(&path).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert!(!config.hypervisor.active_only);
        assert_eq!(config.hypervisor.refresh_timeout(), Duration::from_millis(250));
        assert_eq!(config.hypervisor.refresh_interval_ms, 1000);
        assert_eq!(config.session.max_age_secs, 60 * 60 * 12);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[hypervisor]\nrefresh_interval_ms = 0\n").unwrap();

        let err = YakConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "listen = [").unwrap();

        assert!(matches!(YakConfig::load(&path), Err(Error::ConfigParse(_))));
    }
}
