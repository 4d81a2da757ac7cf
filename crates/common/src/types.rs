//! Core types for YAK

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A username/password pair submitted by the login form.
///
/// Lives for the duration of one verification call. The password never
/// appears in `Debug` output.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must be non-empty before the credential store is consulted
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated facts carried across requests inside the session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionClaims {
    pub username: String,
    /// Unix seconds at which the claims were issued
    pub issued_at: i64,
}

impl SessionClaims {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            issued_at: Utc::now().timestamp(),
        }
    }
}

/// Immutable point-in-time copy of the domain name list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub names: Vec<String>,
    /// Bumped on every published refresh; 0 means never refreshed
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DomainSnapshot {
    /// The snapshot served before the first refresh completes
    pub fn empty() -> Self {
        Self {
            names: Vec::new(),
            generation: 0,
            refreshed_at: None,
        }
    }

    pub fn new(names: Vec<String>, generation: u64) -> Self {
        Self {
            names,
            generation,
            refreshed_at: Some(Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

impl Default for DomainSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
