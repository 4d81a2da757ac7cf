//! YAK Web Console
//!
//! Authenticates operators against the host credential store and lists the
//! domains on the local hypervisor.

pub mod auth;
pub mod pages;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod static_files;

pub use auth::{AuthBackend, AuthError, CredentialVerifier};
pub use server::WebServer;
pub use session::{SessionCodec, SessionError, SessionKeys, SESSION_COOKIE};
pub use snapshot::{DomainSnapshotStore, SnapshotRefresher};
pub use static_files::StaticFiles;
