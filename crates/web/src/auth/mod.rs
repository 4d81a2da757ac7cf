//! Operator authentication against the host credential store.
//!
//! The credential store speaks a prompt/response conversation. Every prompt is
//! mapped onto the closed [`Prompt`] enum and answered by [`Conversation`];
//! anything the console does not recognise aborts the attempt.
//!
//! Backends:
//! - PAM (`pam` feature)
//! - [`UnavailableBackend`] when PAM support is not compiled in

#[cfg(feature = "pam")]
pub mod pam;
pub mod provider;
pub mod types;

pub use provider::{host_backend, AuthBackend, CredentialVerifier, UnavailableBackend};
pub use types::*;
