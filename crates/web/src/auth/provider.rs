//! Credential verification with a pluggable backend.

use std::sync::Arc;

use tracing::{debug, error};
use yak_common::{Credential, SessionClaims};

use super::types::*;

/// A host credential store.
///
/// Implementations are synchronous and may take tens of milliseconds;
/// [`CredentialVerifier`] runs them on the blocking pool.
pub trait AuthBackend: Send + Sync + 'static {
    /// Run one authentication transaction for `username`, answering the
    /// store's prompts through `conversation`.
    fn authenticate(&self, username: &str, conversation: Conversation) -> Result<(), AuthError>;
}

/// Backend used when the binary was built without PAM support
#[derive(Debug, Default, Clone)]
pub struct UnavailableBackend;

impl AuthBackend for UnavailableBackend {
    fn authenticate(&self, _username: &str, _conversation: Conversation) -> Result<(), AuthError> {
        Err(AuthError::Unavailable(
            "built without the `pam` feature".to_string(),
        ))
    }
}

/// The host credential store for this build
#[cfg(feature = "pam")]
pub fn host_backend(service: &str) -> Arc<dyn AuthBackend> {
    Arc::new(super::pam::PamBackend::new(service))
}

/// The host credential store for this build
#[cfg(not(feature = "pam"))]
pub fn host_backend(service: &str) -> Arc<dyn AuthBackend> {
    error!(
        "PAM support not compiled in; every login for service {} will fail",
        service
    );
    Arc::new(UnavailableBackend)
}

/// Verifies submitted credentials and issues session claims on success
#[derive(Clone)]
pub struct CredentialVerifier {
    backend: Arc<dyn AuthBackend>,
}

impl CredentialVerifier {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }

    /// Check `credential` against the backend.
    ///
    /// Never panics: a backend that panics or cannot be reached is reported
    /// as [`AuthError::Unavailable`].
    pub async fn verify(&self, credential: Credential) -> Result<SessionClaims, AuthError> {
        if !credential.is_complete() {
            return Err(AuthError::MissingCredentials);
        }

        let Credential { username, password } = credential;
        let backend = self.backend.clone();
        let user = username.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            backend.authenticate(&user, Conversation::new(password))
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                debug!("Credential store accepted {}", username);
                Ok(SessionClaims::new(username))
            }
            Ok(Err(e)) => Err(e),
            Err(join_err) => {
                error!("Credential check for {} aborted: {}", username, join_err);
                Err(AuthError::Unavailable("credential check aborted".to_string()))
            }
        }
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}
