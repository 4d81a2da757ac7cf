//! Core types for the authentication system.

use thiserror::Error;
use tracing::debug;

/// Why a verification did not succeed.
///
/// The variants are for the server log only; the client sees the same
/// redirect for every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("credentials rejected: {0}")]
    BadCredentials(String),

    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("unsupported conversation prompt: {0}")]
    Protocol(String),
}

impl AuthError {
    /// Short label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::BadCredentials(_) => "bad_credentials",
            AuthError::Unavailable(_) => "unavailable",
            AuthError::Protocol(_) => "protocol",
        }
    }
}

/// A message sent by the credential store during a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Secret entry, e.g. "Password: "
    EchoOff(String),
    /// Visible entry
    EchoOn(String),
    /// Informational text
    TextInfo(String),
    /// Error text
    ErrorMsg(String),
    /// Any other message style (radio, binary, ...)
    Unrecognized(String),
}

/// Answers the prompts of one authentication attempt.
pub struct Conversation {
    password: String,
    violation: Option<String>,
}

impl Conversation {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            violation: None,
        }
    }

    /// Produce the reply for `prompt`.
    ///
    /// Secret prompts get the password, visible/info/error prompts are
    /// acknowledged with an empty reply, unrecognized styles fail.
    pub fn respond(&mut self, prompt: &Prompt) -> Result<String, AuthError> {
        match prompt {
            Prompt::EchoOff(_) => Ok(self.password.clone()),
            Prompt::EchoOn(msg) | Prompt::TextInfo(msg) | Prompt::ErrorMsg(msg) => {
                debug!("Credential store message: {}", msg.trim());
                Ok(String::new())
            }
            Prompt::Unrecognized(style) => {
                self.violation = Some(style.clone());
                Err(AuthError::Protocol(style.clone()))
            }
        }
    }

    /// The unrecognized prompt style seen during this conversation, if any
    pub fn violation(&self) -> Option<&str> {
        self.violation.as_deref()
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("violation", &self.violation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_prompt_gets_password() {
        let mut conv = Conversation::new("correct");
        let reply = conv.respond(&Prompt::EchoOff("Password: ".into())).unwrap();
        assert_eq!(reply, "correct");
    }

    #[test]
    fn test_visible_and_info_prompts_are_acknowledged() {
        let mut conv = Conversation::new("correct");
        for prompt in [
            Prompt::EchoOn("login: ".into()),
            Prompt::TextInfo("Last login yesterday".into()),
            Prompt::ErrorMsg("Account expires soon".into()),
        ] {
            assert_eq!(conv.respond(&prompt).unwrap(), "");
        }
        assert!(conv.violation().is_none());
    }

    #[test]
    fn test_unrecognized_prompt_is_a_protocol_error() {
        let mut conv = Conversation::new("correct");
        let err = conv.respond(&Prompt::Unrecognized("radio".into())).unwrap_err();
        assert_eq!(err, AuthError::Protocol("radio".into()));
        assert_eq!(conv.violation(), Some("radio"));
    }

    #[test]
    fn test_debug_hides_password() {
        let conv = Conversation::new("hunter2");
        assert!(!format!("{:?}", conv).contains("hunter2"));
    }
}
