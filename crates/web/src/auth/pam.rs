//! PAM backend.

use std::ffi::{CStr, CString};

use pam_client::{Context, ConversationHandler, ErrorCode, Flag};
use tracing::warn;

use super::provider::AuthBackend;
use super::types::*;

/// Authenticates against a PAM service (e.g. `/etc/pam.d/check_user`)
#[derive(Debug, Clone)]
pub struct PamBackend {
    service: String,
}

impl PamBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl AuthBackend for PamBackend {
    fn authenticate(&self, username: &str, conversation: Conversation) -> Result<(), AuthError> {
        let mut context = Context::new(&self.service, Some(username), PamConversation(conversation))
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let outcome = context
            .authenticate(Flag::NONE)
            .and_then(|()| context.acct_mgmt(Flag::NONE));

        if let Some(style) = context.conversation().0.violation() {
            return Err(AuthError::Protocol(style.to_string()));
        }

        outcome.map_err(|e| classify(e.code(), e.to_string()))
    }
}

fn classify(code: ErrorCode, detail: String) -> AuthError {
    match code {
        ErrorCode::AUTH_ERR
        | ErrorCode::USER_UNKNOWN
        | ErrorCode::CRED_INSUFFICIENT
        | ErrorCode::MAXTRIES
        | ErrorCode::ACCT_EXPIRED
        | ErrorCode::PERM_DENIED
        | ErrorCode::NEW_AUTHTOK_REQD => AuthError::BadCredentials(detail),
        _ => AuthError::Unavailable(detail),
    }
}

/// Adapts PAM's message callbacks onto [`Conversation`]
struct PamConversation(Conversation);

impl PamConversation {
    fn reply(&mut self, prompt: Prompt) -> Result<CString, ErrorCode> {
        let answer = self.0.respond(&prompt).map_err(|_| ErrorCode::CONV_ERR)?;
        CString::new(answer).map_err(|_| {
            warn!("Rejecting reply containing a NUL byte");
            ErrorCode::CONV_ERR
        })
    }
}

fn text(msg: &CStr) -> String {
    msg.to_string_lossy().into_owned()
}

impl ConversationHandler for PamConversation {
    fn prompt_echo_on(&mut self, msg: &CStr) -> Result<CString, ErrorCode> {
        self.reply(Prompt::EchoOn(text(msg)))
    }

    fn prompt_echo_off(&mut self, msg: &CStr) -> Result<CString, ErrorCode> {
        self.reply(Prompt::EchoOff(text(msg)))
    }

    fn text_info(&mut self, msg: &CStr) {
        let _ = self.0.respond(&Prompt::TextInfo(text(msg)));
    }

    fn error_msg(&mut self, msg: &CStr) {
        let _ = self.0.respond(&Prompt::ErrorMsg(text(msg)));
    }

    fn radio_prompt(&mut self, msg: &CStr) -> Result<bool, ErrorCode> {
        let _ = self.0.respond(&Prompt::Unrecognized(format!("radio: {}", text(msg))));
        Err(ErrorCode::CONV_ERR)
    }

    // Linux-PAM extension; pam-client only exposes it on Linux.
    #[cfg(target_os = "linux")]
    fn binary_prompt(&mut self, type_: u8, _data: &[u8]) -> Result<(u8, Vec<u8>), ErrorCode> {
        let _ = self.0.respond(&Prompt::Unrecognized(format!("binary: type {}", type_)));
        Err(ErrorCode::CONV_ERR)
    }
}
