//! Session tokens carried in the `yak_session` cookie.
//!
//! Token layout before base64url encoding:
//!
//! ```text
//! timestamp (8, BE) | nonce (12) | ChaCha20-Poly1305(claims JSON) | HMAC-SHA256 (32)
//! ```
//!
//! The HMAC covers the cookie name and everything before it, keyed with the
//! integrity key. The ciphertext uses the separate confidentiality key.
//! Both keys are generated at startup and never leave the process, so every
//! outstanding session dies with it.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use thiserror::Error;
use yak_common::SessionClaims;

/// Cookie name
pub const SESSION_COOKIE: &str = "yak_session";

/// Integrity key size
pub const HASH_KEY_SIZE: usize = 64;

/// Confidentiality key size (256 bits)
pub const BLOCK_KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 12;
const TIMESTAMP_SIZE: usize = 8;
const TAG_SIZE: usize = 16;
const MAC_SIZE: usize = 32;
const MIN_TOKEN_SIZE: usize = TIMESTAMP_SIZE + NONCE_SIZE + TAG_SIZE + MAC_SIZE;
const MAX_ENCODED_LEN: usize = 4096;
const MAX_CLOCK_SKEW_SECS: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// Why a token was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("token is not valid base64url")]
    Malformed,

    #[error("token is truncated")]
    Truncated,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token could not be decrypted")]
    Decrypt,

    #[error("token payload does not match the claims schema")]
    Schema,

    #[error("failed to encode session: {0}")]
    Encode(String),
}

/// Process-lifetime key pair for session tokens
#[derive(Clone)]
pub struct SessionKeys {
    hash_key: [u8; HASH_KEY_SIZE],
    block_key: [u8; BLOCK_KEY_SIZE],
}

impl SessionKeys {
    /// Generate fresh keys from the OS RNG
    pub fn generate() -> Self {
        let mut hash_key = [0u8; HASH_KEY_SIZE];
        let mut block_key = [0u8; BLOCK_KEY_SIZE];
        OsRng.fill_bytes(&mut hash_key);
        OsRng.fill_bytes(&mut block_key);
        Self { hash_key, block_key }
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(<redacted>)")
    }
}

/// Encodes and validates session tokens
#[derive(Debug, Clone)]
pub struct SessionCodec {
    keys: SessionKeys,
    max_age: Duration,
}

impl SessionCodec {
    pub fn new(keys: SessionKeys, max_age: Duration) -> Self {
        Self { keys, max_age }
    }

    /// Seal `claims` into a cookie-safe token
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        let plaintext =
            serde_json::to_vec(claims).map_err(|e| SessionError::Encode(e.to_string()))?;
        self.seal(&plaintext, now_epoch_secs())
    }

    /// Validate `token` and recover its claims
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let plaintext = self.open(token, now_epoch_secs())?;
        let claims: SessionClaims =
            serde_json::from_slice(&plaintext).map_err(|_| SessionError::Schema)?;
        if claims.username.is_empty() {
            return Err(SessionError::Schema);
        }
        Ok(claims)
    }

    fn seal(&self, plaintext: &[u8], timestamp: i64) -> Result<String, SessionError> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.keys.block_key)
            .map_err(|e| SessionError::Encode(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| SessionError::Encode(e.to_string()))?;

        let mut token = Vec::with_capacity(MIN_TOKEN_SIZE + plaintext.len());
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);

        let mut mac = self.mac()?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    fn open(&self, token: &str, now: i64) -> Result<Vec<u8>, SessionError> {
        if token.len() > MAX_ENCODED_LEN {
            return Err(SessionError::Malformed);
        }
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| SessionError::Malformed)?;
        if raw.len() < MIN_TOKEN_SIZE {
            return Err(SessionError::Truncated);
        }

        let (body, tag) = raw.split_at(raw.len() - MAC_SIZE);
        let mut mac = self.mac().map_err(|_| SessionError::BadSignature)?;
        mac.update(body);
        mac.verify_slice(tag).map_err(|_| SessionError::BadSignature)?;

        let (timestamp, rest) = body.split_at(TIMESTAMP_SIZE);
        let mut ts = [0u8; TIMESTAMP_SIZE];
        ts.copy_from_slice(timestamp);
        let issued = i64::from_be_bytes(ts);
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        if issued > now.saturating_add(MAX_CLOCK_SKEW_SECS) || now.saturating_sub(issued) > max_age {
            return Err(SessionError::Expired);
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        let cipher = ChaCha20Poly1305::new_from_slice(&self.keys.block_key)
            .map_err(|_| SessionError::Decrypt)?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SessionError::Decrypt)
    }

    /// HMAC bound to the cookie name so tokens cannot be replayed under another name
    fn mac(&self) -> Result<HmacSha256, SessionError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.keys.hash_key)
            .map_err(|e| SessionError::Encode(e.to_string()))?;
        mac.update(SESSION_COOKIE.as_bytes());
        mac.update(b"|");
        Ok(mac)
    }
}

fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
