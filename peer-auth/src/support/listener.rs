//! The listener collaborator: two callback contracts that coexist during
//! an ecosystem migration (§9 "Listener callback shape").
//!
//! `AuthListener` is the structured v2 request/response contract;
//! `PasswordCallback` is the legacy v1 single-callback contract. A bus
//! registers at most one of the two; the PSK suite picks whichever is
//! present at handshake start.

use std::collections::HashMap;

use crate::context::Expiration;
use crate::error::AuthError;

/// Legacy v1 callback cap: responses over this size fail *resources*.
pub const LEGACY_PSK_MAX_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialDirection {
    /// The application is being asked to supply a value.
    Request,
    /// The application is being informed of a value that was received.
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Hint,
    Value,
}

#[derive(Debug, Clone)]
pub struct PskCredential {
    pub data: Vec<u8>,
    pub expiration: Expiration,
}

/// The v2 structured PSK listener.
pub trait AuthListener {
    /// `peer_data` carries the hint already received, for `Response`
    /// calls; it's empty for `Request` calls.
    fn on_psk(
        &self,
        direction: CredentialDirection,
        field: CredentialField,
        peer_data: &[u8],
    ) -> Result<PskCredential, AuthError>;
}

/// The legacy v1 callback: one blob, no structured hint/value split.
pub trait PasswordCallback {
    fn get_password(&self, hint: &[u8]) -> Result<Vec<u8>, AuthError>;
}

/// In-memory v2 listener: a fixed PSK value under a fixed hint, as a test
/// would configure it on both ends of a handshake.
pub struct MemoryAuthListener {
    pub hint: Vec<u8>,
    pub psk: Vec<u8>,
    pub expiration: Expiration,
}

impl MemoryAuthListener {
    pub fn new(hint: impl Into<Vec<u8>>, psk: impl Into<Vec<u8>>) -> Self {
        MemoryAuthListener { hint: hint.into(), psk: psk.into(), expiration: Expiration::Never }
    }
}

impl AuthListener for MemoryAuthListener {
    fn on_psk(
        &self,
        direction: CredentialDirection,
        field: CredentialField,
        peer_data: &[u8],
    ) -> Result<PskCredential, AuthError> {
        match (direction, field) {
            (CredentialDirection::Request, CredentialField::Hint) => {
                Ok(PskCredential { data: self.hint.clone(), expiration: self.expiration })
            }
            (CredentialDirection::Request, CredentialField::Value) => {
                Ok(PskCredential { data: self.psk.clone(), expiration: self.expiration })
            }
            (CredentialDirection::Response, CredentialField::Hint) => {
                // The application is merely informed; echo it back.
                Ok(PskCredential { data: peer_data.to_vec(), expiration: self.expiration })
            }
            (CredentialDirection::Response, CredentialField::Value) => {
                Ok(PskCredential { data: self.psk.clone(), expiration: self.expiration })
            }
        }
    }
}

/// In-memory legacy callback, keyed by hint (empty hint is the common case
/// for a v1 peer that never sends one).
pub struct MemoryPasswordCallback {
    pub passwords: HashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryPasswordCallback {
    pub fn single(password: impl Into<Vec<u8>>) -> Self {
        let mut passwords = HashMap::new();
        passwords.insert(Vec::new(), password.into());
        MemoryPasswordCallback { passwords }
    }
}

impl PasswordCallback for MemoryPasswordCallback {
    fn get_password(&self, hint: &[u8]) -> Result<Vec<u8>, AuthError> {
        self.passwords
            .get(hint)
            .or_else(|| self.passwords.get(&Vec::new()))
            .cloned()
            .ok_or_else(|| AuthError::security("no legacy password registered"))
    }
}
