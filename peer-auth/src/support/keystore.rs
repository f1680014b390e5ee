//! The keystore collaborator: signing key, CA key lookup, local cert chain.
//!
//! The real host keystore persists credentials to flash and is out of
//! scope (§1 Non-goals) — this is a trait plus an in-memory reference
//! implementation sufficient to drive a handshake in tests.

use std::collections::HashMap;

use p256::ecdsa::{SigningKey, VerifyingKey};

use crate::error::AuthError;

/// Certificate encoding tag used on the wire and in keystore storage.
pub const CERT_FMT_X509_DER: u8 = 0;

pub trait Keystore {
    /// The local signing private key used to prove identity in the ECDSA
    /// suite. `AuthError::Keystore` on a missing key.
    fn signing_key(&self) -> Result<SigningKey, AuthError>;

    /// The local certificate chain, leaf first, in its stored
    /// `(format, der-bytes)` form — transcoded to the wire's
    /// `array of der-bytes` by the caller.
    fn local_chain(&self) -> Result<Vec<(u8, Vec<u8>)>, AuthError>;

    /// A trusted CA public key, looked up by the Authority Key Identifier
    /// found on the root of an inbound chain. `None` means "authority
    /// unknown", which the caller turns into a security failure.
    fn ca_key_by_aki(&self, aki: &[u8]) -> Option<VerifyingKey>;
}

/// In-memory reference keystore: everything is supplied by the test that
/// constructs it, nothing touches disk.
#[derive(Default)]
pub struct MemoryKeystore {
    pub signing_key: Option<SigningKey>,
    pub chain: Vec<(u8, Vec<u8>)>,
    pub ca_keys: HashMap<Vec<u8>, VerifyingKey>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        MemoryKeystore::default()
    }

    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn with_chain(mut self, chain: Vec<(u8, Vec<u8>)>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_ca_key(mut self, aki: Vec<u8>, key: VerifyingKey) -> Self {
        self.ca_keys.insert(aki, key);
        self
    }
}

impl Keystore for MemoryKeystore {
    fn signing_key(&self) -> Result<SigningKey, AuthError> {
        self.signing_key
            .clone()
            .ok_or_else(|| AuthError::keystore("no local signing key"))
    }

    fn local_chain(&self) -> Result<Vec<(u8, Vec<u8>)>, AuthError> {
        if self.chain.is_empty() {
            return Err(AuthError::keystore("no local certificate chain"));
        }
        Ok(self.chain.clone())
    }

    fn ca_key_by_aki(&self, aki: &[u8]) -> Option<VerifyingKey> {
        self.ca_keys.get(aki).copied()
    }
}
