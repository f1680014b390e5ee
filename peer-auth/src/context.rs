//! The handshake's one piece of mutable state: [`AuthContext`].

use p256::ecdsa::VerifyingKey;
use p256::SecretKey;

use crate::registry::Bus;
use crate::transcript::Transcript;

pub const MASTER_SECRET_LEN: usize = 48;
pub const VERIFIER_LEN: usize = 32;
pub const FIELD_BYTES: usize = 32;

/// The curve-id byte naming NIST P-256 on the wire. Kept as a fixed
/// non-zero value so an all-zero payload (the most likely bit-rot pattern)
/// is rejected rather than silently accepted.
pub const CURVE_NIST_P256: u8 = 2;

/// Upper 16 bits of `suite` naming the key-exchange family. Only ECDHE is
/// defined.
pub const KEY_EXCHANGE_ECDHE: u32 = 0x0001_0000;

pub const SUITE_ECDHE_NULL: u32 = KEY_EXCHANGE_ECDHE | 0x00FF;
pub const SUITE_ECDHE_PSK: u32 = KEY_EXCHANGE_ECDHE | 0x00FE;
pub const SUITE_ECDHE_ECDSA: u32 = KEY_EXCHANGE_ECDHE | 0x00FD;

/// Minimum protocol major version that may select the ECDSA suite.
pub const ECDSA_MIN_VERSION_MAJOR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    /// The PRF label this role uses for its own verifier.
    pub fn own_label(self) -> &'static [u8] {
        match self {
            Role::Client => b"client finished",
            Role::Server => b"server finished",
        }
    }

    /// The PRF label this role expects from its peer.
    pub fn peer_label(self) -> &'static [u8] {
        match self {
            Role::Client => b"server finished",
            Role::Server => b"client finished",
        }
    }
}

/// Credential expiration as reported by the listener. `Never` is used for
/// the legacy PSK callback and for ECDSA, whose lifetime is governed by the
/// certificates themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Never,
    At(u64),
}

/// Ephemeral ECDHE key-exchange state. The private key is used exactly
/// once and zeroised when this is dropped or explicitly cleared.
#[derive(Default)]
pub struct KeyExchangeState {
    local_secret: Option<SecretKey>,
}

impl KeyExchangeState {
    pub fn set_local_secret(&mut self, secret: SecretKey) {
        self.local_secret = Some(secret);
    }

    pub fn local_secret(&self) -> Option<&SecretKey> {
        self.local_secret.as_ref()
    }

    /// Consume and zeroise the ephemeral private key; called once the
    /// shared secret has been derived from it.
    pub fn take_and_clear(&mut self) -> Option<SecretKey> {
        self.local_secret.take()
    }
}

impl Drop for KeyExchangeState {
    fn drop(&mut self) {
        // SecretKey zeroises its own scalar on drop; this just documents
        // the invariant at the call site a reviewer would check.
        if let Some(secret) = self.local_secret.take() {
            drop(secret);
        }
    }
}

/// Suite-specific authentication state, a tagged union mirroring the
/// source's `kactx`.
pub enum KeyAuthState {
    Null,
    Psk {
        hint: Vec<u8>,
        /// Whether this side has already resolved its credential and
        /// hashed `hint ‖ psk` into the transcript — happens exactly once
        /// per side, during whichever of Marshal/Unmarshal runs first.
        resolved: bool,
    },
    Ecdsa { keys: Vec<VerifyingKey>, manifest: Option<[u8; 32]> },
}

impl KeyAuthState {
    pub fn reset_ecdsa(&mut self) {
        if let KeyAuthState::Ecdsa { keys, manifest } = self {
            keys.clear();
            *manifest = None;
        }
    }
}

/// Per-handshake state: role, version, suite, running transcript, derived
/// secrets, and suite-specific material. Lives for exactly one handshake.
pub struct AuthContext<'a> {
    pub role: Role,
    pub version: u32,
    pub suite: u32,
    pub transcript: Transcript,
    pub kectx: KeyExchangeState,
    pub mastersecret: Option<[u8; MASTER_SECRET_LEN]>,
    pub kactx: KeyAuthState,
    pub expiration: Expiration,
    pub bus: &'a dyn Bus,
}

impl<'a> AuthContext<'a> {
    pub fn new(role: Role, version: u32, suite: u32, bus: &'a dyn Bus) -> Self {
        let kactx = match suite {
            SUITE_ECDHE_PSK => KeyAuthState::Psk { hint: Vec::new(), resolved: false },
            SUITE_ECDHE_ECDSA => KeyAuthState::Ecdsa { keys: Vec::new(), manifest: None },
            _ => KeyAuthState::Null,
        };
        AuthContext {
            role,
            version,
            suite,
            transcript: Transcript::new(),
            kectx: KeyExchangeState::default(),
            mastersecret: None,
            kactx,
            expiration: Expiration::Never,
            bus,
        }
    }

    /// `true` for version ≥ 3, which selects v2 wire layouts.
    pub fn is_v2(&self) -> bool {
        version_major(self.version) >= 3
    }

    pub fn key_exchange_family(&self) -> u32 {
        self.suite & 0xFFFF_0000
    }
}

pub fn version_major(version: u32) -> u32 {
    version >> 16
}
