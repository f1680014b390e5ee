//! Peer-authentication handshake: ECDHE key exchange followed by one of
//! NULL, PSK, or ECDSA key authentication, modeled after TLS-1.2-style
//! PRF-derived verifiers rather than a bespoke MAC construction.
//!
//! The handshake core (this crate) is transport-agnostic: it reads and
//! writes through the [`wire::ArgReader`]/[`wire::ArgWriter`] traits and
//! asks its four collaborators — [`registry::Bus`], [`support::keystore::Keystore`],
//! [`support::listener::AuthListener`]/[`support::listener::PasswordCallback`], and
//! [`support::x509::CertificateChainVerifier`] — for everything suite-specific.
//! [`driver::run_handshake`] wires the core to a real `io::Read + io::Write`
//! transport for callers that don't need to drive the phases by hand.

pub mod auth;
pub mod context;
pub mod driver;
pub mod error;
pub mod kex;
pub mod prf;
pub mod registry;
pub mod support;
pub mod transcript;

pub use auth::{key_authentication_marshal, key_authentication_unmarshal};
pub use context::{
    AuthContext, Expiration, KeyAuthState, KeyExchangeState, Role, CURVE_NIST_P256,
    ECDSA_MIN_VERSION_MAJOR, FIELD_BYTES, KEY_EXCHANGE_ECDHE, MASTER_SECRET_LEN,
    SUITE_ECDHE_ECDSA, SUITE_ECDHE_NULL, SUITE_ECDHE_PSK, VERIFIER_LEN,
};
pub use driver::{run_handshake, HandshakeOutcome};
pub use error::{AuthError, Result};
pub use kex::{key_exchange_marshal, key_exchange_unmarshal};
pub use registry::{Bus, SuiteRegistry};
