//! The core's single error type.
//!
//! Shaped after `brontide::HandshakeError`: a closed set of variants with a
//! manual `Display` and `std::error::Error` impl rather than a derive-based
//! error crate, matching the rest of this workspace.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use wire::FrameworkError;

/// Errors produced by the authentication core.
///
/// `Keystore` is a distinct variant internally (so call sites can log the
/// real cause) but is folded into a `Security` message at every public
/// boundary the peer can observe — the distinction between "your credential
/// is bad" and "my keystore is broken" must never leak on the wire.
#[derive(Debug)]
pub enum AuthError {
    /// A protocol deviation: wrong curve, wrong length, bad signature, bad
    /// chain, verifier mismatch, unknown CA, missing listener. Terminal.
    Security(String),
    /// An allocation or size-limit failure (oversize PSK response, chain
    /// too long). Terminal.
    Resources(String),
    /// A keystore lookup failed (missing signing key, missing CA key).
    /// Never surfaced to the peer as anything other than `Security`.
    Keystore(String),
    /// The underlying marshal/unmarshal layer failed.
    Framework(FrameworkError),
    /// The underlying transport failed.
    Io(io::Error),
}

impl AuthError {
    pub fn security<S: Into<String>>(msg: S) -> Self {
        AuthError::Security(msg.into())
    }

    pub fn resources<S: Into<String>>(msg: S) -> Self {
        AuthError::Resources(msg.into())
    }

    pub fn keystore<S: Into<String>>(msg: S) -> Self {
        AuthError::Keystore(msg.into())
    }

    /// The status this context would report to its own caller: keystore
    /// failures are indistinguishable from protocol security failures once
    /// they cross this boundary.
    pub fn as_security(&self) -> bool {
        matches!(self, AuthError::Security(_) | AuthError::Keystore(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::Security(msg) => write!(f, "security violation: {}", msg),
            AuthError::Resources(msg) => write!(f, "resource error: {}", msg),
            AuthError::Keystore(msg) => write!(f, "keystore error: {}", msg),
            AuthError::Framework(e) => write!(f, "framework error: {}", e),
            AuthError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl StdError for AuthError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AuthError::Framework(e) => Some(e),
            AuthError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AuthError {
    fn from(e: io::Error) -> Self {
        AuthError::Io(e)
    }
}

impl From<FrameworkError> for AuthError {
    fn from(e: FrameworkError) -> Self {
        AuthError::Framework(e)
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
