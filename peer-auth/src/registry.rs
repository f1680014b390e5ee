//! Suite enablement, the listener/keystore/certificate-services handle the
//! source calls "bus", and dispatch helpers shared by both phases.

use crate::context::{version_major, ECDSA_MIN_VERSION_MAJOR, SUITE_ECDHE_ECDSA};
use crate::support::keystore::Keystore;
use crate::support::listener::{AuthListener, PasswordCallback};
use crate::support::x509::CertificateChainVerifier;

/// Per-suite enable flags, indexed by suite ordinal. Owned by the caller,
/// not the handshake core — there is no global mutable state in here.
#[derive(Default)]
pub struct SuiteRegistry {
    enabled: Vec<u32>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        SuiteRegistry { enabled: Vec::new() }
    }

    pub fn enable_suite(&mut self, suite: u32) {
        if !self.enabled.contains(&suite) {
            self.enabled.push(suite);
        }
    }

    /// `true` iff the suite's flag is set and, for ECDSA, `version` meets
    /// the minimum floor. This is the single source of truth for the
    /// version gate — dispatch re-checks it independently (see
    /// `Bus::is_suite_enabled` callers in `auth::dispatch`), so a caller
    /// can't route around it by only consulting the flag.
    pub fn is_suite_enabled(&self, suite: u32, version: u32) -> bool {
        if !self.enabled.contains(&suite) {
            return false;
        }
        if suite == SUITE_ECDHE_ECDSA && version_major(version) < ECDSA_MIN_VERSION_MAJOR {
            return false;
        }
        true
    }
}

/// The external collaborator handle the source calls `bus`: suite
/// enablement plus the listener/keystore/certificate-services capabilities
/// the authentication suites need. Modelled as one trait so `AuthContext`
/// can hold a single reference to it.
pub trait Bus {
    fn registry(&self) -> &SuiteRegistry;

    /// The structured v2 request/response listener, if one is registered.
    fn listener(&self) -> Option<&dyn AuthListener>;

    /// The legacy v1 single-callback listener, if one is registered.
    fn password_callback(&self) -> Option<&dyn PasswordCallback>;

    fn keystore(&self) -> &dyn Keystore;

    fn certificate_verifier(&self) -> &dyn CertificateChainVerifier;

    fn is_suite_enabled(&self, suite: u32, version: u32) -> bool {
        self.registry().is_suite_enabled(suite, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SUITE_ECDHE_ECDSA, SUITE_ECDHE_NULL};

    #[test]
    fn ecdsa_requires_version_floor_regardless_of_flag() {
        let mut reg = SuiteRegistry::new();
        reg.enable_suite(SUITE_ECDHE_ECDSA);
        assert!(!reg.is_suite_enabled(SUITE_ECDHE_ECDSA, 0x0002_0000));
        assert!(reg.is_suite_enabled(SUITE_ECDHE_ECDSA, 0x0003_0000));
    }

    #[test]
    fn unflagged_suite_is_disabled() {
        let reg = SuiteRegistry::new();
        assert!(!reg.is_suite_enabled(SUITE_ECDHE_NULL, 0x0003_0000));
    }
}
