//! Reference implementations of the external collaborators named in §6:
//! keystore, listener, and certificate services. Each is a trait the
//! authentication core depends on, plus an in-memory implementation
//! sufficient to drive and test a handshake end to end — not a
//! production-grade replacement for the host's real subsystems.

pub mod keystore;
pub mod listener;
pub mod x509;
