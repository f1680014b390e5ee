//! ECDSA authentication: the signer proves identity by signing the
//! handshake verifier and presenting a certificate chain; the verifier
//! walks the chain down to a trusted CA key from the keystore.
//!
//! The source's cleanup convention — prepend each decoded chain node so a
//! single walk frees everything on any early exit — has no manual
//! counterpart here (owned `Vec`/`Certificate` values just drop), but the
//! decode loop still processes the chain leaf-first in one pass so the
//! "no successor yet" leaf check reads the same way a reviewer familiar
//! with the original would expect.

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey};

use crate::context::{AuthContext, Expiration, KeyAuthState, FIELD_BYTES};
use crate::error::{AuthError, Result};
use crate::prf;
use crate::support::keystore::CERT_FMT_X509_DER;
use crate::support::x509::Certificate;
use wire::{ArgReader, ArgWriter, EcdsaAuthPayload};

pub fn marshal<W: ArgWriter>(ctx: &mut AuthContext, writer: &mut W) -> Result<()> {
    log::debug!("ECDSAMarshal");
    let master = ctx.mastersecret.expect("master secret set by KeyExchange");
    let digest = ctx.transcript.snapshot();
    let verifier = prf::compute_verifier(&master, ctx.role.own_label(), &digest);

    let signing_key: SigningKey = ctx.bus.keystore().signing_key().map_err(|e| {
        log::warn!("ECDSAMarshal: no local signing key");
        e
    })?;
    let signature: Signature = signing_key
        .sign_prehash(&verifier)
        .map_err(|_| AuthError::security("failed to sign handshake verifier"))?;
    let sig_bytes = signature.to_bytes();
    let (r, s) = sig_bytes.split_at(FIELD_BYTES);
    ctx.transcript.update(r);
    ctx.transcript.update(s);
    ctx.transcript.update(&[CERT_FMT_X509_DER]);

    let chain = ctx.bus.keystore().local_chain().map_err(|e| {
        log::warn!("ECDSAMarshal: no local certificate chain");
        e
    })?;
    let mut certs = Vec::with_capacity(chain.len());
    for (fmt, der) in &chain {
        if *fmt != CERT_FMT_X509_DER {
            return Err(AuthError::security("local certificate chain uses unsupported format"));
        }
        ctx.transcript.update(der);
        certs.push(der.clone());
    }

    writer.write_ecdsa_auth(&EcdsaAuthPayload {
        sig_fmt: 0,
        sig_r: r.to_vec(),
        sig_s: s.to_vec(),
        cert_fmt: CERT_FMT_X509_DER,
        certs,
    })?;
    ctx.expiration = Expiration::Never;
    Ok(())
}

pub fn unmarshal<R: ArgReader>(ctx: &mut AuthContext, reader: &mut R) -> Result<()> {
    log::debug!("ECDSAUnmarshal");
    if ctx.bus.listener().is_none() {
        log::warn!("ECDSAUnmarshal: no auth listener registered");
        return Err(AuthError::security("ECDSA requires an auth listener"));
    }

    let master = ctx.mastersecret.expect("master secret set by KeyExchange");
    let digest = ctx.transcript.snapshot();
    let expected_verifier = prf::compute_verifier(&master, ctx.role.peer_label(), &digest);

    // Every early-exit below collapses to the same `Security` failure and
    // the same cleanup, matching the source's `return trusted ? AJ_OK :
    // AJ_ERR_SECURITY;` — the intermediate cause is logged, never leaked.
    let outcome = run(ctx, reader, &expected_verifier);
    if outcome.is_err() {
        ctx.kactx.reset_ecdsa();
    }
    outcome
}

fn run<R: ArgReader>(ctx: &mut AuthContext, reader: &mut R, expected_verifier: &[u8; 32]) -> Result<()> {
    let payload = reader.read_ecdsa_auth()?;

    if payload.sig_fmt != 0 {
        return Err(AuthError::security("unexpected signature variant format"));
    }
    if payload.sig_r.len() != FIELD_BYTES || payload.sig_s.len() != FIELD_BYTES {
        return Err(AuthError::security("signature component has wrong length"));
    }
    ctx.transcript.update(&payload.sig_r);
    ctx.transcript.update(&payload.sig_s);

    if payload.cert_fmt != CERT_FMT_X509_DER {
        return Err(AuthError::security("unsupported certificate format"));
    }
    ctx.transcript.update(&[payload.cert_fmt]);

    if payload.certs.is_empty() {
        return Err(AuthError::security("empty certificate chain"));
    }

    let mut sig_bytes = [0u8; 2 * FIELD_BYTES];
    sig_bytes[..FIELD_BYTES].copy_from_slice(&payload.sig_r);
    sig_bytes[FIELD_BYTES..].copy_from_slice(&payload.sig_s);
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|_| AuthError::security("malformed signature components"))?;

    let mut chain: Vec<Certificate> = Vec::with_capacity(payload.certs.len());
    let mut leaf_verified = false;

    for der in &payload.certs {
        ctx.transcript.update(der);
        let cert = Certificate::from_der(der)?;

        if !leaf_verified {
            cert.public_key()
                .verify_prehash(expected_verifier, &signature)
                .map_err(|_| AuthError::security("leaf certificate did not sign the verifier"))?;

            let manifest = cert
                .manifest_digest()
                .ok_or_else(|| AuthError::security("leaf manifest digest extension missing or malformed"))?;
            if let KeyAuthState::Ecdsa { manifest: slot, .. } = &mut ctx.kactx {
                *slot = Some(manifest);
            }
            leaf_verified = true;
        }

        if let KeyAuthState::Ecdsa { keys, .. } = &mut ctx.kactx {
            keys.push(cert.public_key().clone());
        }
        chain.push(cert);
    }

    let root_aki = chain
        .last()
        .expect("checked non-empty above")
        .authority_key_identifier()
        .ok_or_else(|| AuthError::security("root certificate has no Authority Key Identifier"))?;
    let ca_key = ctx.bus.keystore().ca_key_by_aki(&root_aki).ok_or_else(|| {
        log::warn!("ECDSAUnmarshal: authority unknown");
        AuthError::security("authority unknown")
    })?;

    ctx.bus.certificate_verifier().verify_chain(&chain, &ca_key)?;

    if let KeyAuthState::Ecdsa { keys, .. } = &mut ctx.kactx {
        keys.push(ca_key);
    }
    ctx.expiration = Expiration::Never;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Role, SUITE_ECDHE_ECDSA};
    use crate::registry::{Bus, SuiteRegistry};
    use crate::support::keystore::MemoryKeystore;
    use crate::support::listener::{AuthListener, MemoryAuthListener, PasswordCallback};
    use crate::support::x509::ReferenceChainVerifier;
    use wire::{EcdsaAuthPayload, MessageBuffer};

    struct TestBus {
        registry: SuiteRegistry,
        keystore: MemoryKeystore,
        listener: Option<MemoryAuthListener>,
        verifier: ReferenceChainVerifier,
    }

    impl Bus for TestBus {
        fn registry(&self) -> &SuiteRegistry {
            &self.registry
        }
        fn listener(&self) -> Option<&dyn AuthListener> {
            self.listener.as_ref().map(|l| l as &dyn AuthListener)
        }
        fn password_callback(&self) -> Option<&dyn PasswordCallback> {
            None
        }
        fn keystore(&self) -> &dyn crate::support::keystore::Keystore {
            &self.keystore
        }
        fn certificate_verifier(&self) -> &dyn crate::support::x509::CertificateChainVerifier {
            &self.verifier
        }
    }

    fn bus_without_listener() -> TestBus {
        TestBus {
            registry: SuiteRegistry::new(),
            keystore: MemoryKeystore::new(),
            listener: None,
            verifier: ReferenceChainVerifier,
        }
    }

    fn bus_with_listener() -> TestBus {
        TestBus {
            registry: SuiteRegistry::new(),
            keystore: MemoryKeystore::new(),
            listener: Some(MemoryAuthListener::new(Vec::new(), Vec::new())),
            verifier: ReferenceChainVerifier,
        }
    }

    #[test]
    fn unmarshal_without_listener_fails_security() {
        let bus = bus_without_listener();
        let mut ctx = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_ECDSA, &bus);
        ctx.mastersecret = Some([0u8; crate::context::MASTER_SECRET_LEN]);
        let mut m = MessageBuffer::new();
        let err = unmarshal(&mut ctx, &mut m.cursor()).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
    }

    #[test]
    fn wrong_signature_variant_format_is_rejected() {
        let bus = bus_with_listener();
        let mut ctx = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_ECDSA, &bus);
        ctx.mastersecret = Some([0u8; crate::context::MASTER_SECRET_LEN]);
        let mut m = MessageBuffer::new();
        m.write_ecdsa_auth(&EcdsaAuthPayload {
            sig_fmt: 7,
            sig_r: vec![0u8; FIELD_BYTES],
            sig_s: vec![0u8; FIELD_BYTES],
            cert_fmt: CERT_FMT_X509_DER,
            certs: vec![vec![0xDE, 0xAD]],
        })
        .unwrap();
        let err = unmarshal(&mut ctx, &mut m.cursor()).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
        match &ctx.kactx {
            KeyAuthState::Ecdsa { keys, manifest } => {
                assert!(keys.is_empty());
                assert!(manifest.is_none());
            }
            _ => panic!("expected ECDSA state"),
        }
    }

    #[test]
    fn short_signature_component_is_rejected() {
        let bus = bus_with_listener();
        let mut ctx = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_ECDSA, &bus);
        ctx.mastersecret = Some([0u8; crate::context::MASTER_SECRET_LEN]);
        let mut m = MessageBuffer::new();
        m.write_ecdsa_auth(&EcdsaAuthPayload {
            sig_fmt: 0,
            sig_r: vec![0u8; FIELD_BYTES - 1],
            sig_s: vec![0u8; FIELD_BYTES],
            cert_fmt: CERT_FMT_X509_DER,
            certs: vec![vec![0xDE, 0xAD]],
        })
        .unwrap();
        let err = unmarshal(&mut ctx, &mut m.cursor()).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
    }

    #[test]
    fn non_der_certificate_format_is_rejected() {
        let bus = bus_with_listener();
        let mut ctx = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_ECDSA, &bus);
        ctx.mastersecret = Some([0u8; crate::context::MASTER_SECRET_LEN]);
        let mut m = MessageBuffer::new();
        m.write_ecdsa_auth(&EcdsaAuthPayload {
            sig_fmt: 0,
            sig_r: vec![0u8; FIELD_BYTES],
            sig_s: vec![0u8; FIELD_BYTES],
            cert_fmt: CERT_FMT_X509_DER + 1,
            certs: vec![vec![0xDE, 0xAD]],
        })
        .unwrap();
        let err = unmarshal(&mut ctx, &mut m.cursor()).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
    }

    #[test]
    fn empty_certificate_chain_is_rejected() {
        let bus = bus_with_listener();
        let mut ctx = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_ECDSA, &bus);
        ctx.mastersecret = Some([0u8; crate::context::MASTER_SECRET_LEN]);
        let mut m = MessageBuffer::new();
        m.write_ecdsa_auth(&EcdsaAuthPayload {
            sig_fmt: 0,
            sig_r: vec![0u8; FIELD_BYTES],
            sig_s: vec![0u8; FIELD_BYTES],
            cert_fmt: CERT_FMT_X509_DER,
            certs: vec![],
        })
        .unwrap();
        let err = unmarshal(&mut ctx, &mut m.cursor()).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
    }

    #[test]
    fn marshal_without_signing_key_fails_as_security_at_the_boundary() {
        let bus = bus_with_listener();
        let mut ctx = AuthContext::new(Role::Client, 0x0003_0000, SUITE_ECDHE_ECDSA, &bus);
        ctx.mastersecret = Some([0u8; crate::context::MASTER_SECRET_LEN]);
        let mut m = MessageBuffer::new();
        let err = marshal(&mut ctx, &mut m).unwrap_err();
        assert!(err.as_security());
    }
}
