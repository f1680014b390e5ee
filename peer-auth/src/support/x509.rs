//! Certificate services: DER-decode a certificate, pull the extensions the
//! handshake needs, and verify a chain against a trust anchor.
//!
//! Deliberately not a general-purpose CA-bundle validator (§1 Non-goals):
//! no path-length constraints, no policy OIDs, no revocation. It decodes
//! with the RustCrypto `x509-cert`/`der` family already pulled in for
//! `p256`, and verifies each certificate's signature against its issuer's
//! public key, one link at a time, down to the caller-supplied anchor.

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use x509_cert::ext::pkix::AuthorityKeyIdentifier;
use x509_cert::Certificate as X509Certificate;

use crate::error::AuthError;

/// Private enterprise OID used for the manifest-digest extension. Not a
/// registered IANA arc; picked to be unambiguous within this protocol.
pub const MANIFEST_DIGEST_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.55317.1.1");

/// A decoded certificate plus the public key pulled out of its SPKI, ready
/// for signature verification and extension lookups.
pub struct Certificate {
    inner: X509Certificate,
    public_key: VerifyingKey,
}

impl Certificate {
    pub fn from_der(der_bytes: &[u8]) -> Result<Self, AuthError> {
        let inner = X509Certificate::from_der(der_bytes)
            .map_err(|e| AuthError::security(format!("malformed certificate DER: {}", e)))?;
        let spki = &inner.tbs_certificate.subject_public_key_info;
        let raw = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| AuthError::security("certificate SPKI has unaligned bit string"))?;
        let public_key = VerifyingKey::from_sec1_bytes(raw)
            .map_err(|_| AuthError::security("certificate public key is not a valid P-256 point"))?;
        Ok(Certificate { inner, public_key })
    }

    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// The `keyIdentifier` field of the Authority Key Identifier extension,
    /// used to look up the issuing CA in the keystore.
    pub fn authority_key_identifier(&self) -> Option<Vec<u8>> {
        let ext = self.find_extension(&const_oid::db::rfc5280::ID_CE_AUTHORITY_KEY_IDENTIFIER)?;
        let aki = AuthorityKeyIdentifier::from_der(ext.extn_value.as_bytes()).ok()?;
        aki.key_identifier.map(|id| id.as_bytes().to_vec())
    }

    /// The 32-byte manifest digest carried in the leaf's private extension.
    pub fn manifest_digest(&self) -> Option<[u8; 32]> {
        let ext = self.find_extension(&MANIFEST_DIGEST_OID)?;
        let octets = der::asn1::OctetString::from_der(ext.extn_value.as_bytes()).ok()?;
        let bytes = octets.as_bytes();
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Some(out)
    }

    /// Verify that this certificate's signature was produced by `issuer`.
    pub fn verify_issued_by(&self, issuer: &VerifyingKey) -> Result<(), AuthError> {
        let tbs_der = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| AuthError::security(format!("cannot re-encode TBS certificate: {}", e)))?;
        let sig_bytes = self
            .inner
            .signature
            .as_bytes()
            .ok_or_else(|| AuthError::security("certificate signature is not byte-aligned"))?;
        let sig = Signature::from_der(sig_bytes)
            .map_err(|_| AuthError::security("certificate signature is not valid DER ECDSA"))?;
        issuer
            .verify(&tbs_der, &sig)
            .map_err(|_| AuthError::security("certificate signature does not verify against issuer"))
    }

    fn find_extension(&self, oid: &ObjectIdentifier) -> Option<&x509_cert::ext::Extension> {
        self.inner
            .tbs_certificate
            .extensions
            .as_ref()?
            .iter()
            .find(|ext| &ext.extn_id == oid)
    }
}

/// `verify_chain(chain, trust_anchor)` — the external X.509 chain-verify
/// routine the authentication core treats as mechanical.
pub trait CertificateChainVerifier {
    fn verify_chain(&self, chain: &[Certificate], trust_anchor: &VerifyingKey) -> Result<(), AuthError>;
}

/// Reference chain verifier: each certificate's signature must verify
/// against the next one's public key, and the last certificate's
/// signature must verify against the supplied trust anchor.
#[derive(Default)]
pub struct ReferenceChainVerifier;

impl CertificateChainVerifier for ReferenceChainVerifier {
    fn verify_chain(&self, chain: &[Certificate], trust_anchor: &VerifyingKey) -> Result<(), AuthError> {
        if chain.is_empty() {
            return Err(AuthError::security("empty certificate chain"));
        }
        for (i, cert) in chain.iter().enumerate() {
            let issuer = chain.get(i + 1).map(|c| c.public_key()).unwrap_or(trust_anchor);
            cert.verify_issued_by(issuer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_der_is_rejected() {
        let err = Certificate::from_der(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
    }

    #[test]
    fn empty_chain_is_rejected_by_reference_verifier() {
        let verifier = ReferenceChainVerifier;
        let scalar_bytes = p256::FieldBytes::from([7u8; 32]);
        let ca = p256::ecdsa::SigningKey::from_bytes(&scalar_bytes).unwrap();
        let ca_key = p256::ecdsa::VerifyingKey::from(&ca);
        let err = verifier.verify_chain(&[], &ca_key).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
    }
}
