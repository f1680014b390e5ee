//! ECDHE key exchange: the only key-exchange family this core knows.
//!
//! Two wire layouts exist depending on protocol version (§4.3): the legacy
//! v1 layout feeds the *full* shared-secret point (X‖Y) to master-secret
//! derivation, while v2 hashes just the X coordinate first. `p256`'s usual
//! `ecdh::diffie_hellman` only ever exposes X (the RFC convention, and all
//! v2 needs) — v1 needs the same scalar multiplication `diffie_hellman`
//! does internally, done by hand so the Y coordinate survives.

use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, PublicKey, SecretKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use wire::{ArgReader, ArgWriter};

use crate::context::{AuthContext, CURVE_NIST_P256, FIELD_BYTES, KEY_EXCHANGE_ECDHE};
use crate::error::{AuthError, Result};
use crate::prf;

fn ensure_local_keypair(ctx: &mut AuthContext) {
    if ctx.kectx.local_secret().is_none() {
        ctx.kectx.set_local_secret(SecretKey::random(&mut OsRng));
    }
}

fn encode_public_key(secret: &SecretKey) -> ([u8; FIELD_BYTES], [u8; FIELD_BYTES]) {
    let encoded = secret.public_key().to_encoded_point(false);
    let mut x = [0u8; FIELD_BYTES];
    let mut y = [0u8; FIELD_BYTES];
    x.copy_from_slice(encoded.x().expect("uncompressed point has x"));
    y.copy_from_slice(encoded.y().expect("uncompressed point has y"));
    (x, y)
}

fn decode_public_key(x: &[u8], y: &[u8]) -> Result<PublicKey> {
    let encoded = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(x),
        FieldBytes::from_slice(y),
        false,
    );
    Option::from(PublicKey::from_encoded_point(&encoded))
        .ok_or_else(|| AuthError::security("ECDHE public key is not a point on the curve"))
}

/// The shared-secret point, computed the same way `diffie_hellman` does
/// internally but stopping one step short so both X and Y survive.
fn shared_point(local: &SecretKey, peer: &PublicKey) -> AffinePoint {
    let public_point = ProjectivePoint::from(*peer.as_affine());
    (public_point * *local.to_nonzero_scalar()).to_affine()
}

fn check_family(ctx: &AuthContext) -> Result<()> {
    if ctx.key_exchange_family() != KEY_EXCHANGE_ECDHE {
        log::warn!("unknown key-exchange family in suite 0x{:08x}", ctx.suite);
        return Err(AuthError::security("unknown key-exchange family"));
    }
    Ok(())
}

/// Emit this side's ephemeral public key, generating the keypair first if
/// it hasn't been generated yet (eagerly for the client, lazily for the
/// server once it has processed the client's message).
pub fn key_exchange_marshal<W: ArgWriter>(ctx: &mut AuthContext, writer: &mut W) -> Result<()> {
    log::debug!("KeyExchangeMarshal suite=0x{:08x}", ctx.suite);
    check_family(ctx)?;
    ensure_local_keypair(ctx);

    let (x, y) = encode_public_key(ctx.kectx.local_secret().expect("keypair just ensured"));

    if ctx.is_v2() {
        let mut data = Vec::with_capacity(2 * FIELD_BYTES);
        data.extend_from_slice(&x);
        data.extend_from_slice(&y);
        writer.write_curve_and_bytes(CURVE_NIST_P256, &data)?;
        ctx.transcript.update(&[CURVE_NIST_P256]);
        ctx.transcript.update(&data);
    } else {
        let mut data = Vec::with_capacity(1 + 2 * FIELD_BYTES);
        data.push(CURVE_NIST_P256);
        data.extend_from_slice(&x);
        data.extend_from_slice(&y);
        writer.write_byte_array(&data)?;
        ctx.transcript.update(&data);
    }
    Ok(())
}

/// Parse the peer's public key, derive the shared ECDH point, and feed the
/// version-appropriate encoding into master-secret derivation.
pub fn key_exchange_unmarshal<R: ArgReader>(ctx: &mut AuthContext, reader: &mut R) -> Result<()> {
    log::debug!("KeyExchangeUnmarshal suite=0x{:08x}", ctx.suite);
    check_family(ctx)?;
    ensure_local_keypair(ctx);

    let (curve, xy) = if ctx.is_v2() {
        let (curve, data) = reader.read_curve_and_bytes()?;
        ctx.transcript.update(&[curve]);
        ctx.transcript.update(&data);
        (curve, data)
    } else {
        let data = reader.read_byte_array()?;
        if data.len() != 1 + 2 * FIELD_BYTES {
            log::warn!("ECDHE v1 payload has wrong length {}", data.len());
            return Err(AuthError::security("ECDHE v1 payload has wrong length"));
        }
        ctx.transcript.update(&data);
        let curve = data[0];
        (curve, data[1..].to_vec())
    };

    if curve != CURVE_NIST_P256 {
        log::warn!("ECDHE payload names unsupported curve id {}", curve);
        return Err(AuthError::security("unsupported curve id"));
    }
    if xy.len() != 2 * FIELD_BYTES {
        return Err(AuthError::security("ECDHE public key has wrong length"));
    }

    let peer_public = decode_public_key(&xy[..FIELD_BYTES], &xy[FIELD_BYTES..])?;
    let is_v2 = ctx.is_v2();
    let pms = {
        let local_secret = ctx.kectx.local_secret().expect("keypair just ensured");
        let shared = shared_point(local_secret, &peer_public);
        let shared_encoded = shared.to_encoded_point(false);
        let shared_x =
            shared_encoded.x().ok_or_else(|| AuthError::security("degenerate ECDH result"))?;
        if is_v2 {
            Sha256::digest(shared_x).to_vec()
        } else {
            let shared_y = shared_encoded
                .y()
                .ok_or_else(|| AuthError::security("degenerate ECDH result"))?;
            let mut v = Vec::with_capacity(2 * FIELD_BYTES);
            v.extend_from_slice(shared_x);
            v.extend_from_slice(shared_y);
            v
        }
    };

    ctx.mastersecret = Some(prf::compute_master_secret(&pms));
    ctx.kectx.take_and_clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Role, SUITE_ECDHE_NULL};
    use crate::support::keystore::MemoryKeystore;
    use crate::support::x509::ReferenceChainVerifier;
    use crate::registry::{Bus, SuiteRegistry};
    use wire::MessageBuffer;

    struct TestBus {
        registry: SuiteRegistry,
        keystore: MemoryKeystore,
        verifier: ReferenceChainVerifier,
    }

    impl Bus for TestBus {
        fn registry(&self) -> &SuiteRegistry {
            &self.registry
        }
        fn listener(&self) -> Option<&dyn crate::support::listener::AuthListener> {
            None
        }
        fn password_callback(&self) -> Option<&dyn crate::support::listener::PasswordCallback> {
            None
        }
        fn keystore(&self) -> &dyn crate::support::keystore::Keystore {
            &self.keystore
        }
        fn certificate_verifier(&self) -> &dyn crate::support::x509::CertificateChainVerifier {
            &self.verifier
        }
    }

    fn test_bus() -> TestBus {
        TestBus {
            registry: SuiteRegistry::new(),
            keystore: MemoryKeystore::new(),
            verifier: ReferenceChainVerifier,
        }
    }

    #[test]
    fn v2_round_trip_agrees_on_master_secret() {
        let bus = test_bus();
        let mut client = AuthContext::new(Role::Client, 0x0003_0000, SUITE_ECDHE_NULL, &bus);
        let mut server = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_NULL, &bus);

        let mut client_msg = MessageBuffer::new();
        key_exchange_marshal(&mut client, &mut client_msg).unwrap();
        let mut cursor = client_msg.cursor();
        key_exchange_unmarshal(&mut server, &mut cursor).unwrap();

        let mut server_msg = MessageBuffer::new();
        key_exchange_marshal(&mut server, &mut server_msg).unwrap();
        let mut cursor = server_msg.cursor();
        key_exchange_unmarshal(&mut client, &mut cursor).unwrap();

        assert_eq!(client.mastersecret, server.mastersecret);
        assert!(client.mastersecret.is_some());
    }

    #[test]
    fn v1_round_trip_agrees_on_master_secret() {
        let bus = test_bus();
        let mut client = AuthContext::new(Role::Client, 0x0002_0000, SUITE_ECDHE_NULL, &bus);
        let mut server = AuthContext::new(Role::Server, 0x0002_0000, SUITE_ECDHE_NULL, &bus);

        let mut client_msg = MessageBuffer::new();
        key_exchange_marshal(&mut client, &mut client_msg).unwrap();
        let mut cursor = client_msg.cursor();
        key_exchange_unmarshal(&mut server, &mut cursor).unwrap();

        let mut server_msg = MessageBuffer::new();
        key_exchange_marshal(&mut server, &mut server_msg).unwrap();
        let mut cursor = server_msg.cursor();
        key_exchange_unmarshal(&mut client, &mut cursor).unwrap();

        assert_eq!(client.mastersecret, server.mastersecret);
    }

    #[test]
    fn wrong_curve_byte_is_rejected_before_any_ecdh() {
        let bus = test_bus();
        let mut server = AuthContext::new(Role::Server, 0x0003_0000, SUITE_ECDHE_NULL, &bus);
        let mut msg = MessageBuffer::new();
        let bogus = vec![0xFFu8; 2 * FIELD_BYTES];
        msg.write_curve_and_bytes(0x00, &bogus).unwrap();
        let mut cursor = msg.cursor();
        let err = key_exchange_unmarshal(&mut server, &mut cursor).unwrap_err();
        assert!(matches!(err, AuthError::Security(_)));
        assert!(server.mastersecret.is_none());
    }
}
