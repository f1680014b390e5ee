//! PSK authentication: two listener protocols coexist (§9 "Listener
//! callback shape") — the structured v2 `authListener` and the legacy v1
//! single-blob `pwdCallback`. Whichever side resolves its credential first
//! (client in Marshal, server in Unmarshal, since the server needs the
//! client's hint before it can ask its own listener "whose PSK is this")
//! hashes `hint ‖ psk` into the transcript exactly once; the other side
//! already has matching bytes in its transcript from its own resolution.

use subtle::ConstantTimeEq;
use wire::{ArgReader, ArgWriter};

use crate::context::{AuthContext, Expiration, KeyAuthState, Role, VERIFIER_LEN};
use crate::error::{AuthError, Result};
use crate::prf;
use crate::support::listener::{CredentialDirection, CredentialField, LEGACY_PSK_MAX_LEN};

const ANONYMOUS_HINT: &[u8] = b"<anonymous>";

struct Credential {
    hint: Vec<u8>,
    psk: Vec<u8>,
    expiration: Expiration,
}

fn retrieve_client_credential(ctx: &AuthContext) -> Result<Credential> {
    if let Some(listener) = ctx.bus.listener() {
        let hint = listener.on_psk(CredentialDirection::Request, CredentialField::Hint, &[])?;
        let value = listener.on_psk(CredentialDirection::Request, CredentialField::Value, &[])?;
        Ok(Credential { hint: hint.data, psk: value.data, expiration: value.expiration })
    } else if let Some(legacy) = ctx.bus.password_callback() {
        let hint = ANONYMOUS_HINT.to_vec();
        let psk = legacy.get_password(&hint)?;
        if psk.len() > LEGACY_PSK_MAX_LEN {
            return Err(AuthError::resources("legacy PSK response exceeds 128 bytes"));
        }
        Ok(Credential { hint, psk, expiration: Expiration::Never })
    } else {
        Err(AuthError::security("no PSK listener registered"))
    }
}

fn retrieve_server_credential(ctx: &AuthContext, peer_hint: &[u8]) -> Result<Credential> {
    if let Some(listener) = ctx.bus.listener() {
        let hint =
            listener.on_psk(CredentialDirection::Response, CredentialField::Hint, peer_hint)?;
        let value = listener.on_psk(CredentialDirection::Request, CredentialField::Value, &[])?;
        Ok(Credential { hint: hint.data, psk: value.data, expiration: value.expiration })
    } else if let Some(legacy) = ctx.bus.password_callback() {
        let psk = legacy.get_password(peer_hint)?;
        if psk.len() > LEGACY_PSK_MAX_LEN {
            return Err(AuthError::resources("legacy PSK response exceeds 128 bytes"));
        }
        Ok(Credential { hint: peer_hint.to_vec(), psk, expiration: Expiration::Never })
    } else {
        Err(AuthError::security("no PSK listener registered"))
    }
}

fn record_resolution(ctx: &mut AuthContext, hint: &[u8], psk: &[u8], expiration: Expiration) {
    ctx.transcript.update(hint);
    ctx.transcript.update(psk);
    ctx.expiration = expiration;
    if let KeyAuthState::Psk { hint: stored, resolved } = &mut ctx.kactx {
        *stored = hint.to_vec();
        *resolved = true;
    }
}

fn is_resolved(ctx: &AuthContext) -> bool {
    matches!(&ctx.kactx, KeyAuthState::Psk { resolved: true, .. })
}

fn stored_hint(ctx: &AuthContext) -> Vec<u8> {
    match &ctx.kactx {
        KeyAuthState::Psk { hint, .. } => hint.clone(),
        _ => Vec::new(),
    }
}

pub fn marshal<W: ArgWriter>(ctx: &mut AuthContext, writer: &mut W) -> Result<()> {
    log::debug!("PSKMarshal role={:?}", ctx.role);
    if !is_resolved(ctx) {
        // Only the client can resolve here with nothing received yet; the
        // server resolves during Unmarshal, once it has the peer's hint.
        debug_assert_eq!(ctx.role, Role::Client);
        let cred = retrieve_client_credential(ctx)?;
        record_resolution(ctx, &cred.hint, &cred.psk, cred.expiration);
    }

    let hint = stored_hint(ctx);
    let master = ctx.mastersecret.expect("master secret set by KeyExchange");
    let digest = ctx.transcript.snapshot();
    let verifier = prf::compute_verifier(&master, ctx.role.own_label(), &digest);

    writer.write_hint_and_verifier(&hint, &verifier)?;
    ctx.transcript.update(&verifier);
    Ok(())
}

pub fn unmarshal<R: ArgReader>(ctx: &mut AuthContext, reader: &mut R) -> Result<()> {
    log::debug!("PSKUnmarshal role={:?}", ctx.role);
    let (peer_hint, received_verifier) = reader.read_hint_and_verifier()?;

    if !is_resolved(ctx) {
        debug_assert_eq!(ctx.role, Role::Server);
        // Any listener failure here is immediately terminal: we must not
        // fall through to computing/comparing a verifier on bad credential
        // state (the source's bug this corrects — see module docs).
        let cred = retrieve_server_credential(ctx, &peer_hint).map_err(|e| {
            log::warn!("PSKUnmarshal: credential retrieval failed");
            e
        })?;
        record_resolution(ctx, &cred.hint, &cred.psk, cred.expiration);
    }

    if received_verifier.len() != VERIFIER_LEN {
        log::warn!("PSKUnmarshal: verifier has wrong length {}", received_verifier.len());
        return Err(AuthError::security("verifier has wrong length"));
    }

    let master = ctx.mastersecret.expect("master secret set by KeyExchange");
    let digest = ctx.transcript.snapshot();
    let expected = prf::compute_verifier(&master, ctx.role.peer_label(), &digest);

    if expected.ct_eq(&received_verifier[..]).unwrap_u8() != 1 {
        log::warn!("PSKUnmarshal: verifier mismatch");
        return Err(AuthError::security("verifier mismatch"));
    }
    ctx.transcript.update(&received_verifier);
    Ok(())
}
