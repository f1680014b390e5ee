//! NULL authentication: no credential material, just a mutual proof that
//! both sides reached the same master secret and transcript.

use subtle::ConstantTimeEq;
use wire::{ArgReader, ArgWriter};

use crate::context::{AuthContext, VERIFIER_LEN};
use crate::error::{AuthError, Result};
use crate::prf;

pub fn marshal<W: ArgWriter>(ctx: &mut AuthContext, writer: &mut W) -> Result<()> {
    log::debug!("NULLMarshal");
    let master = ctx.mastersecret.expect("master secret set by KeyExchange");
    let digest = ctx.transcript.snapshot();
    let verifier = prf::compute_verifier(&master, ctx.role.own_label(), &digest);
    writer.write_byte_array(&verifier)?;
    ctx.transcript.update(&verifier);
    Ok(())
}

pub fn unmarshal<R: ArgReader>(ctx: &mut AuthContext, reader: &mut R) -> Result<()> {
    log::debug!("NULLUnmarshal");
    let master = ctx.mastersecret.expect("master secret set by KeyExchange");
    let digest = ctx.transcript.snapshot();
    let expected = prf::compute_verifier(&master, ctx.role.peer_label(), &digest);

    let received = reader.read_byte_array().map_err(|e| {
        log::warn!("NULLUnmarshal: framework error reading verifier");
        AuthError::security(format!("malformed NULL verifier: {}", e))
    })?;

    if received.len() != VERIFIER_LEN {
        log::warn!("NULLUnmarshal: verifier has wrong length {}", received.len());
        return Err(AuthError::security("verifier has wrong length"));
    }
    if expected.ct_eq(&received[..]).unwrap_u8() != 1 {
        log::warn!("NULLUnmarshal: verifier mismatch");
        return Err(AuthError::security("verifier mismatch"));
    }
    ctx.transcript.update(&received);
    Ok(())
}
