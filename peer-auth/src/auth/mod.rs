//! KeyAuthentication: dispatch to the suite named by `ctx.suite`.

pub mod ecdsa_suite;
pub mod null_suite;
pub mod psk_suite;

use wire::{ArgReader, ArgWriter};

use crate::context::{AuthContext, SUITE_ECDHE_ECDSA, SUITE_ECDHE_NULL, SUITE_ECDHE_PSK};
use crate::error::{AuthError, Result};

pub fn key_authentication_marshal<W: ArgWriter>(ctx: &mut AuthContext, writer: &mut W) -> Result<()> {
    dispatch_guard(ctx)?;
    match ctx.suite {
        SUITE_ECDHE_NULL => null_suite::marshal(ctx, writer),
        SUITE_ECDHE_PSK => psk_suite::marshal(ctx, writer),
        SUITE_ECDHE_ECDSA => ecdsa_suite::marshal(ctx, writer),
        _ => Err(AuthError::security("unknown authentication suite")),
    }
}

pub fn key_authentication_unmarshal<R: ArgReader>(ctx: &mut AuthContext, reader: &mut R) -> Result<()> {
    dispatch_guard(ctx)?;
    match ctx.suite {
        SUITE_ECDHE_NULL => null_suite::unmarshal(ctx, reader),
        SUITE_ECDHE_PSK => psk_suite::unmarshal(ctx, reader),
        SUITE_ECDHE_ECDSA => ecdsa_suite::unmarshal(ctx, reader),
        _ => Err(AuthError::security("unknown authentication suite")),
    }
}

/// Dispatch itself re-checks the ECDSA version floor rather than relying
/// solely on `IsSuiteEnabled` (§9, redesign decision) — a caller that
/// skipped the enable check can't route around the gate this way.
fn dispatch_guard(ctx: &AuthContext) -> Result<()> {
    if ctx.suite == SUITE_ECDHE_ECDSA && !ctx.bus.is_suite_enabled(ctx.suite, ctx.version) {
        log::warn!("rejecting ECDSA suite: version floor not met or suite not enabled");
        return Err(AuthError::security("ECDSA suite not available at this protocol version"));
    }
    Ok(())
}
