//! A convenience driver that runs both handshake phases over an
//! `io::Read + io::Write` transport for one role, paralleling
//! `brontide::Machine::handshake`. Not required to use the core — the
//! four dispatch entry points in [`crate::auth`] and [`crate::kex`] are
//! the real API surface — but useful for tests and simple callers.

use std::io::{self, Read, Write};

use p256::ecdsa::VerifyingKey;
use wire::{MessageBuffer, MessageCursor};

use crate::auth::{key_authentication_marshal, key_authentication_unmarshal};
use crate::context::{AuthContext, Expiration, KeyAuthState, Role, MASTER_SECRET_LEN};
use crate::error::{AuthError, Result};
use crate::kex::{key_exchange_marshal, key_exchange_unmarshal};

/// What a completed handshake yields: the negotiated master secret, the
/// listener-reported expiration, and, for ECDSA, the peer's manifest
/// digest and public-key chain.
pub struct HandshakeOutcome {
    pub master_secret: [u8; MASTER_SECRET_LEN],
    pub expiration: Expiration,
    pub peer_manifest: Option<[u8; 32]>,
    pub peer_keys: Vec<VerifyingKey>,
}

fn write_frame<T: Write>(transport: &mut T, bytes: &[u8]) -> io::Result<()> {
    transport.write_all(&(bytes.len() as u32).to_be_bytes())?;
    transport.write_all(bytes)
}

fn read_frame<T: Read>(transport: &mut T) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    transport.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; len];
    transport.read_exact(&mut buf)?;
    Ok(buf)
}

fn send<T, F>(ctx: &mut AuthContext, transport: &mut T, marshal: F) -> Result<()>
where
    T: Write,
    F: FnOnce(&mut AuthContext, &mut MessageBuffer) -> Result<()>,
{
    let mut msg = MessageBuffer::new();
    marshal(ctx, &mut msg)?;
    write_frame(transport, msg.as_bytes()).map_err(AuthError::from)
}

fn recv<T, F>(ctx: &mut AuthContext, transport: &mut T, unmarshal: F) -> Result<()>
where
    T: Read,
    F: FnOnce(&mut AuthContext, &mut MessageCursor<'_>) -> Result<()>,
{
    let bytes = read_frame(transport).map_err(AuthError::from)?;
    let mut cursor = MessageCursor::new(&bytes);
    unmarshal(ctx, &mut cursor)
}

/// Run both handshake phases for `ctx.role` over `transport`. The caller
/// is responsible for running the other side, typically on its own
/// context against the opposite end of the same transport.
pub fn run_handshake<T: Read + Write>(ctx: &mut AuthContext, transport: &mut T) -> Result<HandshakeOutcome> {
    match ctx.role {
        Role::Client => {
            send(ctx, transport, key_exchange_marshal)?;
            recv(ctx, transport, key_exchange_unmarshal)?;
            send(ctx, transport, key_authentication_marshal)?;
            recv(ctx, transport, key_authentication_unmarshal)?;
        }
        Role::Server => {
            recv(ctx, transport, key_exchange_unmarshal)?;
            send(ctx, transport, key_exchange_marshal)?;
            recv(ctx, transport, key_authentication_unmarshal)?;
            send(ctx, transport, key_authentication_marshal)?;
        }
    }

    let master_secret = ctx.mastersecret.expect("both phases completed without error");
    let (peer_manifest, peer_keys) = match &ctx.kactx {
        KeyAuthState::Ecdsa { keys, manifest } => (*manifest, keys.clone()),
        _ => (None, Vec::new()),
    };

    Ok(HandshakeOutcome { master_secret, expiration: ctx.expiration, peer_manifest, peer_keys })
}
