//! Typed argument marshaling for the peer-authentication handshake.
//!
//! The real host message framework is a full typed reader/writer over an
//! arbitrary type-signature grammar (structs, arrays, variants, containers
//! opened and closed in lockstep on both sides). That framework is out of
//! scope here (see the crate-level spec) — what the authentication core
//! actually touches is a handful of fixed argument shapes, each named after
//! the host framework's own signature syntax (`ay`, `(yay)`, `(ayay)`,
//! `(vyv)`). This crate models exactly those shapes as traits, plus a
//! reference in-memory codec that implements them well enough to drive a
//! handshake end to end in tests.

use std::fmt;
use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// A framework-level failure: the bytes on the wire didn't have the shape
/// the caller asked to read, or the underlying transport failed outright.
/// This is distinct from a *security* failure — the authentication core
/// decides which of its calls convert a `FrameworkError` into a protocol
/// failure and which propagate it untouched.
#[derive(Debug)]
pub enum FrameworkError {
    /// The underlying reader/writer returned an I/O error.
    Io(io::Error),
    /// The bytes did not decode as the argument shape that was requested.
    UnexpectedShape(&'static str),
    /// Fewer bytes remained than the declared length prefix promised.
    Truncated,
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameworkError::Io(e) => write!(f, "wire io error: {}", e),
            FrameworkError::UnexpectedShape(sig) => {
                write!(f, "wire argument did not match expected shape {}", sig)
            }
            FrameworkError::Truncated => write!(f, "wire argument truncated"),
        }
    }
}

impl std::error::Error for FrameworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameworkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FrameworkError {
    fn from(e: io::Error) -> Self {
        FrameworkError::Io(e)
    }
}

/// The on-wire signature tag written ahead of every argument, so a reader
/// can reject a structurally wrong message before trying to interpret it.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[repr(u8)]
enum Shape {
    /// `ay` — a single byte array.
    ByteArray = 1,
    /// `(yay)` — a byte followed by a byte array.
    CurveAndBytes = 2,
    /// `(ayay)` — two byte arrays.
    HintAndVerifier = 3,
    /// `(vyv)` — signature, cert format byte, cert chain.
    EcdsaAuth = 4,
}

/// An ECDSA authentication payload: `(vyv)` = signature variant, format
/// byte, certificate-chain variant.
#[derive(Debug, Clone)]
pub struct EcdsaAuthPayload {
    pub sig_fmt: u8,
    pub sig_r: Vec<u8>,
    pub sig_s: Vec<u8>,
    pub cert_fmt: u8,
    /// DER-encoded certificates, leaf first.
    pub certs: Vec<Vec<u8>>,
}

/// Writer side of the message framework, as seen by the authentication core.
pub trait ArgWriter {
    /// `v "ay"` — marshal a single byte array behind a variant.
    fn write_byte_array(&mut self, data: &[u8]) -> Result<(), FrameworkError>;

    /// `v "(yay)"` — marshal a curve id followed by a byte array.
    fn write_curve_and_bytes(&mut self, curve: u8, data: &[u8]) -> Result<(), FrameworkError>;

    /// `v "(ayay)"` — marshal a hint and a verifier, each a byte array.
    fn write_hint_and_verifier(
        &mut self,
        hint: &[u8],
        verifier: &[u8],
    ) -> Result<(), FrameworkError>;

    /// `v "(vyv)"` — marshal an ECDSA signature, cert format byte, and cert chain.
    fn write_ecdsa_auth(&mut self, payload: &EcdsaAuthPayload) -> Result<(), FrameworkError>;
}

/// Reader side of the message framework, as seen by the authentication core.
pub trait ArgReader {
    fn read_byte_array(&mut self) -> Result<Vec<u8>, FrameworkError>;
    fn read_curve_and_bytes(&mut self) -> Result<(u8, Vec<u8>), FrameworkError>;
    fn read_hint_and_verifier(&mut self) -> Result<(Vec<u8>, Vec<u8>), FrameworkError>;
    fn read_ecdsa_auth(&mut self) -> Result<EcdsaAuthPayload, FrameworkError>;
}

/// Reference in-memory codec: a growable byte buffer written to, and read
/// back from, in the same shape-tagged framing described above.
#[derive(Default, Clone)]
pub struct MessageBuffer {
    bytes: Vec<u8>,
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MessageBuffer({})", hex::encode(&self.bytes))
    }
}

impl MessageBuffer {
    pub fn new() -> Self {
        MessageBuffer { bytes: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn cursor(&self) -> MessageCursor<'_> {
        MessageCursor { bytes: &self.bytes, pos: 0 }
    }

    fn write_shape(&mut self, shape: Shape) {
        self.bytes.push(shape as u8);
    }

    fn write_blob(&mut self, data: &[u8]) -> Result<(), FrameworkError> {
        self.bytes.write_u32::<BigEndian>(data.len() as u32)?;
        self.bytes.extend_from_slice(data);
        Ok(())
    }
}

impl ArgWriter for MessageBuffer {
    fn write_byte_array(&mut self, data: &[u8]) -> Result<(), FrameworkError> {
        self.write_shape(Shape::ByteArray);
        self.write_blob(data)
    }

    fn write_curve_and_bytes(&mut self, curve: u8, data: &[u8]) -> Result<(), FrameworkError> {
        self.write_shape(Shape::CurveAndBytes);
        self.bytes.push(curve);
        self.write_blob(data)
    }

    fn write_hint_and_verifier(
        &mut self,
        hint: &[u8],
        verifier: &[u8],
    ) -> Result<(), FrameworkError> {
        self.write_shape(Shape::HintAndVerifier);
        self.write_blob(hint)?;
        self.write_blob(verifier)
    }

    fn write_ecdsa_auth(&mut self, payload: &EcdsaAuthPayload) -> Result<(), FrameworkError> {
        self.write_shape(Shape::EcdsaAuth);
        self.bytes.push(payload.sig_fmt);
        self.write_blob(&payload.sig_r)?;
        self.write_blob(&payload.sig_s)?;
        self.bytes.push(payload.cert_fmt);
        self.bytes
            .write_u32::<BigEndian>(payload.certs.len() as u32)?;
        for cert in &payload.certs {
            self.write_blob(cert)?;
        }
        Ok(())
    }
}

/// Read-only cursor over a [`MessageBuffer`]'s bytes.
pub struct MessageCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> MessageCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        MessageCursor { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FrameworkError> {
        if self.bytes.len() - self.pos < len {
            return Err(FrameworkError::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_byte(&mut self) -> Result<u8, FrameworkError> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32, FrameworkError> {
        let mut rest = self.take(4)?;
        Ok(rest.read_u32::<BigEndian>()?)
    }

    fn take_blob(&mut self) -> Result<Vec<u8>, FrameworkError> {
        let len = self.take_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn expect_shape(&mut self, want: Shape, name: &'static str) -> Result<(), FrameworkError> {
        let got = self.take_byte()?;
        if got != want as u8 {
            return Err(FrameworkError::UnexpectedShape(name));
        }
        Ok(())
    }
}

impl<'a> ArgReader for MessageCursor<'a> {
    fn read_byte_array(&mut self) -> Result<Vec<u8>, FrameworkError> {
        self.expect_shape(Shape::ByteArray, "ay")?;
        self.take_blob()
    }

    fn read_curve_and_bytes(&mut self) -> Result<(u8, Vec<u8>), FrameworkError> {
        self.expect_shape(Shape::CurveAndBytes, "(yay)")?;
        let curve = self.take_byte()?;
        let data = self.take_blob()?;
        Ok((curve, data))
    }

    fn read_hint_and_verifier(&mut self) -> Result<(Vec<u8>, Vec<u8>), FrameworkError> {
        self.expect_shape(Shape::HintAndVerifier, "(ayay)")?;
        let hint = self.take_blob()?;
        let verifier = self.take_blob()?;
        Ok((hint, verifier))
    }

    fn read_ecdsa_auth(&mut self) -> Result<EcdsaAuthPayload, FrameworkError> {
        self.expect_shape(Shape::EcdsaAuth, "(vyv)")?;
        let sig_fmt = self.take_byte()?;
        let sig_r = self.take_blob()?;
        let sig_s = self.take_blob()?;
        let cert_fmt = self.take_byte()?;
        let count = self.take_u32()? as usize;
        let mut certs = Vec::with_capacity(count);
        for _ in 0..count {
            certs.push(self.take_blob()?);
        }
        Ok(EcdsaAuthPayload {
            sig_fmt,
            sig_r,
            sig_s,
            cert_fmt,
            certs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_array_round_trips() {
        let mut buf = MessageBuffer::new();
        buf.write_byte_array(b"hello").unwrap();
        let mut cursor = buf.cursor();
        assert_eq!(cursor.read_byte_array().unwrap(), b"hello".to_vec());
    }

    #[test]
    fn curve_and_bytes_round_trips() {
        let mut buf = MessageBuffer::new();
        buf.write_curve_and_bytes(7, &[1, 2, 3]).unwrap();
        let mut cursor = buf.cursor();
        assert_eq!(cursor.read_curve_and_bytes().unwrap(), (7, vec![1, 2, 3]));
    }

    #[test]
    fn hint_and_verifier_round_trips() {
        let mut buf = MessageBuffer::new();
        buf.write_hint_and_verifier(b"dev-1", &[9; 32]).unwrap();
        let mut cursor = buf.cursor();
        let (hint, verifier) = cursor.read_hint_and_verifier().unwrap();
        assert_eq!(hint, b"dev-1".to_vec());
        assert_eq!(verifier, vec![9; 32]);
    }

    #[test]
    fn ecdsa_auth_round_trips() {
        let payload = EcdsaAuthPayload {
            sig_fmt: 0,
            sig_r: vec![1; 32],
            sig_s: vec![2; 32],
            cert_fmt: 0,
            certs: vec![vec![0xDE, 0xAD], vec![0xBE, 0xEF]],
        };
        let mut buf = MessageBuffer::new();
        buf.write_ecdsa_auth(&payload).unwrap();
        let mut cursor = buf.cursor();
        let decoded = cursor.read_ecdsa_auth().unwrap();
        assert_eq!(decoded.sig_r, payload.sig_r);
        assert_eq!(decoded.sig_s, payload.sig_s);
        assert_eq!(decoded.certs, payload.certs);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut buf = MessageBuffer::new();
        buf.write_byte_array(b"hello").unwrap();
        let mut cursor = buf.cursor();
        match cursor.read_curve_and_bytes() {
            Err(FrameworkError::UnexpectedShape(_)) => {}
            other => panic!("expected UnexpectedShape, got {:?}", other),
        }
    }

    #[test]
    fn truncated_read_is_rejected() {
        let mut bytes = MessageBuffer::new();
        bytes.write_byte_array(b"hello").unwrap();
        let mut bytes = bytes.into_bytes();
        bytes.truncate(bytes.len() - 2);
        let mut cursor = MessageCursor::new(&bytes);
        match cursor.read_byte_array() {
            Err(FrameworkError::Truncated) => {}
            other => panic!("expected Truncated, got {:?}", other),
        }
    }
}
