//! Running SHA-256 over the exact byte ranges both peers exchange.
//!
//! Every `Marshal` step that emits a wire field, and every `Unmarshal` step
//! that consumes the same field, feeds identical bytes into this in the
//! same order on both sides — that's the whole contract.

use sha2::{Digest, Sha256};

#[derive(Clone)]
pub struct Transcript {
    hasher: Sha256,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript { hasher: Sha256::new() }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Snapshot the current state into a digest without advancing it.
    pub fn snapshot(&self) -> [u8; 32] {
        let snapshot = self.hasher.clone();
        snapshot.finalize().into()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
