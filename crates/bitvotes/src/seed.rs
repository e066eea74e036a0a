//! Reproducible randomness for the search.
//!
//! All nodes must explore the search space in the same order, so every random
//! draw comes from a ChaCha20 stream whose seed is derived from the round id
//! alone. Only `next_u64` is consumed to keep the stream independent of any
//! sampling helper implementation.

use {
    rand::{RngCore, SeedableRng},
    rand_chacha::ChaCha20Rng,
    sha2::{Digest, Sha256},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed([u8; 32]);

impl Seed {
    const DOMAIN: &'static [u8] = b"bitvotes/consensus-seed/v1";

    /// Canonical seed of a voting round.
    pub fn for_round(round_id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(Self::DOMAIN);
        hasher.update(round_id.to_be_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0; 32];
        bytes[..8].copy_from_slice(&seed.to_be_bytes());
        Self(bytes)
    }

    pub fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(self.0)
    }
}

/// Uniformly random permutation of `0..n` (inside-out Fisher-Yates).
pub(crate) fn permutation(n: usize, rng: &mut impl RngCore) -> Vec<usize> {
    let mut permutation = vec![0; n];
    for i in 0..n {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        permutation[i] = permutation[j];
        permutation[j] = i;
    }
    permutation
}

pub(crate) fn coin_flip(rng: &mut impl RngCore) -> bool {
    rng.next_u64() & 1 == 1
}
