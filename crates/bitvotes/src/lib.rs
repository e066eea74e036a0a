//! Consensus BitVote computation.
//!
//! Every voter of a round broadcasts a bit vector marking the attestation
//! requests it could confirm. Each node then independently computes the same
//! consensus BitVote: a set of attestations whose supporting voters hold more
//! than half of the total weight and whose fees (times supporting weight) are
//! as large as the operation budget allows to find. There is no further
//! communication round, so the computation is fully deterministic for a given
//! input and seed.

pub mod bitvote;
pub mod ensemble;
pub mod error;
pub mod preprocess;
pub mod round;
pub mod search;
pub mod seed;
pub mod solution;
pub mod value;

// Re-export key types for convenience
pub use {
    bitvote::{BitVote, WeightedBitVote},
    ensemble::{Config, consensus},
    error::Error,
    preprocess::{AggregatedFee, AggregatedVote, FilterResults, Preprocessed},
    round::{Message, Round},
    search::{Candidate, Strategy},
    seed::Seed,
    solution::ConsensusSolution,
    value::Value,
};
