//! Collects the bit votes submitted for one voting round.

use {
    crate::{
        bitvote::{self, BitVote, WeightedBitVote},
        ensemble::{self, Config},
        error::Error,
        seed::Seed,
        solution::ConsensusSolution,
    },
    num::BigUint,
    serde::Deserialize,
    std::collections::BTreeMap,
};

/// A bit vote as submitted by a voter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Message {
    /// Position of the sender in the round's signing policy.
    pub from: usize,
    pub voting_round: u64,
    /// Hex encoded bit vote, see [`BitVote::encode_hex`].
    pub payload: String,
}

#[derive(Debug, Clone)]
pub struct Round {
    id: u64,
    weights: Vec<u64>,
    total_weight: u64,
    /// Latest valid vote per voter.
    votes: BTreeMap<usize, WeightedBitVote>,
}

impl Round {
    /// `weights` holds the weight of every eligible voter, indexed by its
    /// signing policy position. Their sum has to fit into a `u64`.
    pub fn new(id: u64, weights: Vec<u64>) -> Result<Self, Error> {
        let total_weight = weights
            .iter()
            .try_fold(0u64, |total, weight| total.checked_add(*weight))
            .ok_or(Error::TotalWeightOverflow)?;
        Ok(Self {
            id,
            weights,
            total_weight,
            votes: Default::default(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Weight of every eligible voter, whether it voted or not.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Collected votes in signing policy order.
    pub fn votes(&self) -> impl Iterator<Item = &WeightedBitVote> {
        self.votes.values()
    }

    /// Records a voter's bit vote, replacing any earlier one of that voter.
    pub fn process_bit_vote(&mut self, message: &Message) -> Result<(), Error> {
        if message.voting_round != self.id {
            return Err(Error::WrongRound {
                expected: self.id,
                actual: message.voting_round,
            });
        }
        let weight = *self
            .weights
            .get(message.from)
            .ok_or(Error::UnknownVoter(message.from))?;
        let (bit_vote, round_check) = BitVote::decode_hex(&message.payload)?;
        let expected = bitvote::round_check(self.id);
        if round_check != expected {
            return Err(Error::RoundCheck {
                expected,
                actual: round_check,
            });
        }
        let vote = WeightedBitVote::new(message.from, weight, bit_vote)?;
        if self.votes.insert(message.from, vote).is_some() {
            tracing::debug!(round = self.id, voter = message.from, "replaced bit vote");
        }
        Ok(())
    }

    /// Runs the consensus over the collected votes. Votes that do not cover
    /// exactly the round's attestations are left out.
    pub fn compute_consensus(
        &self,
        fees: &[BigUint],
        config: &Config,
    ) -> Result<(Vec<WeightedBitVote>, ConsensusSolution), Error> {
        let votes: Vec<WeightedBitVote> = self
            .votes()
            .filter(|vote| {
                let matches = usize::from(vote.bit_vote().length()) == fees.len();
                if !matches {
                    tracing::warn!(
                        round = self.id,
                        voter = vote.index(),
                        length = vote.bit_vote().length(),
                        expected = fees.len(),
                        "ignoring bit vote of wrong length"
                    );
                }
                matches
            })
            .cloned()
            .collect();
        let solution = ensemble::consensus(
            &votes,
            fees,
            self.total_weight(),
            config,
            &Seed::for_round(self.id),
        )?;
        Ok((votes, solution))
    }
}
