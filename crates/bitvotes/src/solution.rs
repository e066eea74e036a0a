//! The consensus in terms of the round's own voters and attestations.

use {
    crate::{
        bitvote::{BitVote, WeightedBitVote},
        error::Error,
        preprocess::Preprocessed,
        search::Candidate,
        value::Value,
    },
    itertools::Itertools,
    num::BigUint,
    serde::Serialize,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusSolution {
    /// Indexed like the votes passed to [`crate::consensus`].
    pub participants: Vec<bool>,
    /// Indexed like the fees passed to [`crate::consensus`].
    pub solution: Vec<bool>,
    pub value: Value,
    /// Whether the search covered its whole space within the budget.
    pub optimal: bool,
}

impl ConsensusSolution {
    /// Nobody participates and nothing is included.
    pub fn empty(voters: usize, attestations: usize) -> Self {
        Self {
            participants: vec![false; voters],
            solution: vec![false; attestations],
            value: Value::default(),
            optimal: true,
        }
    }

    /// Expands an assignment over aggregated entries back to the original
    /// voters and attestations. Filtered entries take the filter's decision.
    pub(crate) fn assemble(
        voters: usize,
        attestations: usize,
        problem: &Preprocessed,
        candidate: &Candidate,
        optimal: bool,
    ) -> Self {
        let mut participants = vec![false; voters];
        let chosen_voters = candidate
            .participants
            .iter()
            .positions(|participates| *participates)
            .flat_map(|vote| &problem.votes[vote].indexes);
        for &voter in problem.filter.removed_ones.iter().chain(chosen_voters) {
            participants[voter] = true;
        }

        let mut solution = vec![false; attestations];
        let chosen_fees = candidate
            .solution
            .iter()
            .positions(|included| *included)
            .flat_map(|fee| &problem.fees[fee].indexes);
        for &attestation in problem.filter.included.iter().chain(chosen_fees) {
            solution[attestation] = true;
        }

        Self {
            participants,
            solution,
            value: candidate.value.clone(),
            optimal,
        }
    }

    /// The chosen attestations as a bit vote, ready to be encoded.
    pub fn bit_vote(&self) -> Result<BitVote, Error> {
        BitVote::from_statuses(&self.solution)
    }

    /// Opaque indexes of the participating voters.
    pub fn participating_voters<'a>(
        &'a self,
        votes: &'a [WeightedBitVote],
    ) -> impl Iterator<Item = usize> + 'a {
        self.participants
            .iter()
            .positions(|participates| *participates)
            .map(|position| votes[position].index())
    }

    pub fn participating_weight(&self, votes: &[WeightedBitVote]) -> u64 {
        votes
            .iter()
            .zip(&self.participants)
            .filter(|(_, participates)| **participates)
            .map(|(vote, _)| vote.weight())
            .sum()
    }

    /// Value computed from the original votes and fees, without any of the
    /// preprocessing shortcuts.
    pub fn value_from_votes(
        &self,
        votes: &[WeightedBitVote],
        fees: &[BigUint],
        total_weight: u64,
    ) -> Value {
        let fee_sum: BigUint = fees
            .iter()
            .zip(&self.solution)
            .filter(|(_, included)| **included)
            .map(|(fee, _)| fee)
            .sum();
        Value::new(&fee_sum, self.participating_weight(votes), total_weight)
    }

    /// Whether every participant confirms every chosen attestation.
    pub fn is_supported(&self, votes: &[WeightedBitVote]) -> bool {
        let chosen: Vec<usize> = self.solution.iter().positions(|included| *included).collect();
        votes
            .iter()
            .zip(&self.participants)
            .filter(|(_, participates)| **participates)
            .all(|(vote, _)| chosen.iter().all(|&attestation| vote.confirms(attestation)))
    }

    /// Sets the consensus flag of every attestation of the round.
    pub fn apply(&self, consensus: &mut [bool]) {
        for (flag, included) in consensus.iter_mut().zip(&self.solution) {
            *flag = *included;
        }
    }
}
