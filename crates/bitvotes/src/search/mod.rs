//! Budgeted branch and bound over the preprocessed problem.
//!
//! Two dual formulations exist: branching over attestations (deciding which
//! attestations to include and tracking the voters that still support them)
//! and branching over voters (deciding which voters participate and tracking
//! the attestations they all confirm). Both share the same bookkeeping in
//! [`Status`] and the same join rule in [`join`].

use {
    crate::{preprocess::Preprocessed, seed, seed::Seed, value::Value},
    num::BigUint,
    rand_chacha::ChaCha20Rng,
};

mod attestations;
mod voters;

/// Which dimension the branch and bound search branches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Attestations,
    Voters,
}

impl Strategy {
    /// Both strategies, the one with the smaller branching dimension first.
    pub fn order(problem: &Preprocessed) -> [Self; 2] {
        if problem.votes.len() < problem.fees.len() {
            [Self::Voters, Self::Attestations]
        } else {
            [Self::Attestations, Self::Voters]
        }
    }

    /// Searches for the best assignment whose value is at least
    /// `initial_bound`, spending at most `max_operations` operations.
    pub fn run(
        self,
        problem: &Preprocessed,
        max_operations: u64,
        seed: &Seed,
        initial_bound: Value,
    ) -> Outcome {
        let status = Status::new(problem, max_operations, seed, initial_bound);
        let outcome = match self {
            Self::Attestations => attestations::search(status),
            Self::Voters => voters::search(status),
        };
        tracing::debug!(
            strategy = ?self,
            operations = outcome.operations,
            optimal = outcome.optimal,
            value = ?outcome.candidate.as_ref().map(|candidate| &candidate.value),
            "branch and bound finished"
        );
        outcome
    }
}

/// An assignment in the aggregated index space. Every participant confirms
/// every attestation of the solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Indexed like [`Preprocessed::votes`].
    pub participants: Vec<bool>,
    /// Indexed like [`Preprocessed::fees`].
    pub solution: Vec<bool>,
    pub value: Value,
}

impl Candidate {
    /// Every remaining voter participates, no remaining attestation is
    /// included.
    pub fn everybody(problem: &Preprocessed) -> Self {
        Self {
            participants: vec![true; problem.votes.len()],
            solution: vec![false; problem.fees.len()],
            value: problem.value(&problem.filter.guaranteed_fees, problem.participation_weight()),
        }
    }

    /// Greedily extends the assignment: first adds every attestation all
    /// participants confirm, then every voter confirming all included
    /// attestations. Never lowers the value and is idempotent.
    pub fn complete(&mut self, problem: &Preprocessed) {
        for (fee, included) in self.solution.iter_mut().enumerate() {
            if !*included {
                *included = self
                    .participants
                    .iter()
                    .zip(&problem.votes)
                    .all(|(participates, vote)| !participates || vote.confirms(fee));
            }
        }
        for (vote, participates) in problem.votes.iter().zip(self.participants.iter_mut()) {
            if !*participates {
                *participates = self
                    .solution
                    .iter()
                    .enumerate()
                    .all(|(fee, included)| !included || vote.confirms(fee));
            }
        }
        self.value = problem.value_of(self);
    }
}

/// Result of a single branch and bound run.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Best assignment found, `None` if nothing beat the initial bound or no
    /// coalition can reach a majority.
    pub candidate: Option<Candidate>,
    /// Whether the whole search space was covered within the budget.
    pub optimal: bool,
    pub operations: u64,
}

/// State shared by all nodes of one search run.
struct Status<'a> {
    problem: &'a Preprocessed,
    /// Value of the best leaf seen so far.
    bound: Value,
    operations: u64,
    max_operations: u64,
    rng: ChaCha20Rng,
}

impl<'a> Status<'a> {
    fn new(
        problem: &'a Preprocessed,
        max_operations: u64,
        seed: &Seed,
        initial_bound: Value,
    ) -> Self {
        Self {
            problem,
            bound: initial_bound,
            operations: 0,
            max_operations,
            rng: seed.rng(),
        }
    }

    fn majority_threshold(&self) -> u64 {
        self.problem.majority_threshold()
    }

    /// Evaluates a leaf and raises the bound if it is improved. `None` if the
    /// leaf is worse than the bound. Leaves are evaluated even when the budget
    /// is used up.
    fn leaf_value(&mut self, fee_sum: &BigUint, weight: u64) -> Option<Value> {
        assert!(
            weight <= self.problem.total_weight,
            "coalition weight {weight} exceeds the total weight {}",
            self.problem.total_weight
        );
        let value = self.problem.value(fee_sum, weight);
        if value < self.bound {
            return None;
        }
        self.bound = value.clone();
        Some(value)
    }

    /// Whether to stop at an inner node, either because the budget is used up
    /// or because even its optimistic value can not reach the bound.
    fn prune(&self, fee_sum: &BigUint, weight: u64) -> bool {
        self.operations >= self.max_operations || self.problem.value(fee_sum, weight) < self.bound
    }

    fn coin_flip(&mut self) -> bool {
        seed::coin_flip(&mut self.rng)
    }

    fn finish(self, candidate: Option<Candidate>) -> Outcome {
        Outcome {
            candidate,
            optimal: self.operations < self.max_operations,
            operations: self.operations,
        }
    }
}

/// Picks the better of the two branches of a node. Returns the winner and
/// whether it is the including branch. On equal value the excluding branch
/// wins.
fn join(excluded: Option<Candidate>, included: Option<Candidate>) -> Option<(Candidate, bool)> {
    match (excluded, included) {
        (None, None) => None,
        (Some(excluded), None) => Some((excluded, false)),
        (None, Some(included)) => Some((included, true)),
        (Some(excluded), Some(included)) => {
            if excluded.value < included.value {
                Some((included, true))
            } else {
                Some((excluded, false))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            bitvote::{BitVote, WeightedBitVote},
            preprocess,
        },
    };

    fn candidate(value: u64) -> Candidate {
        Candidate {
            participants: vec![],
            solution: vec![],
            value: Value {
                capped: value.into(),
                uncapped: value.into(),
            },
        }
    }

    /// Unit weights and fees, no two voters alike and no attestation backed
    /// by everybody, so nothing gets filtered.
    fn triangle() -> Preprocessed {
        let votes: Vec<_> = [[true, true, false], [true, false, true], [false, true, true]]
            .iter()
            .enumerate()
            .map(|(index, statuses)| {
                WeightedBitVote::new(index, 1, BitVote::from_statuses(statuses).unwrap()).unwrap()
            })
            .collect();
        let fees = vec![BigUint::from(1u32); 3];
        preprocess::filter_and_aggregate(&votes, &fees, 3)
    }

    #[test]
    fn join_prefers_the_excluding_branch_on_ties() {
        assert_eq!(join(None, None), None);
        assert_eq!(join(Some(candidate(1)), None), Some((candidate(1), false)));
        assert_eq!(join(None, Some(candidate(1))), Some((candidate(1), true)));
        assert_eq!(
            join(Some(candidate(2)), Some(candidate(2))),
            Some((candidate(2), false))
        );
        assert_eq!(
            join(Some(candidate(2)), Some(candidate(3))),
            Some((candidate(3), true))
        );
        assert_eq!(
            join(Some(candidate(4)), Some(candidate(3))),
            Some((candidate(4), false))
        );
    }

    #[test]
    fn smaller_dimension_goes_first() {
        let mut problem = triangle();
        assert_eq!(
            Strategy::order(&problem),
            [Strategy::Attestations, Strategy::Voters]
        );
        problem.votes.pop();
        assert_eq!(
            Strategy::order(&problem),
            [Strategy::Voters, Strategy::Attestations]
        );
    }

    #[test]
    fn both_strategies_agree_on_the_optimum() {
        let problem = triangle();
        for seed in 0..10 {
            let seed = Seed::from_u64(seed);
            let by_attestations =
                Strategy::Attestations.run(&problem, 1_000, &seed, Value::default());
            let by_voters = Strategy::Voters.run(&problem, 1_000, &seed, Value::default());
            assert!(by_attestations.optimal);
            assert!(by_voters.optimal);
            let by_attestations = by_attestations.candidate.unwrap();
            let by_voters = by_voters.candidate.unwrap();
            assert_eq!(by_attestations.value, problem.value(&1u32.into(), 2));
            assert_eq!(by_voters.value, by_attestations.value);
            assert_eq!(problem.value_of(&by_attestations), by_attestations.value);
            assert_eq!(problem.value_of(&by_voters), by_voters.value);
        }
    }

    #[test]
    fn exhausted_budget_is_not_optimal() {
        let problem = triangle();
        for strategy in [Strategy::Attestations, Strategy::Voters] {
            let outcome = strategy.run(&problem, 1, &Seed::from_u64(0), Value::default());
            assert!(!outcome.optimal);
            assert!(outcome.candidate.is_none());
        }
    }

    #[test]
    fn leaf_reached_with_the_last_operation_counts() {
        // A single voter confirming everything leaves nothing to branch on, so
        // the root is a leaf.
        let votes = vec![
            WeightedBitVote::new(0, 4, BitVote::from_statuses(&[true, true]).unwrap()).unwrap(),
        ];
        let fees = vec![BigUint::from(2u32), BigUint::from(5u32)];
        let problem = preprocess::filter_and_aggregate(&votes, &fees, 4);
        assert!(problem.votes.is_empty());
        assert!(problem.fees.is_empty());
        for strategy in [Strategy::Attestations, Strategy::Voters] {
            let outcome = strategy.run(&problem, 1, &Seed::from_u64(0), Value::default());
            assert_eq!(outcome.operations, 1);
            assert!(!outcome.optimal);
            assert_eq!(
                outcome.candidate.unwrap().value,
                problem.value(&7u32.into(), 4)
            );
        }
    }

    #[test]
    fn high_initial_bound_prunes_everything() {
        let problem = triangle();
        let unreachable = problem.value(&3u32.into(), 3);
        for strategy in [Strategy::Attestations, Strategy::Voters] {
            let outcome = strategy.run(&problem, 1_000, &Seed::from_u64(0), unreachable.clone());
            assert!(outcome.optimal);
            assert!(outcome.candidate.is_none());
        }
    }

    #[test]
    fn completion_adds_what_fits_and_is_idempotent() {
        let problem = triangle();
        let mut candidate = Candidate {
            participants: vec![true, false, false],
            solution: vec![false; 3],
            value: Value::default(),
        };
        candidate.complete(&problem);
        // The lone participant confirms two attestations, nobody else
        // confirms both of them.
        assert_eq!(candidate.solution, vec![true, true, false]);
        assert_eq!(candidate.participants, vec![true, false, false]);
        assert_eq!(candidate.value, problem.value(&2u32.into(), 1));

        let completed = candidate.clone();
        candidate.complete(&problem);
        assert_eq!(candidate, completed);
    }

    #[test]
    fn everybody_supports_nothing_but_guaranteed_fees() {
        let problem = triangle();
        let mut candidate = Candidate::everybody(&problem);
        assert_eq!(candidate.value, Value::default());
        candidate.complete(&problem);
        assert_eq!(candidate.solution, vec![false; 3]);
        assert_eq!(candidate.participants, vec![true; 3]);
    }
}
