//! Shrinks a round's votes and fees before any branching happens.
//!
//! Filtering decides attestations and voters whose membership can be settled
//! without search; aggregation merges voters with identical votes and
//! attestations with identical support into single entries. Both are
//! reversible through the index lists kept on every entry, see
//! [`crate::solution`].

use {
    crate::{bitvote::WeightedBitVote, error::Error, search::Candidate, value::Value},
    indexmap::IndexMap,
    num::{BigUint, Zero},
};

/// Voters whose votes are identical on every undecided attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedVote {
    /// Positions of the merged voters in the round's vote list, ascending.
    pub indexes: Vec<usize>,
    pub weight: u64,
    /// Bit `j` is set iff the voters confirm aggregated fee `j`.
    pub bit_vector: BigUint,
}

impl AggregatedVote {
    pub fn confirms(&self, fee: usize) -> bool {
        self.bit_vector.bit(fee as u64)
    }
}

/// Attestations confirmed by exactly the same aggregated voters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedFee {
    /// Original attestation indexes, ascending.
    pub indexes: Vec<usize>,
    pub fee: BigUint,
    /// Bit `i` is set iff aggregated vote `i` confirms these attestations.
    pub support: BigUint,
}

/// Decisions taken before the search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResults {
    /// Weight of the voters that confirm every attestation still in play.
    pub guaranteed_weight: u64,
    /// Fees of the attestations confirmed by every voter still in play.
    pub guaranteed_fees: BigUint,
    /// Voters always participating, ascending.
    pub removed_ones: Vec<usize>,
    /// Attestations always part of the solution, ascending.
    pub included: Vec<usize>,
    /// Attestations that can not gather a majority, ascending.
    pub excluded: Vec<usize>,
}

/// A round reduced to the part that still needs to be searched.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub votes: Vec<AggregatedVote>,
    pub fees: Vec<AggregatedFee>,
    pub filter: FilterResults,
    pub total_weight: u64,
}

impl Preprocessed {
    /// Coalitions need strictly more weight than this.
    pub fn majority_threshold(&self) -> u64 {
        self.total_weight / 2
    }

    /// Weight of all voters still able to participate.
    pub fn participation_weight(&self) -> u64 {
        self.filter.guaranteed_weight + self.votes.iter().map(|vote| vote.weight).sum::<u64>()
    }

    /// Fees of all attestations still able to be part of the solution.
    pub fn total_fees(&self) -> BigUint {
        self.fees
            .iter()
            .fold(self.filter.guaranteed_fees.clone(), |sum, fee| sum + &fee.fee)
    }

    pub fn value(&self, fee_sum: &BigUint, weight: u64) -> Value {
        Value::new(fee_sum, weight, self.total_weight)
    }

    /// Value of an assignment in the aggregated index space, including the
    /// guaranteed weight and fees.
    pub fn value_of(&self, candidate: &Candidate) -> Value {
        let fee_sum = self
            .fees
            .iter()
            .zip(&candidate.solution)
            .filter(|(_, included)| **included)
            .fold(self.filter.guaranteed_fees.clone(), |sum, (fee, _)| sum + &fee.fee);
        let weight = self.filter.guaranteed_weight
            + self
                .votes
                .iter()
                .zip(&candidate.participants)
                .filter(|(_, participates)| **participates)
                .map(|(vote, _)| vote.weight)
                .sum::<u64>();
        self.value(&fee_sum, weight)
    }
}

/// Checks the contract the engine relies on.
pub fn validate(
    votes: &[WeightedBitVote],
    fees: &[BigUint],
    total_weight: u64,
) -> Result<(), Error> {
    if fees.len() > crate::bitvote::MAX_ATTESTATIONS {
        return Err(Error::TooManyAttestations(fees.len()));
    }
    let mut reported = 0u64;
    for vote in votes {
        if usize::from(vote.bit_vote().length()) != fees.len() {
            return Err(Error::LengthMismatch {
                voter: vote.index(),
                length: vote.bit_vote().length(),
                expected: fees.len(),
            });
        }
        if vote.weight() == 0 {
            return Err(Error::ZeroWeight { voter: vote.index() });
        }
        reported = reported.saturating_add(vote.weight());
    }
    if reported > total_weight {
        return Err(Error::WeightExceedsTotal {
            reported,
            total: total_weight,
        });
    }
    Ok(())
}

/// Filters decided voters and attestations, then aggregates the rest.
///
/// Expects input accepted by [`validate`].
pub fn filter_and_aggregate(
    votes: &[WeightedBitVote],
    fees: &[BigUint],
    total_weight: u64,
) -> Preprocessed {
    let (voters, attestations, filter) = filter(votes, fees, total_weight);
    let (votes, fees) = aggregate(votes, fees, &voters, &attestations);
    tracing::debug!(
        aggregated_votes = votes.len(),
        aggregated_fees = fees.len(),
        guaranteed_weight = filter.guaranteed_weight,
        included = filter.included.len(),
        excluded = filter.excluded.len(),
        removed_ones = filter.removed_ones.len(),
        "preprocessed bit votes"
    );
    Preprocessed {
        votes,
        fees,
        filter,
        total_weight,
    }
}

/// Removes voters and attestations until a fixed point is reached. Returns the
/// voters and attestations still in play, in ascending order.
///
/// Every pass
/// 1. excludes attestations whose support can not exceed half the total
///    weight,
/// 2. folds voters confirming all remaining attestations into the guaranteed
///    weight,
/// 3. includes attestations confirmed by every remaining voter.
///
/// Each step can enable the others, so passes repeat until nothing changes.
///
/// Voters confirming none of the remaining attestations stay in play. They
/// confirm every included attestation, so they still back the solution made
/// of the included attestations only, and they keep step 3 from including
/// attestations they do not confirm.
fn filter(
    votes: &[WeightedBitVote],
    fees: &[BigUint],
    total_weight: u64,
) -> (Vec<usize>, Vec<usize>, FilterResults) {
    let majority = total_weight / 2;
    let mut voters: Vec<usize> = (0..votes.len()).collect();
    let mut attestations: Vec<usize> = (0..fees.len()).collect();
    let mut results = FilterResults::default();

    loop {
        let mut changed = false;

        attestations.retain(|&attestation| {
            let support = results.guaranteed_weight
                + voters
                    .iter()
                    .filter(|&&voter| votes[voter].confirms(attestation))
                    .map(|&voter| votes[voter].weight())
                    .sum::<u64>();
            if support > majority {
                return true;
            }
            results.excluded.push(attestation);
            changed = true;
            false
        });

        voters.retain(|&voter| {
            let vote = &votes[voter];
            if !attestations.iter().all(|&attestation| vote.confirms(attestation)) {
                return true;
            }
            results.guaranteed_weight += vote.weight();
            results.removed_ones.push(voter);
            changed = true;
            false
        });

        attestations.retain(|&attestation| {
            if !voters.iter().all(|&voter| votes[voter].confirms(attestation)) {
                return true;
            }
            results.guaranteed_fees += &fees[attestation];
            results.included.push(attestation);
            changed = true;
            false
        });

        if !changed {
            break;
        }
    }

    results.removed_ones.sort_unstable();
    results.included.sort_unstable();
    results.excluded.sort_unstable();
    (voters, attestations, results)
}

/// Merges voters with identical votes on `attestations`, then attestations
/// with identical support among the merged voters. Entries are ordered by
/// their smallest original index.
fn aggregate(
    votes: &[WeightedBitVote],
    fees: &[BigUint],
    voters: &[usize],
    attestations: &[usize],
) -> (Vec<AggregatedVote>, Vec<AggregatedFee>) {
    // Votes restricted to `attestations`: bit `k` stands for `attestations[k]`.
    let mut by_vote: IndexMap<BigUint, (Vec<usize>, u64)> = IndexMap::new();
    for &voter in voters {
        let mut restricted = BigUint::zero();
        for (k, &attestation) in attestations.iter().enumerate() {
            if votes[voter].confirms(attestation) {
                restricted.set_bit(k as u64, true);
            }
        }
        let (indexes, weight) = by_vote.entry(restricted).or_default();
        indexes.push(voter);
        *weight += votes[voter].weight();
    }

    let mut by_support: IndexMap<BigUint, (Vec<usize>, BigUint)> = IndexMap::new();
    for (k, &attestation) in attestations.iter().enumerate() {
        let mut support = BigUint::zero();
        for (i, restricted) in by_vote.keys().enumerate() {
            if restricted.bit(k as u64) {
                support.set_bit(i as u64, true);
            }
        }
        let (indexes, fee) = by_support.entry(support).or_default();
        indexes.push(attestation);
        *fee += &fees[attestation];
    }

    let aggregated_votes = by_vote
        .into_values()
        .enumerate()
        .map(|(i, (indexes, weight))| {
            let mut bit_vector = BigUint::zero();
            for (j, support) in by_support.keys().enumerate() {
                if support.bit(i as u64) {
                    bit_vector.set_bit(j as u64, true);
                }
            }
            AggregatedVote {
                indexes,
                weight,
                bit_vector,
            }
        })
        .collect();
    let aggregated_fees = by_support
        .into_iter()
        .map(|(support, (indexes, fee))| AggregatedFee {
            indexes,
            fee,
            support,
        })
        .collect();
    (aggregated_votes, aggregated_fees)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::bitvote::BitVote};

    fn weighted(index: usize, length: u16, confirmed: &[usize]) -> WeightedBitVote {
        let mut statuses = vec![false; length.into()];
        for &attestation in confirmed {
            statuses[attestation] = true;
        }
        WeightedBitVote::new(index, 1, BitVote::from_statuses(&statuses).unwrap()).unwrap()
    }

    fn unit_fees(n: usize) -> Vec<BigUint> {
        vec![BigUint::from(1u32); n]
    }

    /// `count` unit weight voters per group, each group confirming the given
    /// attestations.
    fn voters(length: u16, groups: &[(usize, Vec<usize>)]) -> Vec<WeightedBitVote> {
        groups
            .iter()
            .flat_map(|(count, confirmed)| std::iter::repeat_n(confirmed, *count))
            .enumerate()
            .map(|(index, confirmed)| weighted(index, length, confirmed))
            .collect()
    }

    fn two_groups() -> Vec<WeightedBitVote> {
        voters(100, &[(65, vec![2, 3, 50]), (35, vec![3, 7, 50])])
    }

    #[test]
    fn aggregates_identical_votes() {
        let all: Vec<usize> = (0..100).collect();
        let (votes, _) = aggregate(&two_groups(), &unit_fees(100), &all, &all);

        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].indexes, (0..65).collect::<Vec<_>>());
        assert_eq!(votes[0].weight, 65);
        assert_eq!(votes[1].indexes, (65..100).collect::<Vec<_>>());
        assert_eq!(votes[1].weight, 35);
    }

    #[test]
    fn aggregates_attestations_with_identical_support() {
        let all: Vec<usize> = (0..100).collect();
        let (votes, fees) = aggregate(&two_groups(), &unit_fees(100), &all, &all);

        // Nobody, only the first group, both groups, only the second group.
        assert_eq!(fees.len(), 4);
        assert_eq!(fees[0].indexes.len(), 96);
        assert_eq!(fees[0].support, BigUint::zero());
        assert_eq!(fees[1].indexes, vec![2]);
        assert_eq!(fees[1].support, BigUint::from(0b01u32));
        assert_eq!(fees[2].indexes, vec![3, 50]);
        assert_eq!(fees[2].fee, BigUint::from(2u32));
        assert_eq!(fees[2].support, BigUint::from(0b11u32));
        assert_eq!(fees[3].indexes, vec![7]);
        assert_eq!(votes[0].bit_vector, BigUint::from(0b0110u32));
        assert_eq!(votes[1].bit_vector, BigUint::from(0b1100u32));
    }

    #[test]
    fn merges_fees_of_aggregated_attestations() {
        let votes = vec![
            weighted(0, 4, &[0, 1, 2]),
            weighted(1, 4, &[0, 1, 3]),
            weighted(2, 4, &[2, 3]),
        ];
        let fees: Vec<BigUint> = [1u32, 2, 4, 8].into_iter().map(BigUint::from).collect();
        let preprocessed = filter_and_aggregate(&votes, &fees, 3);

        assert_eq!(preprocessed.filter, FilterResults::default());
        assert_eq!(preprocessed.votes.len(), 3);
        let merged: Vec<_> = preprocessed
            .fees
            .iter()
            .map(|fee| (fee.indexes.clone(), fee.fee.clone()))
            .collect();
        assert_eq!(
            merged,
            vec![
                (vec![0, 1], BigUint::from(3u32)),
                (vec![2], BigUint::from(4u32)),
                (vec![3], BigUint::from(8u32)),
            ]
        );
        assert_eq!(preprocessed.votes[0].bit_vector, BigUint::from(0b011u32));
        assert_eq!(preprocessed.votes[1].bit_vector, BigUint::from(0b101u32));
        assert_eq!(preprocessed.votes[2].bit_vector, BigUint::from(0b110u32));
        assert_eq!(preprocessed.total_fees(), BigUint::from(15u32));
    }

    #[test]
    fn keeps_voters_backing_only_included_attestations() {
        // The second group confirms attestations 3 and 50, which get included,
        // but not attestation 2. It stays in play with an empty vote so the
        // search can still choose the included attestations with everybody.
        let preprocessed = filter_and_aggregate(&two_groups(), &unit_fees(100), 100);
        let filter = &preprocessed.filter;

        assert_eq!(filter.guaranteed_weight, 65);
        assert_eq!(filter.removed_ones, (0..65).collect::<Vec<_>>());
        assert_eq!(filter.included, vec![3, 50]);
        assert_eq!(filter.guaranteed_fees, BigUint::from(2u32));
        assert_eq!(filter.excluded.len(), 97);
        assert_eq!(preprocessed.votes.len(), 1);
        assert_eq!(preprocessed.votes[0].indexes, (65..100).collect::<Vec<_>>());
        assert_eq!(preprocessed.votes[0].weight, 35);
        assert_eq!(preprocessed.votes[0].bit_vector, BigUint::zero());
        assert_eq!(preprocessed.fees.len(), 1);
        assert_eq!(preprocessed.fees[0].indexes, vec![2]);
        assert_eq!(preprocessed.fees[0].support, BigUint::zero());
        assert_eq!(preprocessed.participation_weight(), 100);
    }

    #[test]
    fn voters_confirming_nothing_left_stay_in_play() {
        // 30 confirm everything, 40 nothing, 30 only the last two. Attestations
        // 0..3 only have 30 supporters and get excluded, after which the first
        // and last groups confirm everything that is left. The 40 block the
        // inclusion of attestations 3 and 4.
        let votes = voters(5, &[(30, vec![0, 1, 2, 3, 4]), (40, vec![]), (30, vec![3, 4])]);
        let preprocessed = filter_and_aggregate(&votes, &unit_fees(5), 100);
        let filter = &preprocessed.filter;

        assert_eq!(filter.excluded, vec![0, 1, 2]);
        assert_eq!(filter.removed_ones.len(), 60);
        assert_eq!(filter.guaranteed_weight, 60);
        assert!(filter.included.is_empty());
        assert_eq!(filter.guaranteed_fees, BigUint::zero());
        assert_eq!(preprocessed.votes.len(), 1);
        assert_eq!(preprocessed.votes[0].indexes, (30..70).collect::<Vec<_>>());
        assert_eq!(preprocessed.votes[0].bit_vector, BigUint::zero());
        assert_eq!(preprocessed.fees.len(), 1);
        assert_eq!(preprocessed.fees[0].indexes, vec![3, 4]);
        assert_eq!(preprocessed.fees[0].fee, BigUint::from(2u32));
    }

    #[test]
    fn excludes_attestations_without_majority_support() {
        let votes = voters(
            10,
            &[(30, vec![0, 1, 2, 3, 4]), (40, vec![1, 4]), (30, vec![3, 4])],
        );
        let preprocessed = filter_and_aggregate(&votes, &unit_fees(10), 100);
        let filter = &preprocessed.filter;

        assert_eq!(filter.included, vec![4]);
        assert_eq!(filter.excluded, vec![0, 2, 5, 6, 7, 8, 9]);
        assert_eq!(filter.guaranteed_weight, 30);
        assert_eq!(preprocessed.votes.len(), 2);
        assert_eq!(preprocessed.fees.len(), 2);
        assert_eq!(preprocessed.fees[0].indexes, vec![1]);
        assert_eq!(preprocessed.fees[1].indexes, vec![3]);
        assert_eq!(preprocessed.participation_weight(), 100);
    }

    #[test]
    fn iterates_until_nothing_changes() {
        let votes = voters(
            8,
            &[
                (30, vec![0, 1, 2, 3, 4]),
                (31, vec![1, 4]),
                (29, vec![3, 4]),
                (10, vec![0, 1, 2, 3, 4, 5, 6, 7]),
            ],
        );
        let preprocessed = filter_and_aggregate(&votes, &unit_fees(8), 100);

        assert_eq!(preprocessed.votes.len(), 2);
        assert_eq!(preprocessed.fees.len(), 2);
        assert_eq!(preprocessed.filter.guaranteed_weight, 40);
        assert_eq!(preprocessed.filter.included, vec![4]);
    }

    #[test]
    fn validates_lengths_and_weights() {
        let fees = unit_fees(3);
        assert!(validate(&[weighted(0, 3, &[0])], &fees, 1).is_ok());
        assert!(matches!(
            validate(&[weighted(4, 2, &[0])], &fees, 1),
            Err(Error::LengthMismatch {
                voter: 4,
                length: 2,
                expected: 3
            })
        ));
        assert!(matches!(
            validate(&[weighted(0, 3, &[0]), weighted(1, 3, &[1])], &fees, 1),
            Err(Error::WeightExceedsTotal {
                reported: 2,
                total: 1
            })
        ));
    }
}
