//! Branching over attestations.
//!
//! Every node decides one aggregated attestation. Excluding it lowers the fee
//! sum, including it shrinks the coalition to the voters confirming it. The
//! attestations are visited in a seeded random order.

use {
    super::{Candidate, Outcome, Status, join},
    crate::seed,
    num::BigUint,
};

pub(super) fn search(mut status: Status<'_>) -> Outcome {
    let problem = status.problem;
    let weight = problem.participation_weight();
    if weight <= status.majority_threshold() {
        return status.finish(None);
    }
    let order = seed::permutation(problem.fees.len(), &mut status.rng);
    let coalition: Vec<usize> = (0..problem.votes.len()).collect();
    let candidate = branch(&mut status, &order, &coalition, weight, problem.total_fees());
    status.finish(candidate)
}

/// `coalition` lists the aggregated voters confirming every attestation
/// included so far, `weight` is their weight plus the guaranteed weight and
/// `fee_sum` covers every attestation not excluded so far.
fn branch(
    status: &mut Status<'_>,
    order: &[usize],
    coalition: &[usize],
    weight: u64,
    fee_sum: BigUint,
) -> Option<Candidate> {
    status.operations += 1;
    let problem = status.problem;
    let Some((&fee, rest)) = order.split_first() else {
        let value = status.leaf_value(&fee_sum, weight)?;
        let mut participants = vec![false; problem.votes.len()];
        for &voter in coalition {
            participants[voter] = true;
        }
        return Some(Candidate {
            participants,
            solution: vec![false; problem.fees.len()],
            value,
        });
    };
    if status.prune(&fee_sum, weight) {
        return None;
    }

    let exclude = |status: &mut Status<'_>| {
        let fee_sum = &fee_sum - &problem.fees[fee].fee;
        branch(status, rest, coalition, weight, fee_sum)
    };
    let include = |status: &mut Status<'_>| {
        status.operations += coalition.len() as u64;
        let supporters: Vec<usize> = coalition
            .iter()
            .copied()
            .filter(|&voter| problem.votes[voter].confirms(fee))
            .collect();
        let weight = problem.filter.guaranteed_weight
            + supporters
                .iter()
                .map(|&voter| problem.votes[voter].weight)
                .sum::<u64>();
        if weight <= status.majority_threshold() {
            return None;
        }
        branch(status, rest, &supporters, weight, fee_sum.clone())
    };

    let (excluded, included) = if status.coin_flip() {
        let excluded = exclude(status);
        (excluded, include(status))
    } else {
        let included = include(status);
        (exclude(status), included)
    };
    join(excluded, included).map(|(mut candidate, included)| {
        candidate.solution[fee] = included;
        candidate
    })
}
