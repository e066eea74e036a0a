//! Branching over voters, the dual of [`super::attestations`].
//!
//! Every node decides one aggregated voter in index order. Excluding it lowers
//! the weight still reachable, including it drops every attestation it does
//! not confirm.

use {
    super::{Candidate, Outcome, Status, join},
    num::BigUint,
};

pub(super) fn search(mut status: Status<'_>) -> Outcome {
    let problem = status.problem;
    let max_weight = problem.participation_weight();
    if max_weight <= status.majority_threshold() {
        return status.finish(None);
    }
    let supported: Vec<usize> = (0..problem.fees.len()).collect();
    let candidate = branch(&mut status, 0, &supported, max_weight, problem.total_fees());
    status.finish(candidate)
}

/// `supported` lists the aggregated attestations confirmed by every voter
/// included so far and `fee_sum` is their fee plus the guaranteed fees.
/// `max_weight` is the weight of all voters not excluded so far.
fn branch(
    status: &mut Status<'_>,
    voter: usize,
    supported: &[usize],
    max_weight: u64,
    fee_sum: BigUint,
) -> Option<Candidate> {
    status.operations += 1;
    let problem = status.problem;
    let Some(vote) = problem.votes.get(voter) else {
        let value = status.leaf_value(&fee_sum, max_weight)?;
        let mut solution = vec![false; problem.fees.len()];
        for &fee in supported {
            solution[fee] = true;
        }
        return Some(Candidate {
            participants: vec![false; problem.votes.len()],
            solution,
            value,
        });
    };
    if status.prune(&fee_sum, max_weight) {
        return None;
    }

    let exclude = |status: &mut Status<'_>| {
        let max_weight = max_weight - vote.weight;
        if max_weight <= status.majority_threshold() {
            return None;
        }
        branch(status, voter + 1, supported, max_weight, fee_sum.clone())
    };
    let include = |status: &mut Status<'_>| {
        status.operations += supported.len() as u64;
        let (kept, dropped): (Vec<usize>, Vec<usize>) =
            supported.iter().partition(|&&fee| vote.confirms(fee));
        let fee_sum = dropped
            .iter()
            .fold(fee_sum.clone(), |sum, &fee| sum - &problem.fees[fee].fee);
        branch(status, voter + 1, &kept, max_weight, fee_sum)
    };

    let (excluded, included) = if status.coin_flip() {
        let excluded = exclude(status);
        (excluded, include(status))
    } else {
        let included = include(status);
        (exclude(status), included)
    };
    join(excluded, included).map(|(mut candidate, included)| {
        candidate.participants[voter] = included;
        candidate
    })
}
