//! Combines preprocessing, both searches and greedy completion into the
//! consensus computation of a round.

use {
    crate::{
        bitvote::WeightedBitVote,
        error::Error,
        preprocess::{self, Preprocessed},
        search::{Candidate, Strategy},
        seed::Seed,
        solution::ConsensusSolution,
        value::Value,
    },
    num::BigUint,
    std::thread,
};

/// Engine parameters. All nodes of a round need to agree on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Operations each search run may spend before giving up on optimality.
    pub max_operations: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_operations: 20_000_000,
        }
    }
}

/// Computes the consensus bit vote of a round.
///
/// `total_weight` is the weight of every eligible voter, including the ones
/// that did not submit a vote. Identical arguments always produce identical
/// results.
pub fn consensus(
    votes: &[WeightedBitVote],
    fees: &[BigUint],
    total_weight: u64,
    config: &Config,
    seed: &Seed,
) -> Result<ConsensusSolution, Error> {
    preprocess::validate(votes, fees, total_weight)?;
    if votes.is_empty() || fees.is_empty() {
        tracing::debug!(votes = votes.len(), fees = fees.len(), "nothing to agree on");
        return Ok(ConsensusSolution::empty(votes.len(), fees.len()));
    }

    let problem = preprocess::filter_and_aggregate(votes, fees, total_weight);
    let depth = problem.votes.len().max(problem.fees.len());
    let (candidate, optimal) = with_search_stack(depth, || resolve(&problem, config, seed))?;
    let solution =
        ConsensusSolution::assemble(votes.len(), fees.len(), &problem, &candidate, optimal);

    tracing::info!(
        voters = votes.len(),
        attestations = fees.len(),
        participants = solution.participants.iter().filter(|p| **p).count(),
        included = solution.solution.iter().filter(|s| **s).count(),
        weight = solution.participating_weight(votes),
        value = ?solution.value,
        optimal,
        "computed consensus bit vote"
    );
    Ok(solution)
}

/// Runs the strategy with the smaller branching dimension and, if it runs out
/// of budget, the other one on top of its result. Non-optimal results get
/// completed greedily.
fn resolve(problem: &Preprocessed, config: &Config, seed: &Seed) -> (Candidate, bool) {
    let [first, second] = Strategy::order(problem);
    let mut outcome = first.run(problem, config.max_operations, seed, Value::default());

    if !outcome.optimal {
        let bound = outcome
            .candidate
            .as_ref()
            .map(|candidate| candidate.value.clone())
            .unwrap_or_default();
        let retry = second.run(problem, config.max_operations, seed, bound);
        let improves = match (&outcome.candidate, &retry.candidate) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(current), Some(better)) => better.value > current.value,
        };
        if improves {
            outcome.candidate = retry.candidate;
        }
        outcome.optimal = retry.optimal;
    }

    let mut candidate = outcome
        .candidate
        .unwrap_or_else(|| Candidate::everybody(problem));
    if !outcome.optimal {
        candidate.complete(problem);
    }
    (candidate, outcome.optimal)
}

const BASE_STACK_SIZE: usize = 8 << 20;
const STACK_SIZE_PER_LEVEL: usize = 2 << 10;

/// The searches recurse once per aggregated voter or attestation, which can
/// be tens of thousands of levels. Runs them on a thread with a stack sized
/// for that.
fn with_search_stack<T, F>(depth: usize, search: F) -> Result<T, Error>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    let span = tracing::Span::current();
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("bitvote-search".into())
            .stack_size(BASE_STACK_SIZE + depth * STACK_SIZE_PER_LEVEL)
            .spawn_scoped(scope, move || span.in_scope(search))
            .map_err(Error::SearchThread)?;
        match handle.join() {
            Ok(result) => Ok(result),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
