use thiserror::Error;

/// Input that violates the engine's contract, or a BitVote message that can
/// not be counted.
///
/// Running out of operation budget is not an error; it yields a non-optimal
/// solution instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bit vote of voter {voter} has length {length} but the round has {expected} fees")]
    LengthMismatch {
        voter: usize,
        length: u16,
        expected: usize,
    },
    #[error("bit vote sets bit {bit} which is beyond its length {length}")]
    BitOutOfRange { bit: u64, length: u16 },
    #[error("voter {voter} has zero weight")]
    ZeroWeight { voter: usize },
    #[error("reported weight {reported} exceeds the total weight {total}")]
    WeightExceedsTotal { reported: u64, total: u64 },
    #[error("{0} attestations do not fit into a bit vote")]
    TooManyAttestations(usize),
    #[error("bit vote payload is not valid hex")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("bit vote payload of {0} bytes is too short")]
    Truncated(usize),
    #[error("round check {actual} does not match the expected {expected}")]
    RoundCheck { expected: u8, actual: u8 },
    #[error("bit vote for round {actual} submitted to round {expected}")]
    WrongRound { expected: u64, actual: u64 },
    #[error("total weight of the signing policy does not fit into 64 bits")]
    TotalWeightOverflow,
    #[error("voter {0} is not part of the signing policy")]
    UnknownVoter(usize),
    #[error("could not spawn the search thread")]
    SearchThread(#[source] std::io::Error),
}
