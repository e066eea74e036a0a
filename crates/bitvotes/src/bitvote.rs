//! Bit vote ballots and their on-chain hex encoding.

use {
    crate::error::Error,
    num::{BigUint, Zero},
};

/// Maximal number of attestations a single bit vote can cover.
pub const MAX_ATTESTATIONS: usize = u16::MAX as usize;

/// A voter's ballot: bit `i` is set iff the voter confirms attestation `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitVote {
    length: u16,
    bit_vector: BigUint,
}

impl BitVote {
    /// Creates a bit vote, making sure no bit at or beyond `length` is set.
    pub fn new(length: u16, bit_vector: BigUint) -> Result<Self, Error> {
        if bit_vector.bits() > u64::from(length) {
            return Err(Error::BitOutOfRange {
                bit: bit_vector.bits() - 1,
                length,
            });
        }
        Ok(Self { length, bit_vector })
    }

    /// Bit vote confirming exactly the attestations whose status is `true`.
    pub fn from_statuses(statuses: &[bool]) -> Result<Self, Error> {
        let length =
            u16::try_from(statuses.len()).map_err(|_| Error::TooManyAttestations(statuses.len()))?;
        let mut bit_vector = BigUint::zero();
        for (index, _) in statuses.iter().enumerate().filter(|(_, confirmed)| **confirmed) {
            bit_vector.set_bit(index as u64, true);
        }
        Ok(Self { length, bit_vector })
    }

    /// Number of attestations the vote covers.
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn bit_vector(&self) -> &BigUint {
        &self.bit_vector
    }

    pub fn confirms(&self, attestation: usize) -> bool {
        self.bit_vector.bit(attestation as u64)
    }

    /// Bitwise and of two votes. The result has the larger of both lengths.
    pub fn and(&self, other: &Self) -> Self {
        Self {
            length: self.length.max(other.length),
            bit_vector: &self.bit_vector & &other.bit_vector,
        }
    }

    /// Sum of the fees of all confirmed attestations.
    pub fn fees(&self, fees: &[BigUint]) -> BigUint {
        fees.iter()
            .enumerate()
            .filter(|(index, _)| self.confirms(*index))
            .map(|(_, fee)| fee)
            .sum()
    }

    /// Encodes the vote for publication: round check byte, big endian 16 bit
    /// length and the big endian bytes of the bit vector.
    pub fn encode_hex(&self, round_id: u64) -> String {
        let mut encoded = vec![round_check(round_id)];
        encoded.extend_from_slice(&self.length.to_be_bytes());
        if !self.bit_vector.is_zero() {
            encoded.extend(self.bit_vector.to_bytes_be());
        }
        hex::encode(encoded)
    }

    /// Inverse of [`BitVote::encode_hex`]. Returns the vote and its round
    /// check byte.
    pub fn decode_hex(payload: &str) -> Result<(Self, u8), Error> {
        let payload = payload.strip_prefix("0x").unwrap_or(payload);
        let bytes = hex::decode(payload)?;
        let [round_check, length_high, length_low, vector @ ..] = bytes.as_slice() else {
            return Err(Error::Truncated(bytes.len()));
        };
        let length = u16::from_be_bytes([*length_high, *length_low]);
        let vote = Self::new(length, BigUint::from_bytes_be(vector))?;
        Ok((vote, *round_check))
    }
}

/// Round check byte published with every bit vote.
pub fn round_check(round_id: u64) -> u8 {
    (round_id % 256) as u8
}

/// A bit vote together with its voter's weight.
///
/// `index` is opaque to the engine: it identifies the voter for the caller
/// (e.g. the position in the signing policy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedBitVote {
    index: usize,
    weight: u64,
    bit_vote: BitVote,
}

impl WeightedBitVote {
    pub fn new(index: usize, weight: u64, bit_vote: BitVote) -> Result<Self, Error> {
        if weight == 0 {
            return Err(Error::ZeroWeight { voter: index });
        }
        Ok(Self {
            index,
            weight,
            bit_vote,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn bit_vote(&self) -> &BitVote {
        &self.bit_vote
    }

    pub fn confirms(&self, attestation: usize) -> bool {
        self.bit_vote.confirms(attestation)
    }
}
