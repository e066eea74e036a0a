//! Round description read by the `round` command.

use {
    anyhow::Context,
    bitvotes::Message,
    num::BigUint,
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::path::Path,
};

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RoundInput {
    pub round_id: u64,
    /// Weight of every voter of the signing policy, by position.
    pub voter_weights: Vec<u64>,
    /// Fee of every attestation request of the round as a decimal string.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub fees: Vec<BigUint>,
    /// Bit votes as they were submitted, in submission order.
    #[serde(default)]
    pub bit_votes: Vec<Message>,
}

impl RoundInput {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read round input {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse round input {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_round_description() {
        let input: RoundInput = serde_json::from_str(
            r#"{
                "round-id": 258,
                "voter-weights": [3, 1],
                "fees": ["100000000000000000000", "7"],
                "bit-votes": [
                    { "from": 1, "voting-round": 258, "payload": "0x02000203" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(input.round_id, 258);
        assert_eq!(input.voter_weights, vec![3, 1]);
        assert_eq!(
            input.fees,
            vec![
                "100000000000000000000".parse::<BigUint>().unwrap(),
                BigUint::from(7u32)
            ]
        );
        assert_eq!(
            input.bit_votes,
            vec![Message {
                from: 1,
                voting_round: 258,
                payload: "0x02000203".to_string(),
            }]
        );
    }

    #[test]
    fn rejects_numeric_fees() {
        let result = serde_json::from_str::<RoundInput>(
            r#"{ "round-id": 1, "voter-weights": [], "fees": [1] }"#,
        );
        assert!(result.is_err());
    }
}
