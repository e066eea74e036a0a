use {
    crate::{cli, config::Configuration, input::RoundInput},
    anyhow::Context,
    bitvotes::{ConsensusSolution, Round},
    clap::Parser,
    serde::Serialize,
};

pub async fn start(args: impl Iterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    let obs_config = observe::Config::new(&args.log, args.log_stderr_threshold, args.log_json);
    observe::tracing::initialize(&obs_config);
    tracing::info!("running bitvote consensus with {args:#?}");

    if let Err(err) = run(args).await {
        tracing::error!(?err, "bitvote consensus failed");
        std::process::exit(1);
    }
}

pub async fn run(args: cli::Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Configuration::from_path(path).await?,
        None => Configuration::default(),
    };
    let cli::Command::Round { input } = args.command;
    let input = RoundInput::load(&input).await?;
    let report = consensus_round(input, config.engine()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// What the node would sign and publish for a round.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub round_id: u64,
    /// Hex encoded consensus bit vote.
    pub bit_vote: String,
    /// Signing policy positions of the participating voters.
    pub participating_voters: Vec<usize>,
    /// Messages that did not count as a bit vote of the round.
    pub rejected: usize,
    pub consensus: ConsensusSolution,
}

/// Collects the round's bit votes and computes the consensus.
pub async fn consensus_round(
    input: RoundInput,
    config: bitvotes::Config,
) -> anyhow::Result<Report> {
    // Make sure to push the CPU-heavy code to a separate thread in order to
    // not lock up the [`tokio`] runtime.
    tokio::task::spawn_blocking(move || -> anyhow::Result<Report> {
        let mut round =
            Round::new(input.round_id, input.voter_weights).context("invalid signing policy")?;
        let mut rejected = 0;
        for message in &input.bit_votes {
            if let Err(err) = round.process_bit_vote(message) {
                tracing::warn!(?err, from = message.from, "rejected bit vote");
                rejected += 1;
            }
        }

        let (votes, consensus) = round
            .compute_consensus(&input.fees, &config)
            .context("invalid round")?;
        Ok(Report {
            round_id: round.id(),
            bit_vote: consensus.bit_vote()?.encode_hex(round.id()),
            participating_voters: consensus.participating_voters(&votes).collect(),
            rejected,
            consensus,
        })
    })
    .await
    .context("consensus computation panicked")?
}
