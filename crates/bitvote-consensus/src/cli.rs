//! CLI arguments for the `bitvote-consensus` binary.

use {
    clap::{Parser, Subcommand},
    std::path::PathBuf,
    tracing::Level,
};

/// Compute the consensus bit vote of a voting round
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The log filter.
    #[arg(long, env, default_value = "info")]
    pub log: String,

    /// Events at or above this level are logged to stderr, all others to
    /// stdout. Without it all events go to stderr.
    #[arg(long, env)]
    pub log_stderr_threshold: Option<Level>,

    /// Log events as JSON.
    #[arg(long, env)]
    pub log_json: bool,

    /// Path to the engine configuration file. This file should be in TOML
    /// format. Defaults apply if omitted.
    #[arg(long, env)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect the bit votes of a round from a JSON file and print the
    /// consensus.
    Round {
        /// Path to the round description.
        #[arg(long)]
        input: PathBuf,
    },
}
