pub mod cli;
pub mod config;
pub mod input;
mod run;

pub use self::run::{Report, consensus_round, run, start};
