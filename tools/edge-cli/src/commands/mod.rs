//! CLI command implementations.

pub mod config;
pub mod event;
pub mod route;
pub mod simulate;

use clap::{Args, Subcommand};
use edge_experiment::{FixedDraw, RandomSource};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Arguments for the route command.
#[derive(Args)]
pub struct RouteArgs {
    /// Request path, optionally with a query string.
    pub uri: String,

    /// Request cookie as name=value (repeatable, kept in order).
    #[arg(long = "cookie", value_name = "NAME=VALUE")]
    pub cookies: Vec<String>,

    /// Request header as name:value (repeatable).
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Pin the random draw for a first-time visitor.
    #[arg(long, conflicts_with = "seed")]
    pub draw: Option<f64>,

    /// Seed the random source.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Number of first-time visitors to route.
    #[arg(short = 'n', long, default_value = "10000")]
    pub count: u64,

    /// Seed the random source.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Request path the visitors arrive on.
    #[arg(long, default_value = "/")]
    pub uri: String,
}

/// Arguments for the event command.
#[derive(Args)]
pub struct EventArgs {
    /// Path to a viewer-request event JSON file.
    pub file: String,

    /// Pin the random draw for a first-time visitor.
    #[arg(long, conflicts_with = "seed")]
    pub draw: Option<f64>,

    /// Seed the random source.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Get a config value.
    Get {
        /// Config key (dot-separated).
        key: String,
    },
    /// Set a config value.
    Set {
        /// Config key (dot-separated).
        key: String,
        /// Value to set.
        value: String,
    },
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Random source selected by `--draw` / `--seed`.
pub fn random_source(draw: Option<f64>, seed: Option<u64>) -> Box<dyn RandomSource> {
    match (draw, seed) {
        (Some(draw), _) => Box::new(FixedDraw::new(draw)),
        (None, Some(seed)) => Box::new(StdRng::seed_from_u64(seed)),
        (None, None) => Box::new(rand::thread_rng()),
    }
}
