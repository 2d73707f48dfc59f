//! vitals-analyze: run the health analyzer or the dataset profiler over a
//! JSON file of observations.
//!
//! The input file holds a JSON array of observations:
//!
//! ```json
//! [{"symptoms": ["headache"], "severity": 6, "sleep_hours": 6.5, "stress": 5,
//!   "exercise_minutes": 20, "diet": "salad", "notes": "", "timestamp": "2025-03-08T09:15:00Z"}]
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use vitals_compute::{DatasetProfile, HealthAnalyzer};
use vitals_core::config::load_dotenv;
use vitals_core::{Config, HealthObservation};

// ── CLI ─────────────────────────────────────────────────────────────

/// Health-pattern clustering and risk assessment over observation batches.
#[derive(Parser, Debug)]
#[command(name = "vitals-analyze", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Pretty-print the JSON output.
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster a batch and assess risk.
    Analyze {
        /// JSON file with an array of observations.
        input: PathBuf,

        /// Subject the batch belongs to.
        #[arg(long, default_value = "anonymous")]
        subject: String,

        /// Fixed RNG seed for reproducible clustering.
        #[arg(long, env = "VITALS_SEED")]
        seed: Option<u64>,

        /// Upper bound of the optimal-K sweep.
        #[arg(long)]
        max_k: Option<usize>,

        /// Directory of YAML rule documents.
        #[arg(long, env = "VITALS_RULES_DIR")]
        rules_dir: Option<PathBuf>,
    },
    /// Summarize a batch without clustering it.
    Profile {
        /// JSON file with an array of observations.
        input: PathBuf,
    },
}

fn load_observations(path: &Path) -> Result<Vec<HealthObservation>> {
    let observations = HealthObservation::load_batch(path)
        .with_context(|| format!("loading observations from {}", path.display()))?;
    info!(path = %path.display(), count = observations.len(), "observations loaded");
    Ok(observations)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            input,
            subject,
            seed,
            max_k,
            rules_dir,
        } => {
            let mut config = Config::from_env();
            if seed.is_some() {
                config.analysis.seed = seed;
            }
            if let Some(max_k) = max_k {
                config.analysis.max_k = max_k;
            }
            if rules_dir.is_some() {
                config.rules.rules_dir = rules_dir;
            }
            config.log_summary();

            let analyzer = HealthAnalyzer::from_config(&config).context("loading rule documents")?;
            let observations = load_observations(&input)?;
            let result = analyzer.analyze(&subject, &observations);
            print_json(&result, cli.pretty)?;
        }
        Command::Profile { input } => {
            let observations = load_observations(&input)?;
            let profile = DatasetProfile::from_observations(&observations);
            print_json(&profile, cli.pretty)?;
        }
    }

    Ok(())
}
