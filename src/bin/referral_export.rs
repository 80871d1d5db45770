//! referral-export: reward ledger CSV export
//!
//! Writes every reward created in a half-open time window as CSV, to a
//! file or to stdout. Logs go to stderr.
//!
//! ## Configuration
//! - REFERRAL_CONFIG: Path to a YAML config file (optional)
//! - REFERRAL__STORAGE__PATH: SQLite database path
//! - REFERRAL_LOG: Log filter (default: info)
//!
//! ## Usage
//! ```text
//! referral-export --from 2024-06-01T00:00:00Z --to 2024-07-01T00:00:00Z -o june.csv
//! ```

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::info;

use referral_engine::auth::Actor;
use referral_engine::config::Config;
use referral_engine::facade::ReferralEngine;
use referral_engine::utils::bootstrap::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "referral-export")]
#[command(about = "Export the referral reward ledger as CSV", long_about = None)]
struct Args {
    /// Window start, inclusive (RFC 3339)
    #[arg(long)]
    from: DateTime<Utc>,

    /// Window end, exclusive (RFC 3339)
    #[arg(long)]
    to: DateTime<Utc>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Identity recorded as the caller
    #[arg(long, default_value = "referral-export")]
    actor: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let engine = ReferralEngine::from_config(&config).await?;
    let actor = Actor::analyst(args.actor);

    let rows = match &args.output {
        Some(path) => {
            let sink = BufWriter::new(File::create(path)?);
            engine
                .write_ledger_csv(&actor, args.from, args.to, sink)
                .await?
        }
        None => {
            engine
                .write_ledger_csv(&actor, args.from, args.to, io::stdout().lock())
                .await?
        }
    };

    info!(
        rows,
        from = %args.from,
        to = %args.to,
        output = ?args.output,
        "Ledger export complete"
    );
    Ok(())
}
