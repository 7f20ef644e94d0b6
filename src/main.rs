use anyhow::Result;
use clap::{Parser, Subcommand};
use modcheck_sim::SerialDivider;
use modcheck_verify::{Session, SessionConfig, StimulusPolicy};
use std::time::Duration;
use tracing::info;

/// MODCHECK - self-checking verification of streaming divisibility engines
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a verification session against the in-tree engine
    Run {
        /// Divisor N (> 1)
        #[arg(short, long, default_value_t = 5)]
        divisor: u64,

        /// Number of streams to drive
        #[arg(short, long, default_value_t = 256)]
        streams: u64,

        /// Stimulus policy: uniform | skewed
        #[arg(short, long, default_value = "uniform")]
        policy: StimulusPolicy,

        /// Maximum stream length in bits (<= 63)
        #[arg(short, long, default_value_t = 32)]
        max_len: u32,

        /// Random seed; the same seed reproduces the same run
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Session timeout in milliseconds (fatal when exceeded)
        #[arg(long, default_value_t = 60_000)]
        timeout_ms: u64,

        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the generated transition table for a divisor
    Table {
        /// Divisor N (> 1)
        divisor: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "modcheck=info,modcheck_verify=info,modcheck_sim=info",
        1 => "modcheck=debug,modcheck_verify=debug,modcheck_sim=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Run {
            divisor,
            streams,
            policy,
            max_len,
            seed,
            timeout_ms,
            json,
        } => {
            let config = SessionConfig {
                divisor,
                policy,
                num_streams: streams,
                max_len,
                seed,
                timeout: Duration::from_millis(timeout_ms),
                ..SessionConfig::default()
            };
            let session = Session::new(config)?;
            let report = session.run().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }

            if !report.passed {
                std::process::exit(1);
            }
            info!("session passed");
        }

        Commands::Table { divisor } => {
            let engine = SerialDivider::new(divisor)?;
            let table = engine.table();
            println!(
                "transition table for divisor {} ({} states, accepting state 0)",
                table.divisor(),
                table.num_states()
            );
            for state in 0..table.num_states() {
                println!(
                    "  state {:>3}: bit 0 -> {:>3}, bit 1 -> {:>3}",
                    state,
                    table.next(state, false),
                    table.next(state, true)
                );
            }
        }
    }

    Ok(())
}
