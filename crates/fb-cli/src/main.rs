//! CLI frontend for the Fabula story engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fabula",
    about = "Fabula - check, test and play adventure-game story scripts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse story files and report structural warnings
    Check {
        /// Story files, one per act
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Fail when any warning is reported
        #[arg(long)]
        strict: bool,
    },

    /// Run a headless scenario and report failed assertions
    Run {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Print the captured event log as JSON
        #[arg(long)]
        events: bool,

        /// Print the full report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Play a story interactively on the terminal
    Play {
        /// Story files, one per act, in play order
        #[arg(required = true)]
        acts: Vec<PathBuf>,

        /// Pause after every line until Enter is pressed
        #[arg(long)]
        wait: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { files, strict } => commands::check::run(&files, strict),
        Commands::Run {
            scenario,
            events,
            json,
        } => commands::run::run(&scenario, events, json),
        Commands::Play { acts, wait } => commands::play::run(&acts, wait),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
