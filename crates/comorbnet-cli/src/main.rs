#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use comorbnet_core::config::load_config;
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "comorbnet: disease comorbidity networks from matched cohorts",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: ./comorbnet.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Count every cause/outcome pair from a cohort directory",
        after_help = "EXAMPLES:\n    comorbnet build --cohorts data/matched --out full.csv --final edges.csv"
    )]
    Build(cmd::build::BuildArgs),

    #[command(
        about = "Write the zero-overlap baseline table from cohort totals",
        after_help = "EXAMPLES:\n    comorbnet baseline --cohorts data/matched --out baseline.csv"
    )]
    Baseline(cmd::baseline::BaselineArgs),

    #[command(
        about = "Apply a follow-up delta table to a previous full table",
        after_help = "EXAMPLES:\n    comorbnet merge --previous fu1.csv --delta delta2.csv --out fu2.csv"
    )]
    Merge(cmd::merge::MergeArgs),

    #[command(
        about = "Drop pairs with any cell below the suppression threshold",
        after_help = "EXAMPLES:\n    comorbnet filter --input full.csv --out edges.csv --threshold 5"
    )]
    Filter(cmd::filter::FilterArgs),

    #[command(
        about = "Build the network and compute metrics and clusters",
        after_help = "EXAMPLES:\n    comorbnet analyze --edges edges.csv --out analysis.json\n    comorbnet analyze --edges edges.csv --scope whole-graph --json"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("COMORBNET_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "comorbnet=debug,info"
        } else {
            "comorbnet=info,warn"
        })
    });

    let format = env::var("COMORBNET_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    let result = match cli.command {
        Commands::Build(ref args) => cmd::build::run_build(args, &config, output),
        Commands::Baseline(ref args) => cmd::baseline::run_baseline(args, &config, output),
        Commands::Merge(ref args) => cmd::merge::run_merge(args, output),
        Commands::Filter(ref args) => cmd::filter::run_filter(args, &config, output),
        Commands::Analyze(ref args) => cmd::analyze::run_analyze(args, &config, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    };

    if result.is_ok() {
        info!("done");
    }
    result
}
