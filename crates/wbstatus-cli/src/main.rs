#![forbid(unsafe_code)]

mod cmd;
mod output;
mod source;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wbstatus: who did what on the workboard",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format (defaults to pretty on a TTY, text otherwise).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for --format json.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file (overrides WBSTATUS_CONFIG and ./wbstatus.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Compare two workboard snapshots",
        long_about = "List every task on either snapshot, marking the ones whose column changed.",
        after_help = "EXAMPLES:\n    # What moved yesterday\n    wbstatus diff -d cache --from 2024-03-01T09 --to 2024-03-02T09\n\n    # Emit machine-readable output\n    wbstatus diff -d cache --from 2024-03-01 --to 2024-03-02 --json"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        about = "Replay one task over a window",
        long_about = "Show each tracked field of a task at the start and end of the window, its actors, and when it last entered each workflow column.",
        after_help = "EXAMPLES:\n    # Inspect a single task\n    wbstatus task T123 -d cache --from 2024-03-01 --to 2024-03-02"
    )]
    Task(cmd::task::TaskArgs),

    #[command(
        about = "Per-person activity report",
        long_about = "Reconstruct every task that moved on the board (plus any named with --task) and summarise the highlights per person.",
        after_help = "EXAMPLES:\n    # Daily stand-up report\n    wbstatus report -d cache --from 2024-03-01T09 --to 2024-03-02T09\n\n    # Include tasks that did not move\n    wbstatus report -d cache --from 2024-03-01 --to 2024-03-02 --task T12 --task T40"
    )]
    Report(cmd::report::ReportArgs),
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = output::resolve_output_mode(cli.format, cli.json);
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Diff(ref args) => cmd::diff::run_diff(args, output),
        Commands::Task(ref args) => {
            let config = cmd::load_config(cli.config.as_deref(), &cwd, output)?;
            cmd::task::run_task(args, &config, output)
        }
        Commands::Report(ref args) => {
            let config = cmd::load_config(cli.config.as_deref(), &cwd, output)?;
            cmd::report::run_report(args, &config, output)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WBSTATUS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "wbstatus=debug,info"
        } else {
            "wbstatus=info,warn"
        })
    });

    let format = env::var("WBSTATUS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

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
