//! Route Linter CLI - check frontend HTTP calls against backend routes.
//!
//! Exit codes: 0 when nothing looks wrong, 1 when at least one call is a
//! method mismatch, near miss or orphan, 2 on any fatal error.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use route_linter::{report, scan, Analyzer, LinterConfig};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when --config is absent.
const DEFAULT_CONFIG: &str = "route-linter.toml";

#[derive(Parser)]
#[command(name = "route-linter")]
#[command(about = "Route Linter - find frontend calls that don't match any backend route", long_about = None)]
struct Cli {
    /// Directory holding the backend sources
    #[arg(short, long)]
    backend: PathBuf,

    /// Directory holding the frontend sources
    #[arg(short, long)]
    frontend: PathBuf,

    /// Path to a route-linter.toml (default: ./route-linter.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(has_discrepancies) => std::process::exit(if has_discrepancies { 1 } else { 0 }),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// RUST_LOG wins; otherwise warnings only, or debug with -v.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = match &cli.config {
        Some(path) => LinterConfig::load_strict(path)?,
        None => LinterConfig::load(Path::new(DEFAULT_CONFIG)),
    };
    debug!(?config, "configuration loaded");

    let backend = scan::collect_units(&cli.backend)
        .with_context(|| format!("reading backend sources from {}", cli.backend.display()))?;
    let frontend = scan::collect_units(&cli.frontend)
        .with_context(|| format!("reading frontend sources from {}", cli.frontend.display()))?;

    let analysis = Analyzer::new(config).analyze(&backend, &frontend)?;

    match cli.format {
        Format::Text => print!("{}", report::render_text(&analysis)),
        Format::Json => println!("{}", report::render_json(&analysis)?),
    }

    Ok(analysis.has_discrepancies())
}
