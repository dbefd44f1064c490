//! `Tabula` command-line shell.
//!
//! Runs statements against a fresh in-memory database and prints each
//! result as one line of JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tabula::{Database, DatabaseConfig, Param};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `Tabula` command-line shell.
#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Run statements against an in-memory tabula database", long_about = None)]
struct Cli {
    /// Statements to run, in order. Each may hold several `;`-separated statements.
    statements: Vec<String>,

    /// Read statements from a script file, run before the positional ones.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// A parameter as JSON (number, string, bool, null, object or array of objects).
    #[arg(short, long = "param", value_name = "JSON")]
    params: Vec<String>,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => DatabaseConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DatabaseConfig::default(),
    };

    let params = cli
        .params
        .iter()
        .map(|raw| {
            serde_json::from_str::<Param>(raw)
                .with_context(|| format!("Invalid parameter: {raw}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut scripts = Vec::new();
    if let Some(path) = &cli.script {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        scripts.push(script);
    }
    scripts.extend(cli.statements);

    if scripts.is_empty() {
        bail!("no statements given");
    }

    let mut db = Database::with_config(config);
    for script in &scripts {
        for result in db.execute_script(script, &params)? {
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    tracing::info!(tables = ?db.table_names(), "done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tabula=debug,tabula_query=debug,tabula_store=debug"
    } else {
        "tabula=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
