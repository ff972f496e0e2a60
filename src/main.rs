use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rusty_sheet_sql::server::Server;
use rusty_sheet_sql::spreadsheet::criteria::Criteria;
use rusty_sheet_sql::workspace::Workspace;
use std::io;
use std::path::PathBuf;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rusty-sheet-sql")]
#[command(author, version, about = "Query a directory of spreadsheets as SQL tables over JSON-RPC", long_about = None)]
struct Cli {
    /// Directory holding the workbooks
    directory: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Evaluate statements in memory instead of building the relational store
    #[arg(long)]
    no_store: bool,

    /// Rows sampled per column for type inference
    #[arg(long, default_value_t = 10)]
    analyze_rows: usize,

    /// Sheet name pattern never loaded as a table (repeatable)
    #[arg(long = "exclude-sheet", value_name = "PATTERN")]
    exclude_sheets: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut criteria = Criteria {
        analyze_rows: cli.analyze_rows,
        use_store: !cli.no_store,
        ..Criteria::default()
    };
    if !cli.exclude_sheets.is_empty() {
        criteria = criteria
            .with_excluded_sheets(&cli.exclude_sheets)
            .context("invalid sheet pattern")?;
    }

    let mut workspace = Workspace::new(criteria);
    if let Some(directory) = &cli.directory {
        match workspace.change_directory(directory) {
            Ok(change) => info!("{}: {}", change.message, change.new_directory),
            Err(e) => error!("Cannot load '{}': {}", directory.display(), e),
        }
    }

    let mut server = Server::new(workspace);
    server
        .serve(io::stdin().lock(), io::stdout().lock())
        .context("server stopped")?;
    info!("Server exited");
    Ok(())
}
