use clap::Parser;
use std::path::PathBuf;
use std::{fs, process};
use tracing::{error, info};
use zero_perda_import::config::Config;
use zero_perda_import::{import, setup, ImportSession};

const DEFAULT_CONFIG_PATH: &str = ".config/zero_perda.toml";

/// Preview the line items found in an invoice PDF.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Invoice PDF to read
    pdf: PathBuf,
    /// TOML settings file; defaults apply when it is missing
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Print the drafts saving every item would create
    #[arg(long)]
    drafts: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = Config::load_or_default(&cli.config)?;
    setup::init(&cfg);

    let bytes = fs::read(&cli.pdf)?;
    info!(path = %cli.pdf.display(), bytes = bytes.len(), "Importing invoice");

    let report = match import::import_invoice_async(bytes).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Import failed");
            eprintln!("\n✗ Error: {e}\n");
            process::exit(1);
        }
    };

    if let Some(hint) = report.hint() {
        println!("{hint}");
        return Ok(());
    }

    if cli.drafts {
        // Preview what saving everything would create.
        let mut session = ImportSession::new(report.items);
        session.toggle_select_all();
        let drafts = session.drafts(&cfg.import)?;
        println!("{}", serde_json::to_string_pretty(&drafts)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
