use anyhow::Context;
use clap::Parser;
use rscart::cli::{Cli, Command};
use rscart::config::Catalog;
use rscart::error::exit_code;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(cart_err) = e.downcast_ref::<rscart::Error>() {
                ExitCode::from(cart_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Validate CLI arguments
    cli.validate()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Invalid arguments")?;

    let interactive = cli.command.is_none();
    init_logging(&cli, interactive)?;

    match &cli.command {
        Some(Command::Completions { shell }) => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "rscart", &mut std::io::stdout());
        }
        Some(Command::Total { actions, json, csv }) => {
            let catalog = load_catalog(&cli)?;
            rscart::commands::total::run(&catalog, actions, cli.code.as_deref(), *json, *csv)?;
        }
        None => {
            let catalog = load_catalog(&cli)?;
            rscart::tui::run(&catalog, cli.code.as_deref())?;
        }
    }

    Ok(())
}

fn load_catalog(cli: &Cli) -> anyhow::Result<Catalog> {
    let catalog = Catalog::load(cli.catalog.as_deref()).with_context(|| match &cli.catalog {
        Some(path) => format!("Failed to load catalog {}", path.display()),
        None => "Failed to load built-in catalog".to_string(),
    })?;
    tracing::info!(items = catalog.items.len(), "cart ready");
    Ok(catalog)
}

/// Headless commands log to stderr. The interactive view owns the terminal,
/// so it only logs when a log file is given.
fn init_logging(cli: &Cli, interactive: bool) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("rscart=debug")
    } else {
        EnvFilter::new("rscart=info")
    };

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .with(filter)
                .init();
        }
        None if !interactive => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .without_time(),
                )
                .with(filter)
                .init();
        }
        None => {}
    }

    Ok(())
}
