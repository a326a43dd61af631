use anyhow::{Context, Result, bail};
use auditedge_engine::{
    Auditor,
    config::{self, AuditConfig},
};
use clap::{Args, Parser, Subcommand};
use console::{Term, style};
use dialoguer::{Password, theme::ColorfulTheme};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

mod report;

#[derive(Parser, Debug)]
#[command(
    name = "auditedge",
    version,
    about = "A CLI tool for auditing smart contracts using AI."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyzes a smart contract file.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Path to the contract source file
    file: PathBuf,

    /// Gemini API key (falls back to GEMINI_API_KEY, then an interactive prompt)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use (overrides .auditedge/config.json)
    #[arg(long)]
    model: Option<String>,

    /// Print the normalized result as JSON instead of a report
    #[arg(long)]
    json: bool,
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("info,auditedge=debug,auditedge_engine=debug")
    } else {
        EnvFilter::new("warn,auditedge=info,auditedge_engine=info")
    };

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Resolves `file` against the current directory and checks it is a readable file.
fn resolve_contract_path(file: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let path = cwd.join(file);

    if !path.exists() {
        bail!("File does not exist: {}", path.display());
    }
    if path.is_dir() {
        bail!("This is a directory, not a file: {}", path.display());
    }
    Ok(path)
}

fn resolve_api_key(explicit: Option<String>) -> Result<String> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        debug!("Using API key from command line");
        return Ok(key);
    }
    if let Some(key) = config::credential_from_env() {
        debug!("Using API key from {}", config::API_KEY_ENV);
        return Ok(key);
    }

    if !Term::stderr().is_term() {
        bail!(
            "No API key provided: pass --api-key or set {}",
            config::API_KEY_ENV
        );
    }

    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your Gemini API key")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("API key cannot be empty.")
            } else {
                Ok(())
            }
        })
        .interact()
        .context("Failed to read API key")
}

fn spinner(msg: &str) -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn check(args: CheckArgs) -> Result<()> {
    let contract_path = resolve_contract_path(&args.file)?;
    eprintln!(
        "{} {}",
        style("Checking file at path:").dim(),
        contract_path.display()
    );

    let contract = tokio::fs::read_to_string(&contract_path)
        .await
        .with_context(|| format!("Failed to read {}", contract_path.display()))?;

    let work_dir = std::env::current_dir().context("Failed to determine current directory")?;
    let mut audit_config: AuditConfig = config::load_config(&work_dir).await?;
    if let Some(model) = args.model {
        audit_config.model = model;
    }

    let api_key = resolve_api_key(args.api_key)?;
    let auditor = Auditor::from_config(api_key, &audit_config)?;
    info!(model = %audit_config.model, "Analyzing {}", contract_path.display());

    let progress = spinner("Analyzing smart contract...");
    let outcome = auditor.analyze(&contract).await;
    progress.finish_and_clear();
    let result = outcome.context("Analysis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report::render(&result));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let outcome = match cli.command {
        Command::Check(args) => check(args).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{} {:#}",
                style("An error occurred during analysis:").bold().red(),
                e
            );
            ExitCode::FAILURE
        }
    }
}
