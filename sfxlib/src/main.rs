//! sfxlib CLI - build a sound effect library for a topic.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sfxlib::prelude::*;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Generate sound effects for a topic, upload them, and record them in a ledger
#[derive(Parser)]
#[command(name = "sfxlib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Topic to generate sound effects for (asked interactively if omitted)
    #[arg(short, long)]
    topic: Option<String>,

    /// Number of prompts to request
    #[arg(short = 'n', long, default_value_t = sfxlib::prompts::DEFAULT_PROMPT_COUNT)]
    count: usize,

    /// Ledger file rows are appended to
    #[arg(short, long, default_value = sfxlib::ledger::DEFAULT_LEDGER_PATH)]
    ledger: PathBuf,

    /// Directory generated clips are written to
    #[arg(short, long, default_value = sfxlib::effects::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Model used to generate prompts
    #[arg(short, long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Delete each local clip after it is uploaded and recorded
    #[arg(long)]
    delete_uploaded: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let topic = match cli.topic.clone() {
        Some(topic) => topic,
        None => match read_topic() {
            Ok(topic) => topic,
            Err(e) => {
                tracing::error!("failed to read topic: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli, &topic)) {
        Ok(summary) => {
            println!(
                "Uploaded {} of {} sound effects for \"{}\"",
                summary.uploaded(),
                summary.reports.len(),
                summary.topic
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(transient = e.is_transient(), "{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sfxlib={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Ask for the topic on stdin. Only the line ending is stripped.
fn read_topic() -> io::Result<String> {
    print!("Enter the topic: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

async fn run(cli: Cli, topic: &str) -> Result<RunSummary> {
    let mut settings = Settings::from_env()
        .with_prompt_count(cli.count)
        .with_ledger_path(cli.ledger)
        .with_output_dir(cli.output_dir)
        .with_delete_uploaded(cli.delete_uploaded);
    if let Some(model) = cli.model {
        settings = settings.with_model(model);
    }

    let pipeline = DefaultPipeline::from_settings(&settings)?;
    pipeline.run(topic).await
}
