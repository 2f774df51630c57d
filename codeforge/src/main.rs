//! codeforge: turn a software request into requirements, code, review,
//! documentation, tests and deployment notes.
//!
//!   codeforge "Build a CLI that converts CSV to JSON"
//!   codeforge --interactive            # follow-up requests from stdin
//!   codeforge --out ./runs "..."       # also save artifacts to disk
//!
//! In interactive mode each line is a new request that refines the previous
//! one. `reset` starts a fresh session, `quit` exits.
//!
//! Requires ANTHROPIC_API_KEY environment variable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use codeforge::output;
use codeforge::workspace::Workspace;
use codeforge::{LlmClient, Pipeline, PipelineReport, Settings};

#[derive(Parser)]
#[command(name = "codeforge", about = "Multi-agent software request pipeline")]
struct Args {
    /// The request to run. Optional with --interactive.
    instruction: Option<String>,

    /// Keep reading follow-up requests from stdin
    #[arg(long, short)]
    interactive: bool,

    /// Treat every request as new, ignoring previous runs
    #[arg(long)]
    no_follow_up: bool,

    /// Save artifacts of each run under this directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Config file (default: ~/.config/codeforge/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature (overrides config)
    #[arg(long)]
    temperature: Option<f32>,

    /// Attempts per model call (overrides config)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Lines of each artifact shown in the terminal
    #[arg(long, default_value_t = 20)]
    preview_lines: usize,

    /// Completion API endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codeforge=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.instruction.is_none() && !args.interactive {
        anyhow::bail!("Give a request, or use --interactive");
    }

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    if let Some(t) = args.temperature {
        settings.temperature = t;
    }
    if let Some(n) = args.max_retries {
        settings.max_retries = n;
    }

    let mut llm = LlmClient::new(args.api_key.clone());
    if let Some(url) = &args.base_url {
        llm = llm.with_base_url(url);
    }

    tracing::info!(
        model = %settings.model,
        max_retries = settings.max_retries,
        interactive = args.interactive,
        "Starting codeforge"
    );

    let mut pipeline = Pipeline::new(Arc::new(llm), settings);
    pipeline.set_follow_up(!args.no_follow_up);

    let mut last_ok = true;
    if let Some(instruction) = &args.instruction {
        last_ok = run_once(&mut pipeline, &args, instruction).await?;
    }

    if args.interactive {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        eprintln!("Enter a request (reset = new session, quit = exit):");
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            match line {
                "" => continue,
                "quit" | "exit" => break,
                "reset" => {
                    pipeline.reset();
                    eprintln!("Session reset.");
                }
                request => {
                    last_ok = run_once(&mut pipeline, &args, request).await?;
                }
            }
        }
    }

    if !last_ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one request, print the report, and save artifacts if asked.
async fn run_once(pipeline: &mut Pipeline, args: &Args, instruction: &str) -> Result<bool> {
    let report = pipeline.run(instruction).await;
    print!("{}", output::render_report(&report, args.preview_lines));

    if let Some(base) = &args.out {
        save(base, &report).await?;
    }
    Ok(report.is_success())
}

async fn save(base: &std::path::Path, report: &PipelineReport) -> Result<()> {
    let name = report.started_at.format("run-%Y%m%d-%H%M%S").to_string();
    let ws = Workspace::create(base, &name).await?;
    let files = ws.save_report(report).await?;
    tracing::info!(dir = %ws.root.display(), files = files.len(), "Artifacts saved");
    Ok(())
}
