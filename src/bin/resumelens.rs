//! CLI binary for resumelens.
//!
//! A thin shim over the library crate: wires the filesystem collaborators
//! under `--data-dir`, resolves a vision provider from flags/environment,
//! and drives one submission with a live status spinner.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resumelens::services::local::{DirStorage, JsonDirKv};
use resumelens::services::vision::VisionFeedback;
use resumelens::{
    resolve_source, ProgressHandle, SubmissionConfig, SubmissionPhase, SubmissionPipeline,
    SubmissionProgress, SubmissionRequest,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner bound to pipeline status ─────────────────────────────────────────

/// Terminal status observer: one spinner whose message tracks the
/// pipeline's phase label.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SubmissionProgress for CliProgress {
    fn on_status(&self, phase: &SubmissionPhase) {
        match phase {
            SubmissionPhase::Complete => {
                self.bar.finish_and_clear();
            }
            SubmissionPhase::Failed(_) => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", red("✘"), phase.label());
            }
            _ => self.bar.set_message(phase.label()),
        }
    }

    fn on_invalid(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), message);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a resume against a pasted job description
  resumelens resume.pdf --company "Acme" --job-title "Staff Engineer" \
      --job-description "Design and ship Rust services."

  # Read the job description from a file, keep artifacts under ./hunt
  resumelens resume.pdf -c Acme -t "Staff Engineer" \
      --job-description-file posting.txt --data-dir hunt

  # Resume straight from a URL, specific provider and model
  resumelens https://example.com/cv.pdf -c Acme -t "Platform Engineer" \
      -d "Kubernetes, Rust, on-call." --provider anthropic \
      --model claude-sonnet-4-20250514

  # Machine-readable output (the persisted record as JSON)
  resumelens resume.pdf -c Acme -t SRE -d "Keep it up." --json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           OpenAI API key
  ANTHROPIC_API_KEY        Anthropic API key
  GEMINI_API_KEY           Google Gemini API key
  RESUMELENS_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  RESUMELENS_MODEL         Override model ID
  PDFIUM_LIB_PATH          Path to an existing libpdfium library

SETUP:
  1. Set an API key:   export OPENAI_API_KEY=sk-...
  2. Make the pdfium library findable (system package, or PDFIUM_LIB_PATH,
     or drop libpdfium next to the executable).
  3. Analyze:          resumelens resume.pdf -c Acme -t "Engineer" -d "..."

  Artifacts land under <data-dir>/files, records under <data-dir>/records
  as resume-<id>.json.
"#;

/// Analyze a résumé against a job description using a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "resumelens",
    version,
    about = "Job-targeted resume critique: rasterised preview + structured AI feedback",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local resume PDF path or HTTP/HTTPS URL.
    resume: String,

    /// Company the candidate is applying to.
    #[arg(short, long, env = "RESUMELENS_COMPANY")]
    company: String,

    /// Job title being applied for.
    #[arg(short = 't', long, env = "RESUMELENS_JOB_TITLE")]
    job_title: String,

    /// Job description text (mutually exclusive with --job-description-file).
    #[arg(short = 'd', long, conflicts_with = "job_description_file")]
    job_description: Option<String>,

    /// Read the job description from a text file.
    #[arg(long)]
    job_description_file: Option<PathBuf>,

    /// Directory for stored artifacts and records.
    #[arg(long, env = "RESUMELENS_DATA_DIR", default_value = "submissions")]
    data_dir: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "RESUMELENS_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "RESUMELENS_PROVIDER")]
    provider: Option<String>,

    /// Max LLM output tokens for the critique.
    #[arg(long, env = "RESUMELENS_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUMELENS_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Deadline in seconds for each storage / KV / AI call (0 = none).
    #[arg(long, env = "RESUMELENS_CALL_TIMEOUT", default_value_t = 0)]
    call_timeout: u64,

    /// HTTP download timeout for URL resumes, in seconds.
    #[arg(long, env = "RESUMELENS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the persisted record as JSON instead of a summary.
    #[arg(long, env = "RESUMELENS_JSON")]
    json: bool,

    /// Disable the status spinner.
    #[arg(long, env = "RESUMELENS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUMELENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the requested result.
    #[arg(short, long, env = "RESUMELENS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the user-facing feedback; keep library logs at
    // error level unless the user asks for more.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Inputs ───────────────────────────────────────────────────────────
    let job_description = match (&cli.job_description, &cli.job_description_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {path:?}"))?,
        (None, None) => anyhow::bail!(
            "Provide the job description via --job-description or --job-description-file"
        ),
    };

    let config = build_config(&cli)?;

    let resume = resolve_source(&cli.resume, config.download_timeout_secs)
        .await
        .context("Failed to read the resume")?;

    // ── Collaborators ────────────────────────────────────────────────────
    let storage = Arc::new(DirStorage::new(cli.data_dir.join("files")));
    let records = JsonDirKv::new(cli.data_dir.join("records"));
    let ai = VisionFeedback::from_config(&config).context("No usable LLM provider")?;

    let mut pipeline = SubmissionPipeline::new(storage, Arc::new(records), Arc::new(ai))
        .with_config(config);

    if show_progress {
        let progress = CliProgress::new();
        pipeline = pipeline.with_progress(progress as ProgressHandle);
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = pipeline
        .submit(SubmissionRequest {
            company_name: cli.company.clone(),
            job_title: cli.job_title.clone(),
            job_description,
            resume,
        })
        .await
        .context("Submission failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.record)?);
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{} Analysis complete for {} at {}  {}",
            green("✔"),
            bold(&cli.job_title),
            bold(&cli.company),
            dim(&format!("({}ms)", outcome.stats.total_duration_ms)),
        );
        eprintln!("   submission  {}", outcome.id);
        eprintln!("   resume      {}", outcome.record.resume_path);
        eprintln!("   preview     {}", outcome.record.image_path);
    }

    println!("{}", serde_json::to_string_pretty(&outcome.record.feedback)?);
    Ok(())
}

/// Map CLI args to `SubmissionConfig`.
fn build_config(cli: &Cli) -> Result<SubmissionConfig> {
    let mut builder = SubmissionConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if cli.call_timeout > 0 {
        builder = builder.collaborator_timeout_secs(cli.call_timeout);
    }

    let mut config = builder.build().context("Invalid configuration")?;
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    Ok(config)
}
