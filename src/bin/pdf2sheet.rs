//! CLI binary for pdf2sheet.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `WorkflowConfig`, runs one submission, and saves or prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2sheet::{
    write_atomic, Artifact, DuplicateHeaders, ErrorKind, OutputMode, Outcome, SeparatorMode,
    StagedFile, Workflow, WorkflowConfig, WorkflowObserver,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
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

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Terminal observer: a spinner while the backend works, then one status line.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new(file_name: &str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Uploading");
        bar.set_message(file_name.to_string());
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for SpinnerObserver {
    fn on_progress(&self, active: bool) {
        if active {
            self.bar.enable_steady_tick(Duration::from_millis(80));
        } else {
            self.bar.finish_and_clear();
        }
    }

    fn on_success(&self, mode: OutputMode) {
        let what = match mode {
            OutputMode::Display => "Table extracted",
            OutputMode::Spreadsheet => "Spreadsheet ready",
        };
        eprintln!("{} {}", green("✔"), bold(what));
    }

    fn on_error(&self, kind: ErrorKind, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}  {}", red("✘"), red(message), dim(&format!("({kind:?})")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the extracted Markdown table
  pdf2sheet statement.pdf

  # Export to etc_data.xlsx in the current directory
  pdf2sheet --format excel statement.pdf

  # Export to a chosen path
  pdf2sheet --format excel statement.pdf -o out/april.xlsx

  # Talk to a remote backend, wait as long as it takes
  pdf2sheet --endpoint https://etc.example.com/api/v1/etc/upload --no-timeout statement.pdf

  # Structured output (table rows as JSON)
  pdf2sheet --format excel --json statement.pdf > rows.json

ENVIRONMENT VARIABLES:
  PDF2SHEET_ENDPOINT   Backend upload URL
  PDF2SHEET_FORMAT     markdown | excel
  PDF2SHEET_TIMEOUT    Request timeout in seconds
  RUST_LOG             Override log filter (e.g. pdf2sheet=debug)
"#;

/// Extract the table from a PDF statement as Markdown or XLSX.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2sheet",
    version,
    about = "Extract the table from a PDF statement as Markdown or XLSX",
    long_about = "Upload a PDF to the extraction backend and either print the Markdown table it \
returns or convert that table into a single-sheet XLSX workbook.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Output format.
    #[arg(short, long, env = "PDF2SHEET_FORMAT", value_enum, default_value = "markdown")]
    format: FormatArg,

    /// Backend upload URL.
    #[arg(long, env = "PDF2SHEET_ENDPOINT", default_value = pdf2sheet::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Write output here. Markdown defaults to stdout; XLSX to the download filename.
    #[arg(short, long, env = "PDF2SHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, env = "PDF2SHEET_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..),
          conflicts_with = "no_timeout")]
    timeout: u64,

    /// Wait for the backend indefinitely.
    #[arg(long)]
    no_timeout: bool,

    /// Worksheet name for XLSX output.
    #[arg(long, env = "PDF2SHEET_SHEET_NAME", default_value = pdf2sheet::config::DEFAULT_SHEET_NAME)]
    sheet_name: String,

    /// Only skip the second line when it is a `|---|` separator row.
    #[arg(long)]
    strict_separator: bool,

    /// Keep repeated header names as separate columns (`Name`, `Name_2`, …).
    #[arg(long)]
    suffix_duplicate_headers: bool,

    /// Print the outcome as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2SHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2SHEET_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Excel,
}

impl From<FormatArg> for OutputMode {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markdown => OutputMode::Display,
            FormatArg::Excel => OutputMode::Spreadsheet,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress; library INFO logs would only garble it.
    let show_progress = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let file = StagedFile::from_path(&cli.input)
        .await
        .context("Failed to read input")?;

    let mut workflow = Workflow::http(config).context("Failed to create HTTP client")?;
    if show_progress {
        workflow = workflow.with_observer(SpinnerObserver::new(file.name()));
    }
    workflow.select_file(file)?;

    let outcome = match workflow.submit(cli.format.into()).await {
        Ok(outcome) => outcome,
        Err(e) => return submission_failed(e, show_progress),
    };

    match &outcome {
        Outcome::Displayed { markdown } => match &cli.output {
            Some(path) => {
                write_atomic(path, markdown.as_bytes())?;
                if !cli.quiet {
                    eprintln!("   {}", bold(&path.display().to_string()));
                }
            }
            None if !cli.json => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(markdown.as_bytes())
                    .context("Failed to write to stdout")?;
                if !markdown.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
            None => {}
        },
        Outcome::Exported(artifact) => {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&artifact.filename));
            write_atomic(&path, &artifact.bytes)?;
            if !cli.quiet {
                print_summary(artifact, &path);
            }
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    }

    Ok(ExitCode::SUCCESS)
}

/// Exit status for a failed submission. When the spinner observer is
/// attached it has already printed the message, so only the status remains.
fn submission_failed(err: pdf2sheet::WorkflowError, reported: bool) -> Result<ExitCode> {
    if reported {
        Ok(ExitCode::FAILURE)
    } else {
        Err(anyhow::Error::new(err).context("Submission failed"))
    }
}

/// Map CLI args to `WorkflowConfig`.
fn build_config(cli: &Cli) -> Result<WorkflowConfig> {
    let mut builder = WorkflowConfig::builder()
        .endpoint(cli.endpoint.clone())
        .sheet_name(cli.sheet_name.clone());

    builder = if cli.no_timeout {
        builder.no_timeout()
    } else {
        builder.request_timeout_secs(cli.timeout)
    };
    if cli.strict_separator {
        builder = builder.separator_mode(SeparatorMode::Validated);
    }
    if cli.suffix_duplicate_headers {
        builder = builder.duplicate_headers(DuplicateHeaders::Suffix);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(artifact: &Artifact, path: &std::path::Path) {
    let rows = match artifact.row_count() {
        Some(n) => format!("{n} rows"),
        None => "as sent by backend".to_string(),
    };
    eprintln!(
        "   {}  {}  {}",
        bold(&path.display().to_string()),
        dim(&rows),
        dim(&format!("{} bytes", artifact.bytes.len())),
    );
}
