//! # pdf2sheet
//!
//! Upload a PDF statement to an extraction backend, then either show the
//! Markdown table it returns or turn that table into an XLSX download.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    stage a local file or in-memory upload (%PDF check)
//!  ├─ 2. Backend  one multipart POST: file + output_format
//!  ├─ 3. Reply    resolve error text, or decode { markdown } / spreadsheet
//!  ├─ 4. Extract  pipe table → header + rows (never fails)
//!  └─ 5. Sheet    rows → single-worksheet XLSX (spawn_blocking)
//! ```
//!
//! Display mode stops after step 3 and returns the backend text verbatim.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2sheet::{OutputMode, Outcome, StagedFile, Workflow, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workflow = Workflow::http(WorkflowConfig::default())?;
//!     workflow.select_file(StagedFile::from_path("statement.pdf").await?)?;
//!
//!     match workflow.submit(OutputMode::Display).await? {
//!         Outcome::Displayed { markdown } => println!("{markdown}"),
//!         Outcome::Exported(artifact) => pdf2sheet::write_atomic(&artifact.filename, &artifact.bytes)?,
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The extractor can be used on its own:
//!
//! ```rust
//! let doc = pdf2sheet::extract("| Date | Amount |\n|---|---|\n| 04/01 | 1,200 |");
//! assert_eq!(doc.header, vec!["Date", "Amount"]);
//! assert_eq!(doc.rows[0].get("Amount"), Some("1,200"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2sheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! pdf2sheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DuplicateHeaders, ExtractOptions, OutputMode, SeparatorMode, WorkflowConfig,
    WorkflowConfigBuilder,
};
pub use error::{ErrorKind, WorkflowError};
pub use observer::{NoopObserver, SharedObserver, WorkflowObserver};
pub use output::{write_atomic, Artifact, Outcome};
pub use pipeline::backend::{ExtractionBackend, HttpBackend};
pub use pipeline::extract::{extract, extract_with, Row, TableDocument};
pub use pipeline::input::StagedFile;
pub use pipeline::response::BackendReply;
pub use pipeline::spreadsheet::build_workbook;
pub use workflow::{Event, Payload, Workflow, WorkflowState};
