//! Error types for the pdf2sheet library.
//!
//! Every failure a submission can hit is a [`WorkflowError`]. The workflow
//! catches them at its boundary, reports them through the observer, and
//! returns to idle; the `Result` handed back to the caller is informational.
//!
//! [`WorkflowError::kind`] buckets each variant into one of four user-facing
//! categories:
//!
//! * [`ErrorKind::Validation`] — the request never left the process (no file
//!   staged, file unreadable, not a PDF).
//! * [`ErrorKind::Backend`] — the extraction backend answered with a
//!   non-success status.
//! * [`ErrorKind::Conversion`] — the backend succeeded but its table could not
//!   be turned into a spreadsheet.
//! * [`ErrorKind::Unexpected`] — transport failures, timeouts, and anything
//!   else.

use std::path::PathBuf;
use thiserror::Error;

/// Shown when `submit` is called with nothing staged.
pub const MSG_NO_FILE: &str = "Please select a file.";

/// Used when a failed backend response carries no usable message.
pub const MSG_BACKEND_FALLBACK: &str = "An error occurred while processing the file.";

/// Reported for every spreadsheet serialization failure, whatever the cause.
pub const MSG_CONVERSION_FAILED: &str = "Failed to generate the Excel file.";

/// Used when an unexpected failure has no description of its own.
pub const MSG_UNEXPECTED: &str = "An unexpected error occurred.";

/// Shown when a second submission arrives while one is in flight.
pub const MSG_BUSY: &str = "A submission is already in progress.";

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Backend,
    Conversion,
    Unexpected,
}

/// All errors returned by the pdf2sheet library.
#[derive(Debug, Error)]
pub enum WorkflowError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// `submit` was called before any file was selected.
    #[error("{}", MSG_NO_FILE)]
    NoFileSelected,

    /// A submission is already running on this workflow.
    #[error("{}", MSG_BUSY)]
    Busy,

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The extraction backend answered with a non-success status.
    ///
    /// `message` has already been resolved from the response body.
    #[error("{message}")]
    Backend { status: u16, message: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The extracted table could not be serialized into a workbook.
    ///
    /// `detail` keeps the underlying cause for logs; the display text is
    /// always [`MSG_CONVERSION_FAILED`].
    #[error("{}", MSG_CONVERSION_FAILED)]
    Conversion { detail: String },

    // ── Unexpected errors ─────────────────────────────────────────────────
    /// The request could not be sent or its response could not be read.
    #[error("Request to '{endpoint}' failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The backend did not answer within the configured timeout.
    #[error("Backend did not respond within {secs}s")]
    Timeout { secs: u64 },

    /// A success response whose body could not be understood.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error. An empty description falls back to
    /// [`MSG_UNEXPECTED`] when surfaced.
    #[error("{0}")]
    Internal(String),
}

impl WorkflowError {
    /// Classify this error into its user-facing category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NoFileSelected
            | WorkflowError::Busy
            | WorkflowError::FileNotFound { .. }
            | WorkflowError::PermissionDenied { .. }
            | WorkflowError::NotAPdf { .. }
            | WorkflowError::InvalidConfig(_) => ErrorKind::Validation,
            WorkflowError::Backend { .. } => ErrorKind::Backend,
            WorkflowError::Conversion { .. } => ErrorKind::Conversion,
            WorkflowError::Transport { .. }
            | WorkflowError::Timeout { .. }
            | WorkflowError::MalformedResponse(_)
            | WorkflowError::OutputWriteFailed { .. }
            | WorkflowError::Internal(_) => ErrorKind::Unexpected,
        }
    }

    /// The text shown to the user for this error.
    pub fn user_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() {
            MSG_UNEXPECTED.to_string()
        } else {
            msg
        }
    }
}
