//! Submission results and writing them to disk.

use crate::error::WorkflowError;
use crate::pipeline::extract::TableDocument;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// A finished spreadsheet waiting to be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Name the file should be saved under.
    pub filename: String,
    /// XLSX bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// The table the workbook was built from. `None` when the backend sent
    /// a ready-made spreadsheet and no local conversion happened.
    pub table: Option<TableDocument>,
}

impl Artifact {
    /// Number of data rows, when the table is known.
    pub fn row_count(&self) -> Option<usize> {
        self.table.as_ref().map(|t| t.rows.len())
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Display mode: the backend's text, verbatim.
    Displayed { markdown: String },
    /// Spreadsheet mode: a workbook to save.
    Exported(Artifact),
}

/// Write `bytes` to `path` atomically.
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `path`, so readers never observe a half-written file.
pub fn write_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), WorkflowError> {
    let path = path.as_ref();
    let fail = |source: std::io::Error| WorkflowError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(fail)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.flush().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
