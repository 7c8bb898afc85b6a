//! Input staging: load the PDF that a submission will upload.
//!
//! A [`StagedFile`] is the in-memory upload: its bytes plus the filename the
//! backend will see in the multipart `file` part. Staging validates the `%PDF`
//! magic bytes so a wrong file is rejected locally instead of costing a
//! backend round trip.

use crate::error::WorkflowError;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready to be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    name: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    /// Stage an in-memory upload.
    ///
    /// Rejects data that does not start with `%PDF`.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, WorkflowError> {
        let name = name.into();
        if !is_pdf(&bytes) {
            let magic = bytes.iter().take(PDF_MAGIC.len()).copied().collect();
            return Err(WorkflowError::NotAPdf { name, magic });
        }
        Ok(Self { name, bytes })
    }

    /// Read and stage a PDF from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => WorkflowError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => WorkflowError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = upload_name(path);
        debug!("Staged {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(name, bytes)
    }

    /// Filename sent with the upload.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check the `%PDF` magic bytes.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Final path component, or `upload.pdf` when the path has none.
fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload.pdf".to_string())
}
