//! Configuration types for the upload/export workflow.
//!
//! All workflow behaviour is controlled through [`WorkflowConfig`], built via
//! its [`WorkflowConfigBuilder`]. Table-extraction knobs live in the nested
//! [`ExtractOptions`] so the extractor can be driven on its own.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};

/// Default backend upload endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/v1/etc/upload";

/// Default worksheet name for exported tables.
pub const DEFAULT_SHEET_NAME: &str = "ETCデータ";

/// Default filename offered for the spreadsheet download.
pub const DEFAULT_DOWNLOAD_FILENAME: &str = "etc_data.xlsx";

/// Configuration for an export workflow.
///
/// # Example
/// ```rust
/// use pdf2sheet::WorkflowConfig;
///
/// let config = WorkflowConfig::builder()
///     .endpoint("http://127.0.0.1:8000/api/v1/etc/upload")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Backend URL receiving the multipart upload.
    pub endpoint: String,

    /// Upper bound on one backend round trip, in seconds. Default: 120.
    ///
    /// `None` waits indefinitely; the submission stays in `Submitting` until
    /// the backend answers.
    pub request_timeout_secs: Option<u64>,

    /// Worksheet name for spreadsheet exports. Default: `ETCデータ`.
    pub sheet_name: String,

    /// Filename offered for the spreadsheet download. Default: `etc_data.xlsx`.
    pub download_filename: String,

    /// Table extraction options.
    pub extract: ExtractOptions,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: Some(120),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            download_filename: DEFAULT_DOWNLOAD_FILENAME.to_string(),
            extract: ExtractOptions::default(),
        }
    }
}

impl WorkflowConfig {
    /// Create a new builder for `WorkflowConfig`.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WorkflowConfig`].
#[derive(Debug)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Wait for the backend without any time limit.
    pub fn no_timeout(mut self) -> Self {
        self.config.request_timeout_secs = None;
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn download_filename(mut self, name: impl Into<String>) -> Self {
        self.config.download_filename = name.into();
        self
    }

    pub fn separator_mode(mut self, mode: SeparatorMode) -> Self {
        self.config.extract.separator = mode;
        self
    }

    pub fn duplicate_headers(mut self, policy: DuplicateHeaders) -> Self {
        self.config.extract.duplicate_headers = policy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig, WorkflowError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(WorkflowError::InvalidConfig(format!(
                "endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(WorkflowError::InvalidConfig(
                "request timeout must be ≥ 1s (use no_timeout() to disable)".into(),
            ));
        }
        if c.download_filename.trim().is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "download filename must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What a submission should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputMode {
    /// Show the backend's Markdown text as-is.
    Display,
    /// Export the backend's table as an XLSX download.
    Spreadsheet,
}

impl OutputMode {
    /// Value sent in the `output_format` form field.
    pub fn wire_format(self) -> &'static str {
        match self {
            OutputMode::Display => "markdown",
            OutputMode::Spreadsheet => "excel",
        }
    }
}

// ── Extraction options ───────────────────────────────────────────────────

/// Knobs for [`crate::pipeline::extract::extract_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractOptions {
    pub separator: SeparatorMode,
    pub duplicate_headers: DuplicateHeaders,
}

/// How the line after the header is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeparatorMode {
    /// Line 2 is always discarded, whatever it contains. (default)
    #[default]
    SkipSecondLine,
    /// Line 2 is discarded only when it looks like `|---|---|`; otherwise it
    /// is read as the first data row.
    Validated,
}

/// What happens when two header cells carry the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicateHeaders {
    /// Later columns overwrite earlier ones under the shared key. (default)
    #[default]
    Overwrite,
    /// Repeated names get `_2`, `_3`, … so every column survives.
    Suffix,
}
