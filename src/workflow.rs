//! The upload → convert → export state machine.
//!
//! ## Lifecycle
//!
//! ```text
//!            select_file
//!           ┌──────────┐
//!           ▼          │
//!   ┌────▶ Idle ───────┘
//!   │       │ submit(mode)   (rejected without a staged file)
//!   │       ▼
//!   │   Submitting ──────────────┐
//!   │       │ reply ok           │ reply not ok / transport / conversion
//!   │       ▼                    ▼
//!   │   Succeeded(payload)    Failed(message)
//!   │       │ settle             │ settle
//!   └───────┴────────────────────┘
//! ```
//!
//! [`WorkflowState::apply`] is the whole transition table; [`Workflow`] only
//! drives it. Each submission issues exactly one backend request. Nothing is
//! retried and nothing can be cancelled once sent; the configured timeout is
//! the only bound.
//!
//! ## Concurrency
//!
//! Session data lives behind one mutex. `submit` takes it twice: once to move
//! `Idle → Submitting`, once to commit the terminal state together with the
//! display text and error message. A reader therefore sees either the state
//! before a submission or the state after it, never a mix. A `submit` that
//! arrives while another is in flight is rejected with
//! [`WorkflowError::Busy`].

use crate::config::{OutputMode, WorkflowConfig};
use crate::error::{WorkflowError, MSG_UNEXPECTED};
use crate::observer::{NoopObserver, SharedObserver};
use crate::output::{Artifact, Outcome};
use crate::pipeline::backend::{ExtractionBackend, HttpBackend};
use crate::pipeline::extract::{extract_with, TableDocument};
use crate::pipeline::input::StagedFile;
use crate::pipeline::response::{parse_success, resolve_error_message, BackendReply, SuccessBody};
use crate::pipeline::spreadsheet::build_workbook;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ── State machine ────────────────────────────────────────────────────────────

/// Where the workflow is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Submitting(OutputMode),
    Succeeded(Payload),
    Failed(String),
}

/// What a successful submission delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Display text, verbatim from the backend.
    Display(String),
    /// A spreadsheet offered for download.
    Export { filename: String },
}

/// Inputs to [`WorkflowState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Submit(OutputMode),
    Completed(Payload),
    Errored(String),
    Settle,
}

impl WorkflowState {
    /// The state reached by applying `event`, or `None` if the event is not
    /// accepted in this state.
    pub fn apply(&self, event: Event) -> Option<WorkflowState> {
        match (self, event) {
            (WorkflowState::Idle, Event::Submit(mode)) => Some(WorkflowState::Submitting(mode)),
            (WorkflowState::Submitting(_), Event::Completed(p)) => Some(WorkflowState::Succeeded(p)),
            (WorkflowState::Submitting(_), Event::Errored(m)) => Some(WorkflowState::Failed(m)),
            (WorkflowState::Succeeded(_) | WorkflowState::Failed(_), Event::Settle) => {
                Some(WorkflowState::Idle)
            }
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::Submitting(_))
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Session {
    state: WorkflowState,
    staged: Option<StagedFile>,
    display: Option<String>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            staged: None,
            display: None,
            error: None,
        }
    }
}

// ── Workflow ─────────────────────────────────────────────────────────────────

/// Drives submissions against an [`ExtractionBackend`].
///
/// ```rust,no_run
/// use pdf2sheet::{OutputMode, Outcome, StagedFile, Workflow, WorkflowConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let workflow = Workflow::http(WorkflowConfig::default())?;
/// workflow.select_file(StagedFile::from_path("statement.pdf").await?)?;
/// if let Outcome::Exported(artifact) = workflow.submit(OutputMode::Spreadsheet).await? {
///     std::fs::write(&artifact.filename, &artifact.bytes)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Workflow<B> {
    backend: B,
    config: WorkflowConfig,
    observer: SharedObserver,
    session: Mutex<Session>,
}

impl Workflow<HttpBackend> {
    /// Workflow talking HTTP to `config.endpoint`.
    pub fn http(config: WorkflowConfig) -> Result<Self, WorkflowError> {
        let backend = HttpBackend::from_config(&config)?;
        Ok(Self::new(backend, config))
    }
}

impl<B: ExtractionBackend> Workflow<B> {
    pub fn new(backend: B, config: WorkflowConfig) -> Self {
        Self {
            backend,
            config,
            observer: Arc::new(NoopObserver),
            session: Mutex::new(Session::default()),
        }
    }

    /// Report side effects to `observer`.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    /// Text from the last successful display submission, if still current.
    pub fn display_text(&self) -> Option<String> {
        self.lock().display.clone()
    }

    /// Message of the last failure, cleared by the next submission or file
    /// selection.
    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Name of the staged file, if any.
    pub fn staged_file(&self) -> Option<String> {
        self.lock().staged.as_ref().map(|f| f.name().to_string())
    }

    /// Stage `file` for the next submission.
    ///
    /// Clears any previous display text and error. Rejected with
    /// [`WorkflowError::Busy`] while a submission is in flight.
    pub fn select_file(&self, file: StagedFile) -> Result<(), WorkflowError> {
        let mut session = self.lock();
        if session.state.is_busy() {
            return Err(WorkflowError::Busy);
        }
        debug!("Selected {:?}", file);
        session.staged = Some(file);
        session.display = None;
        session.error = None;
        Ok(())
    }

    /// Unstage the current file, if any.
    pub fn clear_file(&self) -> Result<(), WorkflowError> {
        let mut session = self.lock();
        if session.state.is_busy() {
            return Err(WorkflowError::Busy);
        }
        session.staged = None;
        session.display = None;
        session.error = None;
        Ok(())
    }

    /// Upload the staged file and produce `mode`'s output.
    ///
    /// Always leaves the workflow `Idle`, including when the returned future
    /// is dropped before it completes. Failures are reported to the observer
    /// and recorded in [`Self::last_error`] before being returned.
    pub async fn submit(&self, mode: OutputMode) -> Result<Outcome, WorkflowError> {
        let file = match self.begin(mode) {
            Ok(file) => file,
            Err(e) => {
                warn!("Submission rejected: {}", e);
                self.observer.on_error(e.kind(), &e.user_message());
                return Err(e);
            }
        };
        let guard = InFlight {
            session: &self.session,
            observer: &self.observer,
            armed: true,
        };

        self.observer.on_state_change(&WorkflowState::Submitting(mode));
        self.observer.on_progress(true);
        info!(
            "Submitting {} ({} bytes) as {}",
            file.name(),
            file.len(),
            mode.wire_format()
        );

        let start = Instant::now();
        let result = self.run(&file, mode).await;
        self.observer.on_progress(false);

        let terminal = self.commit(guard, &result);

        match &result {
            Ok(outcome) => {
                info!("Submission succeeded in {}ms", start.elapsed().as_millis());
                self.observer.on_state_change(&terminal);
                if let Outcome::Exported(artifact) = outcome {
                    self.observer.on_download(artifact);
                }
                self.observer.on_success(mode);
            }
            Err(e) => {
                warn!("Submission failed after {}ms: {:?}", start.elapsed().as_millis(), e);
                self.observer.on_state_change(&terminal);
                self.observer.on_error(e.kind(), &e.user_message());
            }
        }
        self.observer.on_state_change(&WorkflowState::Idle);

        result
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }

    /// `Idle → Submitting`, returning the file to upload.
    fn begin(&self, mode: OutputMode) -> Result<StagedFile, WorkflowError> {
        let mut session = self.lock();
        if session.state.is_busy() {
            return Err(WorkflowError::Busy);
        }
        let Some(file) = session.staged.clone() else {
            session.error = Some(WorkflowError::NoFileSelected.user_message());
            return Err(WorkflowError::NoFileSelected);
        };
        let next = session
            .state
            .apply(Event::Submit(mode))
            .ok_or(WorkflowError::Busy)?;
        session.state = next;
        session.error = None;
        Ok(file)
    }

    /// `Submitting → Succeeded | Failed → Idle`, with the session fields, in
    /// one critical section. Returns the transient terminal state.
    fn commit(
        &self,
        mut guard: InFlight<'_>,
        result: &Result<Outcome, WorkflowError>,
    ) -> WorkflowState {
        let mut session = self.lock();
        guard.armed = false;
        let event = match result {
            Ok(Outcome::Displayed { markdown }) => {
                session.display = Some(markdown.clone());
                session.error = None;
                Event::Completed(Payload::Display(markdown.clone()))
            }
            Ok(Outcome::Exported(artifact)) => {
                session.error = None;
                Event::Completed(Payload::Export {
                    filename: artifact.filename.clone(),
                })
            }
            Err(e) => {
                let message = e.user_message();
                session.display = None;
                session.error = Some(message.clone());
                Event::Errored(message)
            }
        };

        let terminal = session
            .state
            .apply(event)
            .unwrap_or_else(|| WorkflowState::Failed(MSG_UNEXPECTED.to_string()));
        session.state = terminal.apply(Event::Settle).unwrap_or(WorkflowState::Idle);
        terminal
    }

    async fn run(&self, file: &StagedFile, mode: OutputMode) -> Result<Outcome, WorkflowError> {
        let reply = self.send(file, mode).await?;

        if !reply.is_success() {
            let message = resolve_error_message(&reply);
            return Err(WorkflowError::Backend {
                status: reply.status,
                message,
            });
        }

        match mode {
            OutputMode::Display => match parse_success(&reply)? {
                SuccessBody::Markdown(markdown) => Ok(Outcome::Displayed { markdown }),
                SuccessBody::Spreadsheet(_) => Err(WorkflowError::MalformedResponse(
                    "expected Markdown but received a spreadsheet".into(),
                )),
            },
            OutputMode::Spreadsheet => {
                let body = parse_success(&reply).map_err(|e| WorkflowError::Conversion {
                    detail: e.to_string(),
                })?;
                self.export(body).await.map(Outcome::Exported)
            }
        }
    }

    /// One backend round trip, bounded by the configured timeout.
    async fn send(&self, file: &StagedFile, mode: OutputMode) -> Result<BackendReply, WorkflowError> {
        let upload = self.backend.upload(file, mode);
        match self.config.request_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), upload)
                .await
                .map_err(|_| WorkflowError::Timeout { secs })?,
            None => upload.await,
        }
    }

    async fn export(&self, body: SuccessBody) -> Result<Artifact, WorkflowError> {
        let filename = self.config.download_filename.clone();
        match body {
            SuccessBody::Spreadsheet(bytes) => {
                debug!("Backend returned a finished workbook ({} bytes)", bytes.len());
                Ok(Artifact {
                    filename,
                    bytes,
                    table: None,
                })
            }
            SuccessBody::Markdown(text) => {
                let doc = extract_with(&text, &self.config.extract);
                let (doc, bytes) = self.serialize(doc).await?;
                Ok(Artifact {
                    filename,
                    bytes,
                    table: Some(doc),
                })
            }
        }
    }

    /// Build the workbook off the async executor; a panic inside the writer
    /// is reported as a conversion failure like any other.
    async fn serialize(&self, doc: TableDocument) -> Result<(TableDocument, Vec<u8>), WorkflowError> {
        let sheet_name = self.config.sheet_name.clone();
        tokio::task::spawn_blocking(move || {
            let bytes = build_workbook(&doc, &sheet_name)?;
            Ok::<_, WorkflowError>((doc, bytes))
        })
        .await
        .map_err(|e| WorkflowError::Conversion {
            detail: format!("workbook task failed: {e}"),
        })?
    }
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    // Session updates are plain field stores; a panic mid-update cannot
    // leave them inconsistent, so a poisoned lock is still usable.
    session.lock().unwrap_or_else(|p| p.into_inner())
}

/// Held by `submit` between `begin` and `commit`.
///
/// Dropping the `submit` future while it waits on the backend skips
/// `commit`; the guard then settles the session back to `Idle` so the
/// workflow accepts new submissions.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    observer: &'a SharedObserver,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut session = lock_session(self.session);
            if !session.state.is_busy() {
                return;
            }
            session.state = WorkflowState::Idle;
            session.display = None;
            session.error = Some(MSG_UNEXPECTED.to_string());
        }
        warn!("Submission dropped before completion");
        self.observer.on_progress(false);
        self.observer.on_state_change(&WorkflowState::Idle);
    }
}
