//! Observer trait for the workflow's user-visible side effects.
//!
//! The workflow never renders anything itself. It reports what a user would
//! see (a busy indicator, a success or error notice, a file to save) through
//! an injected [`Arc<dyn WorkflowObserver>`], and the host decides how to show
//! it: a terminal spinner, a GUI toast, a log line.
//!
//! # Example
//!
//! ```rust
//! use pdf2sheet::{ErrorKind, WorkflowObserver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct ErrorCounter(AtomicUsize);
//!
//! impl WorkflowObserver for ErrorCounter {
//!     fn on_error(&self, _kind: ErrorKind, message: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("error: {message}");
//!     }
//! }
//! ```

use crate::config::OutputMode;
use crate::error::ErrorKind;
use crate::output::Artifact;
use crate::workflow::WorkflowState;
use std::sync::Arc;

/// Receives workflow side effects.
///
/// All methods default to no-ops. Callbacks run on the task driving
/// `submit`, never while the workflow's state lock is held, so an observer
/// may freely read the workflow back.
pub trait WorkflowObserver: Send + Sync {
    /// Every state the workflow passes through, including the transient
    /// `Succeeded` / `Failed` states that settle straight back to `Idle`.
    fn on_state_change(&self, state: &WorkflowState) {
        let _ = state;
    }

    /// Busy indicator: `true` when a request goes out, `false` when it ends.
    fn on_progress(&self, active: bool) {
        let _ = active;
    }

    /// A submission finished successfully.
    fn on_success(&self, mode: OutputMode) {
        let _ = mode;
    }

    /// A submission was rejected or failed.
    fn on_error(&self, kind: ErrorKind, message: &str) {
        let _ = (kind, message);
    }

    /// A spreadsheet is ready to be saved under `artifact.filename`.
    fn on_download(&self, artifact: &Artifact) {
        let _ = artifact;
    }
}

/// Observer that ignores everything. The default.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias for the type stored in [`crate::workflow::Workflow`].
pub type SharedObserver = Arc<dyn WorkflowObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        progress_on: AtomicUsize,
        errors: AtomicUsize,
    }

    impl WorkflowObserver for Counting {
        fn on_progress(&self, active: bool) {
            if active {
                self.progress_on.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_error(&self, _kind: ErrorKind, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_state_change(&WorkflowState::Idle);
        obs.on_progress(true);
        obs.on_success(OutputMode::Display);
        obs.on_error(ErrorKind::Backend, "bad file");
        obs.on_progress(false);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let counting = Arc::new(Counting::default());
        let obs: SharedObserver = counting.clone();
        obs.on_progress(true);
        obs.on_progress(false);
        obs.on_error(ErrorKind::Validation, "no file");
        assert_eq!(counting.progress_on.load(Ordering::SeqCst), 1);
        assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    }
}
