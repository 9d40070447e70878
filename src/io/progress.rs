//! Step/percent progress reporting shared by the import and export pipelines.
//!
//! The reporter is owned by one pipeline run at a time and mutated through
//! `&mut self`; it is not meant for concurrent writers. A pipeline that keeps
//! running after its caller stopped listening still mutates the reporter it
//! was handed, so callers that abandon a run should raise its
//! [`CancellationFlag`] rather than just dropping the observer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observer invoked after every reporter mutation.
pub type ProgressCallback = Box<dyn Fn(&ProgressSnapshot) + Send>;

/// Point-in-time view of a pipeline's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Label of the step currently running.
    pub step: String,
    /// Completion percentage, 0 to 100.
    pub percent: u8,
    /// Errors reported so far.
    pub errors: Vec<String>,
}

/// Mutable progress sink observed by the caller.
#[derive(Default)]
pub struct ProgressReporter {
    state: ProgressSnapshot,
    observer: Option<ProgressCallback>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("state", &self.state)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ProgressReporter {
    /// Creates a reporter without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reporter that calls `observer` after every change.
    #[must_use]
    pub fn with_observer(observer: ProgressCallback) -> Self {
        Self {
            state: ProgressSnapshot::default(),
            observer: Some(observer),
        }
    }

    /// Clears step, percent and errors for a new run.
    pub fn reset(&mut self) {
        self.state = ProgressSnapshot::default();
        self.notify();
    }

    /// Sets the current step label.
    pub fn set_step(&mut self, label: impl Into<String>) {
        self.state.step = label.into();
        self.notify();
    }

    /// Sets the completion percentage, clamped to 100.
    pub fn set_percent(&mut self, percent: u8) {
        self.state.percent = percent.min(100);
        self.notify();
    }

    /// Sets the step label and moves the percentage forward.
    ///
    /// A lower percentage than the current one is ignored; use
    /// [`Self::reset`] to start over.
    pub fn advance(&mut self, label: impl Into<String>, percent: u8) {
        self.state.step = label.into();
        self.state.percent = self.state.percent.max(percent.min(100));
        self.notify();
    }

    /// Records an error message.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.state.errors.push(message.into());
        self.notify();
    }

    /// Returns the current state.
    #[must_use]
    pub const fn snapshot(&self) -> &ProgressSnapshot {
        &self.state
    }

    fn notify(&self) {
        if let Some(ref cb) = self.observer {
            cb(&self.state);
        }
    }
}

/// Cooperative cancellation signal for a running import.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
