//! Observer trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via
//! [`crate::workflow::Workflow::with_observer`] to follow stage changes and the
//! two external calls of the loading stage, e.g. to drive a progress spinner or
//! forward events to a UI.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doctranslate::{Stage, Workflow, WorkflowObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     transitions: AtomicUsize,
//! }
//!
//! impl WorkflowObserver for CountingObserver {
//!     fn on_stage_changed(&self, from: Stage, to: Stage) {
//!         self.transitions.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{from} → {to}");
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { transitions: AtomicUsize::new(0) });
//! let mut workflow = Workflow::new().with_observer(observer.clone());
//! workflow.start().unwrap();
//! assert_eq!(observer.transitions.load(Ordering::SeqCst), 1);
//! ```

use crate::stage::Stage;
use std::sync::Arc;

/// Called by the workflow controller and the loading stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The loading hooks run inside
/// [`crate::workflow::run_loading`], which may be polled on another task, so
/// implementations must be `Send + Sync`.
pub trait WorkflowObserver: Send + Sync {
    /// Called after every stage change, including back-navigation.
    fn on_stage_changed(&self, from: Stage, to: Stage) {
        let _ = (from, to);
    }

    /// Called just before the OCR collaborator is invoked.
    ///
    /// # Arguments
    /// * `attempt` — loading attempt number, unique per session
    fn on_extraction_start(&self, attempt: u64) {
        let _ = attempt;
    }

    /// Called when extraction succeeded.
    ///
    /// # Arguments
    /// * `attempt` — loading attempt number
    /// * `chars`   — character count of the extracted text
    fn on_extraction_complete(&self, attempt: u64, chars: usize) {
        let _ = (attempt, chars);
    }

    fn on_translation_start(&self, attempt: u64, target_language: &str) {
        let _ = (attempt, target_language);
    }

    fn on_translation_complete(&self, attempt: u64, chars: usize) {
        let _ = (attempt, chars);
    }

    /// Called when the loading attempt failed in either call.
    fn on_loading_failed(&self, attempt: u64, error: &str) {
        let _ = (attempt, error);
    }

    /// Called when a loading result arrived for an attempt the user has
    /// already left, and was dropped.
    fn on_result_discarded(&self, attempt: u64) {
        let _ = attempt;
    }
}

/// A no-op implementation for callers that don't need events.
///
/// This is the default when no observer is configured.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias for the type stored by the workflow.
pub type SharedObserver = Arc<dyn WorkflowObserver>;
