//! Run options and progress callback
//!
//! The engine reports progress through a trait so it can be driven without
//! depending on a particular terminal UI.

use crate::report::{Collection, Outcome};

/// Options for a reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Read remote state and report what would change, without mutating
    pub dry_run: bool,
}

impl ReconcileOptions {
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Progress callback for reconciliation runs
///
/// Implement this trait to receive outcomes as they are decided.
pub trait ProgressCallback: Send {
    /// Called when a pass starts, with the number of desired entries
    fn on_pass_start(&mut self, collection: Collection, entries: usize);

    /// Called once per decision
    fn on_outcome(&mut self, outcome: &Outcome);

    /// Called when a pass completes
    fn on_pass_complete(&mut self, collection: Collection);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_pass_start(&mut self, _collection: Collection, _entries: usize) {}
    fn on_outcome(&mut self, _outcome: &Outcome) {}
    fn on_pass_complete(&mut self, _collection: Collection) {}
}
