//! Fit outcome reporting

use crate::Array;

/// How a fit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// All requested epochs ran
    Completed,
    /// A callback cancelled the run
    Cancelled,
}

/// Summary of a finished fit
#[derive(Debug)]
pub struct FitReport {
    pub outcome: FitOutcome,
    /// Epoch index the run ended in
    pub final_epoch: usize,
    /// Loss of the last batch processed, NaN when no batch ran
    pub final_loss: f32,
    pub elapsed_secs: f64,
    /// Last batch input seen, usable as a serialization exemplar
    pub sample_input: Option<Array>,
}

impl FitReport {
    pub fn completed(&self) -> bool {
        self.outcome == FitOutcome::Completed
    }
}
