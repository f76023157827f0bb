//! Shared run state mutated by the engine and its callbacks

use super::traits::{Criterion, DataSource, Model, Optimizer};
use crate::task::Task;
use crate::Array;

/// One batch of inputs and targets
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array,
    pub y: Array,
}

/// Training and validation data for one run
pub struct DataBundle {
    pub train: Box<dyn DataSource>,
    pub valid: Box<dyn DataSource>,
}

/// Everything a fit needs: model, optimizer, loss, data, and task
pub struct Learner {
    pub model: Box<dyn Model>,
    pub opt: Box<dyn Optimizer>,
    pub criterion: Box<dyn Criterion>,
    pub data: DataBundle,
    pub task: Task,
}

/// Which pass the engine is iterating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Valid,
}

/// Mutable state of one fit, visible to every callback
///
/// The engine stages the current batch in `xb`/`yb` and its products in
/// `pred`/`loss` before dispatching the corresponding event; callbacks
/// may rewrite any staged field in place.
pub struct RunState<'a> {
    pub learner: &'a mut Learner,

    /// Requested epoch count for this fit
    pub epochs: usize,
    /// Current epoch index
    pub epoch: usize,
    /// Fractional epochs completed, advanced per training batch
    pub n_epochs: f32,
    /// Training batches seen across the whole run
    pub n_iter: usize,
    /// Batches in the current pass
    pub iters: usize,
    /// Batch index within the current pass
    pub iter: usize,

    /// Whether gradient updates apply in the current pass
    pub in_train: bool,
    pub phase: Phase,
    /// Soft stop: ends the current pass before the next batch
    pub stop: bool,

    /// Staged batch input
    pub xb: Option<Array>,
    /// Staged batch target
    pub yb: Option<Array>,
    /// Model output for the staged batch
    pub pred: Option<Array>,
    /// Loss for the staged batch
    pub loss: Option<f32>,

    /// Last batch input seen, kept for export after the run
    pub sample_input: Option<Array>,
}

impl<'a> RunState<'a> {
    pub fn new(learner: &'a mut Learner, epochs: usize) -> Self {
        Self {
            learner,
            epochs,
            epoch: 0,
            n_epochs: 0.0,
            n_iter: 0,
            iters: 0,
            iter: 0,
            in_train: true,
            phase: Phase::Train,
            stop: false,
            xb: None,
            yb: None,
            pred: None,
            loss: None,
            sample_input: None,
        }
    }

    /// Fractional position of the run in `[0, 1]`, used by schedulers
    pub fn progress(&self) -> f32 {
        if self.epochs == 0 {
            0.0
        } else {
            self.n_epochs / self.epochs as f32
        }
    }

    /// Rows in the staged batch input, 0 when none is staged
    pub fn batch_rows(&self) -> usize {
        self.xb
            .as_ref()
            .and_then(|x| x.shape().first().copied())
            .unwrap_or(0)
    }
}
