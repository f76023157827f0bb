//! Collaborator seams the engine drives
//!
//! The engine owns the loop; models, optimizers, criteria, and data
//! sources plug in behind these traits. Implementations stay single
//! threaded, the engine never shares them across threads.

use super::error::Result;
use super::state::Batch;
use crate::Array;
use std::collections::BTreeMap;

/// Train/eval switch forwarded to the model once per pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// One optimizable parameter with its accumulated gradient
pub struct ParamSlot<'a> {
    pub value: &'a mut Array,
    pub grad: &'a mut Array,
}

/// Per-group hyperparameter map, keyed by name (`"lr"`, `"wd"`, ..)
pub type ParamGroup = BTreeMap<String, f32>;

/// A trainable model
pub trait Model {
    /// Compute outputs for a batch of inputs
    fn forward(&mut self, input: &Array) -> Result<Array>;

    /// Accumulate parameter gradients from the output gradient
    fn backward(&mut self, grad: &Array) -> Result<()>;

    /// Switch layer behavior between training and evaluation
    fn set_mode(&mut self, mode: Mode);

    /// Expose parameters and gradients for the optimizer
    fn parameters(&mut self) -> Vec<ParamSlot<'_>>;

    /// Device placement hook for incoming batch tensors
    fn place(&self, array: Array) -> Array {
        array
    }
}

/// A parameter-updating rule over the model's parameter slots
pub trait Optimizer {
    fn param_groups(&self) -> &[ParamGroup];

    fn param_groups_mut(&mut self) -> &mut [ParamGroup];

    /// Apply one update using the current gradients and hyperparameters
    fn step(&mut self, model: &mut dyn Model) -> Result<()>;

    /// Clear accumulated gradients after a step
    fn zero_grad(&mut self, model: &mut dyn Model) {
        for slot in model.parameters() {
            slot.grad.fill(0.0);
        }
    }
}

/// A differentiable loss over predictions and targets
pub trait Criterion {
    /// Scalar loss for a batch
    fn forward(&mut self, pred: &Array, target: &Array) -> Result<f32>;

    /// Gradient of the loss with respect to the predictions
    fn backward(&mut self, pred: &Array, target: &Array) -> Result<Array>;
}

/// A finite, re-iterable source of batches
pub trait DataSource {
    /// Number of batches one pass yields
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A fresh pass over the batches
    fn batches(&self) -> Box<dyn Iterator<Item = Batch> + '_>;
}

impl DataSource for Vec<Batch> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn batches(&self) -> Box<dyn Iterator<Item = Batch> + '_> {
        Box::new(self.iter().cloned())
    }
}
