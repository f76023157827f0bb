//! Per-batch history of learning rates and losses

use super::traits::Callback;
use crate::run::{EventOutcome, RunState};
use std::cell::RefCell;
use std::rc::Rc;

/// History recorded over the training batches of one fit
#[derive(Debug, Default)]
pub struct RecorderData {
    /// Learning rate per batch, one series per parameter group
    pub lrs: Vec<Vec<f32>>,
    /// Loss per training batch
    pub losses: Vec<f32>,
}

/// Shared view into a [`Recorder`]'s history, kept by the caller
pub type RecorderHandle = Rc<RefCell<RecorderData>>;

/// Records the `lr` hyperparameter and the loss for every training batch
pub struct Recorder {
    data: RecorderHandle,
}

impl Recorder {
    /// The callback plus a handle to read the history after the fit
    pub fn new() -> (Self, RecorderHandle) {
        let data = Rc::new(RefCell::new(RecorderData::default()));
        (Self { data: data.clone() }, data)
    }
}

impl Callback for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn begin_fit(&mut self, state: &mut RunState) -> EventOutcome {
        let groups = state.learner.opt.param_groups().len();
        let mut data = self.data.borrow_mut();
        data.lrs = vec![Vec::new(); groups];
        data.losses.clear();
        Ok(false)
    }

    fn after_batch(&mut self, state: &mut RunState) -> EventOutcome {
        if state.in_train {
            let mut data = self.data.borrow_mut();
            for (series, group) in data.lrs.iter_mut().zip(state.learner.opt.param_groups()) {
                series.push(group.get("lr").copied().unwrap_or(f32::NAN));
            }
            data.losses.push(state.loss.unwrap_or(f32::NAN));
        }
        Ok(false)
    }
}
