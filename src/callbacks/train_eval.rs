//! Mode switching and progress counters
//!
//! Installed by the runner on every fit. Keeps `n_epochs` (fractional
//! epochs completed) and `n_iter` (training batches seen) current and
//! flips the model between training and evaluation per pass.

use super::traits::Callback;
use crate::run::{EventOutcome, Mode, RunState};

#[derive(Debug, Default)]
pub struct TrainEvalCallback;

impl Callback for TrainEvalCallback {
    fn name(&self) -> &'static str {
        "train_eval"
    }

    // Runs before every other callback so counters and mode are current.
    fn order(&self) -> i32 {
        0
    }

    fn begin_fit(&mut self, state: &mut RunState) -> EventOutcome {
        state.n_epochs = 0.0;
        state.n_iter = 0;
        Ok(false)
    }

    fn begin_epoch(&mut self, state: &mut RunState) -> EventOutcome {
        state.n_epochs = state.epoch as f32;
        state.learner.model.set_mode(Mode::Train);
        state.in_train = true;
        Ok(false)
    }

    fn begin_validate(&mut self, state: &mut RunState) -> EventOutcome {
        state.learner.model.set_mode(Mode::Eval);
        state.in_train = false;
        Ok(false)
    }

    fn after_batch(&mut self, state: &mut RunState) -> EventOutcome {
        if state.in_train && state.iters > 0 {
            state.n_epochs += 1.0 / state.iters as f32;
            state.n_iter += 1;
        }
        Ok(false)
    }
}
