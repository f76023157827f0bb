//! Early stopping on a stalled loss

use super::traits::Callback;
use crate::run::{Cancel, EventOutcome, RunState};

/// Cancels the run when the epoch-end loss stops improving
///
/// An epoch counts as improved when its final loss drops below the best
/// seen by more than `min_delta`. After `patience` non-improving epochs
/// in a row the callback raises [`Cancel::Train`].
pub struct EarlyStopCallback {
    patience: usize,
    min_delta: f32,
    best: f32,
    bad_epochs: usize,
}

impl EarlyStopCallback {
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best: f32::INFINITY,
            bad_epochs: 0,
        }
    }
}

impl Callback for EarlyStopCallback {
    fn name(&self) -> &'static str {
        "early_stop"
    }

    fn begin_fit(&mut self, _state: &mut RunState) -> EventOutcome {
        self.best = f32::INFINITY;
        self.bad_epochs = 0;
        Ok(false)
    }

    fn after_epoch(&mut self, state: &mut RunState) -> EventOutcome {
        let loss = state.loss.unwrap_or(f32::INFINITY);
        if loss < self.best - self.min_delta {
            self.best = loss;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
            if self.bad_epochs >= self.patience {
                log::info!(
                    "early stop at epoch {}: no improvement in {} epochs",
                    state.epoch + 1,
                    self.bad_epochs
                );
                return Err(Cancel::Train.into());
            }
        }
        Ok(false)
    }
}
