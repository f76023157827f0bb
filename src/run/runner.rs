//! The fit loop
//!
//! `Runner` drives epochs and batches over a [`Learner`], dispatching
//! lifecycle events to its callbacks at every step:
//!
//! ```text
//! begin_fit
//!   per epoch: begin_epoch? -> training pass
//!              begin_validate? -> validation pass
//!              after_epoch
//! after_fit
//! ```
//!
//! Events suffixed with `?` guard a section: when the boolean AND of
//! every callback's return value is `true`, the section is skipped.
//! Callbacks cancel the current batch, pass, or run by returning a
//! [`Cancel`] interrupt; the engine absorbs it at the named scope after
//! dispatching the matching `after_cancel_*` event.

use std::time::Instant;

use super::error::RunError;
use super::report::{FitOutcome, FitReport};
use super::signal::{Cancel, EventOutcome, Interrupt};
use super::state::{Batch, Learner, Phase, RunState};
use crate::callbacks::{Callback, Event, TrainEvalCallback};

/// Callback-driven fit engine
pub struct Runner {
    callbacks: Vec<Box<dyn Callback>>,
}

impl Runner {
    /// Build a runner over the given callbacks
    ///
    /// A [`TrainEvalCallback`] is always installed so mode switching and
    /// progress counters work without any explicit setup. Callbacks run
    /// in ascending [`order`](Callback::order); ties keep insertion
    /// order.
    pub fn new(callbacks: Vec<Box<dyn Callback>>) -> Self {
        let mut cbs: Vec<Box<dyn Callback>> = Vec::with_capacity(callbacks.len() + 1);
        cbs.push(Box::new(TrainEvalCallback::default()));
        cbs.extend(callbacks);
        cbs.sort_by_key(|cb| cb.order());
        Self { callbacks: cbs }
    }

    /// Names of the installed callbacks, in dispatch order
    pub fn callback_names(&self) -> Vec<&str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    /// Run `epochs` epochs of training and validation over the learner
    pub fn fit(&mut self, epochs: usize, learner: &mut Learner) -> Result<FitReport, RunError> {
        let started = Instant::now();
        let mut state = RunState::new(learner, epochs);
        log::info!("fit: {epochs} epochs");

        let mut failure: Option<RunError> = None;
        let outcome = match self.run_fit(&mut state) {
            Ok(()) => FitOutcome::Completed,
            Err(Interrupt::Cancel(cancel)) => {
                log::info!("fit cancelled at epoch {} ({cancel:?})", state.epoch);
                if let Err(Interrupt::Fatal(e)) = self.dispatch(Event::AfterCancelTrain, &mut state)
                {
                    failure = Some(e);
                }
                FitOutcome::Cancelled
            }
            Err(Interrupt::Fatal(e)) => {
                failure = Some(e);
                FitOutcome::Cancelled
            }
        };

        // after_fit runs no matter how the body ended, so callbacks can
        // release resources; the first error wins.
        if let Err(Interrupt::Fatal(e)) = self.dispatch(Event::AfterFit, &mut state) {
            failure.get_or_insert(e);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(FitReport {
            outcome,
            final_epoch: state.epoch,
            final_loss: state.loss.unwrap_or(f32::NAN),
            elapsed_secs: started.elapsed().as_secs_f64(),
            sample_input: state.sample_input.take(),
        })
    }

    /// Dispatch one event to every callback and AND their veto flags
    pub fn dispatch(&mut self, event: Event, state: &mut RunState) -> EventOutcome {
        let mut res = true;
        for cb in &mut self.callbacks {
            res = cb.call(event, state)? && res;
        }
        Ok(res)
    }

    fn run_fit(&mut self, state: &mut RunState) -> Result<(), Interrupt> {
        self.dispatch(Event::BeginFit, state)?;
        for epoch in 0..state.epochs {
            state.epoch = epoch;
            log::debug!("epoch {}/{}", epoch + 1, state.epochs);

            if !self.dispatch(Event::BeginEpoch, state)? {
                self.all_batches(Phase::Train, state)?;
            }
            if !self.dispatch(Event::BeginValidate, state)? {
                self.all_batches(Phase::Valid, state)?;
            }
            self.dispatch(Event::AfterEpoch, state)?;
        }
        Ok(())
    }

    /// One pass over a data source; absorbs `Cancel::Epoch`
    fn all_batches(&mut self, phase: Phase, state: &mut RunState) -> Result<(), Interrupt> {
        let batches: Vec<Batch> = match phase {
            Phase::Train => state.learner.data.train.batches().collect(),
            Phase::Valid => state.learner.data.valid.batches().collect(),
        };
        state.phase = phase;
        state.iters = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            if state.stop {
                break;
            }
            state.iter = i;
            match self.one_batch(batch, state) {
                Ok(()) => {}
                Err(Interrupt::Cancel(Cancel::Epoch)) => {
                    state.stop = false;
                    self.dispatch(Event::AfterCancelEpoch, state)?;
                    return Ok(());
                }
                Err(other) => return Err(other),
            }
        }
        state.stop = false;
        Ok(())
    }

    /// One batch; absorbs `Cancel::Batch`, always dispatches `after_batch`
    fn one_batch(&mut self, batch: Batch, state: &mut RunState) -> Result<(), Interrupt> {
        state.xb = Some(state.learner.model.place(batch.x));
        state.yb = Some(state.learner.model.place(batch.y));

        let body = match self.batch_body(state) {
            Err(Interrupt::Cancel(Cancel::Batch)) => {
                self.dispatch(Event::AfterCancelBatch, state).map(|_| ())
            }
            other => other,
        };
        let done = self.dispatch(Event::AfterBatch, state).map(|_| ());

        state.sample_input = state.xb.take();
        state.yb = None;
        state.pred = None;

        body.and(done)
    }

    fn batch_body(&mut self, state: &mut RunState) -> Result<(), Interrupt> {
        self.dispatch(Event::BeginBatch, state)?;

        let xb = state.xb.as_ref().ok_or(RunError::StateUnset("xb"))?;
        let pred = state.learner.model.forward(xb)?;
        state.pred = Some(pred);
        self.dispatch(Event::AfterPred, state)?;

        let pred = state.pred.as_ref().ok_or(RunError::StateUnset("pred"))?;
        let yb = state.yb.as_ref().ok_or(RunError::StateUnset("yb"))?;
        let loss = state.learner.criterion.forward(pred, yb)?;
        state.loss = Some(loss);
        self.dispatch(Event::AfterLoss, state)?;

        // Validation stops after the loss, no gradients or updates.
        if !state.in_train {
            return Ok(());
        }

        let pred = state.pred.as_ref().ok_or(RunError::StateUnset("pred"))?;
        let yb = state.yb.as_ref().ok_or(RunError::StateUnset("yb"))?;
        let grad = state.learner.criterion.backward(pred, yb)?;
        state.learner.model.backward(&grad)?;
        self.dispatch(Event::AfterBackward, state)?;

        let Learner { model, opt, .. } = &mut *state.learner;
        opt.step(model.as_mut())?;
        self.dispatch(Event::AfterStep, state)?;

        let Learner { model, opt, .. } = &mut *state.learner;
        opt.zero_grad(model.as_mut());
        Ok(())
    }
}
