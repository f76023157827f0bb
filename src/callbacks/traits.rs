//! The callback protocol

use crate::run::{EventOutcome, RunState};
use std::fmt;

/// Lifecycle events dispatched by the runner, in loop order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    BeginFit,
    BeginEpoch,
    BeginBatch,
    AfterPred,
    AfterLoss,
    AfterBackward,
    AfterStep,
    AfterCancelBatch,
    AfterBatch,
    AfterCancelEpoch,
    BeginValidate,
    AfterEpoch,
    AfterCancelTrain,
    AfterFit,
}

impl Event {
    /// All events, in dispatch order within the loop
    pub const ALL: [Event; 14] = [
        Event::BeginFit,
        Event::BeginEpoch,
        Event::BeginBatch,
        Event::AfterPred,
        Event::AfterLoss,
        Event::AfterBackward,
        Event::AfterStep,
        Event::AfterCancelBatch,
        Event::AfterBatch,
        Event::AfterCancelEpoch,
        Event::BeginValidate,
        Event::AfterEpoch,
        Event::AfterCancelTrain,
        Event::AfterFit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Event::BeginFit => "begin_fit",
            Event::BeginEpoch => "begin_epoch",
            Event::BeginBatch => "begin_batch",
            Event::AfterPred => "after_pred",
            Event::AfterLoss => "after_loss",
            Event::AfterBackward => "after_backward",
            Event::AfterStep => "after_step",
            Event::AfterCancelBatch => "after_cancel_batch",
            Event::AfterBatch => "after_batch",
            Event::AfterCancelEpoch => "after_cancel_epoch",
            Event::BeginValidate => "begin_validate",
            Event::AfterEpoch => "after_epoch",
            Event::AfterCancelTrain => "after_cancel_train",
            Event::AfterFit => "after_fit",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A participant in the fit loop
///
/// Implement the event methods you care about; every default returns
/// `Ok(false)` (no veto). Return `Ok(true)` from a guard event to vote
/// for skipping the guarded section, or `Err` with a
/// [`Cancel`](crate::run::Cancel) interrupt to unwind to a named scope.
pub trait Callback {
    /// Stable identifier, used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Dispatch position; lower runs earlier, ties keep insertion order
    fn order(&self) -> i32 {
        0
    }

    fn begin_fit(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn begin_epoch(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn begin_batch(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_pred(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_loss(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_backward(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_step(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_cancel_batch(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_batch(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_cancel_epoch(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn begin_validate(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_epoch(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_cancel_train(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    fn after_fit(&mut self, state: &mut RunState) -> EventOutcome {
        let _ = state;
        Ok(false)
    }

    /// Route one event to its handler method
    fn call(&mut self, event: Event, state: &mut RunState) -> EventOutcome {
        match event {
            Event::BeginFit => self.begin_fit(state),
            Event::BeginEpoch => self.begin_epoch(state),
            Event::BeginBatch => self.begin_batch(state),
            Event::AfterPred => self.after_pred(state),
            Event::AfterLoss => self.after_loss(state),
            Event::AfterBackward => self.after_backward(state),
            Event::AfterStep => self.after_step(state),
            Event::AfterCancelBatch => self.after_cancel_batch(state),
            Event::AfterBatch => self.after_batch(state),
            Event::AfterCancelEpoch => self.after_cancel_epoch(state),
            Event::BeginValidate => self.begin_validate(state),
            Event::AfterEpoch => self.after_epoch(state),
            Event::AfterCancelTrain => self.after_cancel_train(state),
            Event::AfterFit => self.after_fit(state),
        }
    }
}
