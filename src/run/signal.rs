//! Control-flow signals raised by callbacks and the engine

use super::RunError;

/// Scoped cancellation request
///
/// A cancel unwinds to the scope it names and no further. The engine
/// dispatches the matching `after_cancel_*` event at that scope and then
/// resumes normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancel {
    /// Abandon the current batch, keep iterating the pass
    Batch,
    /// Abandon the current pass, keep iterating epochs
    Epoch,
    /// Abandon the whole run
    Train,
}

/// Non-local exit from an event handler or an engine step
///
/// `Cancel` is ordinary control flow and is absorbed at its scope;
/// `Fatal` unwinds the whole run and surfaces as the fit error.
#[derive(Debug)]
pub enum Interrupt {
    Cancel(Cancel),
    Fatal(RunError),
}

impl From<Cancel> for Interrupt {
    fn from(cancel: Cancel) -> Self {
        Interrupt::Cancel(cancel)
    }
}

impl From<RunError> for Interrupt {
    fn from(err: RunError) -> Self {
        Interrupt::Fatal(err)
    }
}

/// What an event handler returns: a veto flag, or an interrupt
///
/// The flag is aggregated with logical AND across all callbacks; a
/// `true` aggregate vetoes the section the event guards.
pub type EventOutcome = Result<bool, Interrupt>;
