//! Callback-driven fit engine
//!
//! - [`Runner`] - the epoch/batch loop and event dispatcher
//! - [`Learner`] - model, optimizer, criterion, data, and task bundle
//! - [`RunState`] - mutable per-fit state shared with callbacks
//! - [`Cancel`]/[`Interrupt`] - scoped cancellation and fatal errors
//! - [`FitReport`] - outcome summary returned by [`Runner::fit`]

mod error;
mod report;
mod runner;
mod signal;
mod state;
mod traits;

pub use error::{Result, RunError};
pub use report::{FitOutcome, FitReport};
pub use runner::Runner;
pub use signal::{Cancel, EventOutcome, Interrupt};
pub use state::{Batch, DataBundle, Learner, Phase, RunState};
pub use traits::{Criterion, DataSource, Mode, Model, Optimizer, ParamGroup, ParamSlot};
