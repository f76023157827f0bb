//! Error types for the run engine

use crate::sched::ScheduleError;
use thiserror::Error;

/// Errors surfaced by a fit run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("model error: {0}")]
    Model(String),

    #[error("optimizer error: {0}")]
    Optimizer(String),

    #[error("criterion error: {0}")]
    Criterion(String),

    /// An engine step read a run-state field before any event set it
    #[error("run state field `{0}` is unset")]
    StateUnset(&'static str),

    #[error("{schedules} schedules given for {groups} parameter groups")]
    ScheduleGroupMismatch { schedules: usize, groups: usize },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

pub type Result<T> = std::result::Result<T, RunError>;
