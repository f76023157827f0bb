//! Hyperparameter scheduling functions
//!
//! Pure, stateless schedules evaluated at a fractional position in `[0, 1]`:
//! - `Schedule::lin` - linear interpolation
//! - `Schedule::cos` - cosine interpolation
//! - `Schedule::constant` - fixed value
//! - `Schedule::exp` - exponential interpolation
//! - `combine_scheds` - phase-weighted combination of schedules

use thiserror::Error;

/// Errors raised while constructing a combined schedule
#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("phase weights must sum to 1.0, got {0}")]
    WeightSum(f32),

    #[error("negative phase weight: {0}")]
    NegativeWeight(f32),

    #[error("{weights} phase weights given for {schedules} schedules")]
    CountMismatch { weights: usize, schedules: usize },

    #[error("a combined schedule needs at least one phase")]
    Empty,
}

/// A hyperparameter schedule, evaluated at a fractional position in `[0, 1]`
///
/// Schedules are plain values: referentially transparent and safe to
/// evaluate any number of times in any order.
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    /// Linear interpolation from `start` to `end`
    Lin { start: f32, end: f32 },
    /// Cosine interpolation from `start` to `end`
    Cos { start: f32, end: f32 },
    /// Fixed value at every position
    Const { value: f32 },
    /// Exponential interpolation from `start` to `end`
    Exp { start: f32, end: f32 },
    /// Phase-weighted combination built by [`combine_scheds`]
    Piecewise {
        /// Cumulative phase bounds, `[0, p1, p1+p2, .., 1]`
        bounds: Vec<f32>,
        scheds: Vec<Schedule>,
    },
}

impl Schedule {
    /// Linear schedule from `start` to `end`
    pub fn lin(start: f32, end: f32) -> Self {
        Schedule::Lin { start, end }
    }

    /// Cosine schedule from `start` to `end`
    pub fn cos(start: f32, end: f32) -> Self {
        Schedule::Cos { start, end }
    }

    /// Disabled scheduling: `value` at every position
    pub fn constant(value: f32) -> Self {
        Schedule::Const { value }
    }

    /// Exponential schedule from `start` to `end`
    ///
    /// Formula: `start * (end / start)^pos`. Both endpoints must be
    /// non-zero and share a sign for the curve to be meaningful.
    pub fn exp(start: f32, end: f32) -> Self {
        Schedule::Exp { start, end }
    }

    /// Evaluate the schedule at fractional position `pos` in `[0, 1]`
    pub fn at(&self, pos: f32) -> f32 {
        match self {
            Schedule::Lin { start, end } => start + pos * (end - start),
            Schedule::Cos { start, end } => {
                start + (1.0 + (std::f32::consts::PI * (1.0 - pos)).cos()) * (end - start) / 2.0
            }
            Schedule::Const { value } => *value,
            Schedule::Exp { start, end } => start * (end / start).powf(pos),
            Schedule::Piecewise { bounds, scheds } => {
                // Greatest phase whose lower bound has been reached. At a
                // seam the right-hand phase takes over at local position 0.
                let mut idx = 0;
                for (i, bound) in bounds.iter().enumerate().take(scheds.len()) {
                    if pos >= *bound {
                        idx = i;
                    }
                }
                let lo = bounds[idx];
                let hi = bounds[idx + 1];
                let actual = if hi > lo { (pos - lo) / (hi - lo) } else { 0.0 };
                scheds[idx].at(actual)
            }
        }
    }
}

/// Combine schedules into a single schedule with phase weights
///
/// `pcts` gives each phase's share of the `[0, 1]` position range; the
/// weights must be non-negative and sum to 1, one per schedule.
///
/// # Example
///
/// ```
/// use corredor::{combine_scheds, Schedule};
///
/// let s = combine_scheds(
///     &[0.3, 0.7],
///     vec![Schedule::lin(0.0, 1.0), Schedule::lin(1.0, 0.0)],
/// ).unwrap();
/// assert_eq!(s.at(0.3), 1.0);
/// ```
pub fn combine_scheds(pcts: &[f32], scheds: Vec<Schedule>) -> Result<Schedule, ScheduleError> {
    if pcts.is_empty() {
        return Err(ScheduleError::Empty);
    }
    if pcts.len() != scheds.len() {
        return Err(ScheduleError::CountMismatch {
            weights: pcts.len(),
            schedules: scheds.len(),
        });
    }
    if let Some(&neg) = pcts.iter().find(|p| **p < 0.0) {
        return Err(ScheduleError::NegativeWeight(neg));
    }
    let sum: f32 = pcts.iter().sum();
    if (sum - 1.0).abs() > 1e-5 {
        return Err(ScheduleError::WeightSum(sum));
    }

    let mut bounds = Vec::with_capacity(pcts.len() + 1);
    let mut acc = 0.0;
    bounds.push(0.0);
    for p in pcts {
        acc += p;
        bounds.push(acc);
    }
    *bounds.last_mut().expect("bounds is non-empty") = 1.0;

    Ok(Schedule::Piecewise { bounds, scheds })
}
