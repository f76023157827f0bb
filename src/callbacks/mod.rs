//! Callbacks shipped with the runner
//!
//! - [`TrainEvalCallback`] - mode switching and progress counters
//! - [`ParamScheduler`] - schedule-driven hyperparameters
//! - [`Recorder`] - per-batch learning-rate and loss history
//! - [`AvgStatsCallback`] - per-epoch loss and metric averages
//! - [`EarlyStopCallback`] - cancel on a stalled loss

mod avg_stats;
mod early_stop;
mod param_scheduler;
mod recorder;
mod train_eval;
mod traits;

pub use avg_stats::{AvgStats, AvgStatsCallback, StatsData, StatsHandle};
pub use early_stop::EarlyStopCallback;
pub use param_scheduler::ParamScheduler;
pub use recorder::{Recorder, RecorderData, RecorderHandle};
pub use train_eval::TrainEvalCallback;
pub use traits::{Callback, Event};
