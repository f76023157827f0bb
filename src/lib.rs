//! Callback-driven model runner and flow codec
//!
//! This crate provides two tightly related components:
//! - An execution engine (`run` + `callbacks`) that drives a supervised
//!   fit loop over epochs and batches, dispatching named lifecycle events
//!   to an ordered set of callbacks. Callbacks mutate shared run state
//!   (hyperparameters, counters, recorded metrics) or cancel the current
//!   batch, epoch, or run.
//! - A flow codec (`flow`) that converts a live graph of model components
//!   into a portable, JSON-keyed descriptor tree and reconstructs the
//!   graph from it given a registry of component classes.
//!
//! # Example
//!
//! ```no_run
//! use corredor::{combine_scheds, ParamScheduler, Runner, Schedule};
//!
//! let sched = combine_scheds(
//!     &[0.2, 0.8],
//!     vec![Schedule::cos(1e-4, 5e-3), Schedule::cos(5e-3, 1e-3)],
//! ).unwrap();
//!
//! let mut runner = Runner::new(vec![Box::new(ParamScheduler::new("lr", sched))]);
//! # let mut learner: corredor::Learner = todo!();
//! let report = runner.fit(3, &mut learner).unwrap();
//! println!("final loss: {:.4}", report.final_loss);
//! ```

pub mod callbacks;
pub mod flow;
pub mod metrics;
pub mod run;
pub mod sched;
pub mod task;

/// Batch/tensor currency of the engine.
pub type Array = ndarray::ArrayD<f32>;

pub use callbacks::{
    AvgStats, AvgStatsCallback, Callback, EarlyStopCallback, Event, ParamScheduler, Recorder,
    RecorderHandle, StatsHandle, TrainEvalCallback,
};
pub use flow::{
    ClassEntry, Component, ComponentRegistry, FlowCodec, FlowDescriptor, FlowError, FlowValue,
    InstalledPackages, ParamMap, ScalarType, Stack,
};
pub use metrics::{accuracy, accuracy_topk, Metric, MetricFn};
pub use run::{
    Batch, Cancel, Criterion, DataBundle, DataSource, EventOutcome, FitOutcome, FitReport,
    Interrupt, Learner, Mode, Model, Optimizer, ParamGroup, ParamSlot, Phase, RunError, RunState,
    Runner,
};
pub use sched::{combine_scheds, Schedule, ScheduleError};
pub use task::Task;
