//! Running loss and metric averages per pass

use super::traits::Callback;
use crate::metrics::Metric;
use crate::run::{EventOutcome, RunState};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Row-weighted running averages of the loss and a metric list
#[derive(Debug, Clone)]
pub struct AvgStats {
    metrics: Vec<Metric>,
    in_train: bool,
    count: usize,
    tot_loss: f32,
    tot_metrics: Vec<f32>,
}

impl AvgStats {
    pub fn new(metrics: Vec<Metric>, in_train: bool) -> Self {
        let n = metrics.len();
        Self {
            metrics,
            in_train,
            count: 0,
            tot_loss: 0.0,
            tot_metrics: vec![0.0; n],
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.tot_loss = 0.0;
        self.tot_metrics.fill(0.0);
    }

    /// Fold the staged batch into the running totals
    ///
    /// Each batch contributes weighted by its row count, so uneven batch
    /// sizes average correctly.
    pub fn accumulate(&mut self, state: &RunState) {
        let rows = state.batch_rows();
        if rows == 0 {
            return;
        }
        let (Some(pred), Some(yb), Some(loss)) = (&state.pred, &state.yb, state.loss) else {
            return;
        };
        self.count += rows;
        self.tot_loss += loss * rows as f32;
        for (total, metric) in self.tot_metrics.iter_mut().zip(&self.metrics) {
            *total += metric.eval(pred, yb) * rows as f32;
        }
    }

    pub fn avg_loss(&self) -> f32 {
        if self.count == 0 {
            f32::NAN
        } else {
            self.tot_loss / self.count as f32
        }
    }

    /// Averages in report order: loss first, then each metric
    pub fn avg_stats(&self) -> Vec<f32> {
        let mut stats = vec![self.avg_loss()];
        stats.extend(
            self.tot_metrics
                .iter()
                .map(|t| if self.count == 0 { f32::NAN } else { t / self.count as f32 }),
        );
        stats
    }
}

impl fmt::Display for AvgStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.in_train { "train" } else { "valid" };
        write!(f, "{label}: [")?;
        for (i, v) in self.avg_stats().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:.4}")?;
        }
        write!(f, "]")
    }
}

/// Training and validation accumulators for one fit
#[derive(Debug)]
pub struct StatsData {
    pub train: AvgStats,
    pub valid: AvgStats,
}

/// Shared view into an [`AvgStatsCallback`]'s accumulators
pub type StatsHandle = Rc<RefCell<StatsData>>;

/// Accumulates loss and metrics per pass and logs them per epoch
pub struct AvgStatsCallback {
    stats: StatsHandle,
}

impl AvgStatsCallback {
    /// The callback plus a handle to read the averages after the fit
    pub fn new(metrics: Vec<Metric>) -> (Self, StatsHandle) {
        let stats = Rc::new(RefCell::new(StatsData {
            train: AvgStats::new(metrics.clone(), true),
            valid: AvgStats::new(metrics, false),
        }));
        (
            Self {
                stats: stats.clone(),
            },
            stats,
        )
    }
}

impl Callback for AvgStatsCallback {
    fn name(&self) -> &'static str {
        "avg_stats"
    }

    fn begin_epoch(&mut self, _state: &mut RunState) -> EventOutcome {
        let mut stats = self.stats.borrow_mut();
        stats.train.reset();
        stats.valid.reset();
        Ok(false)
    }

    fn after_loss(&mut self, state: &mut RunState) -> EventOutcome {
        let mut stats = self.stats.borrow_mut();
        if state.in_train {
            stats.train.accumulate(state);
        } else {
            stats.valid.accumulate(state);
        }
        Ok(false)
    }

    fn after_epoch(&mut self, state: &mut RunState) -> EventOutcome {
        let stats = self.stats.borrow();
        log::info!(
            "epoch {}/{}: {} | {}",
            state.epoch + 1,
            state.epochs,
            stats.train,
            stats.valid
        );
        Ok(false)
    }
}
