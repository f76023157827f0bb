//! Hyperparameter scheduling over the fit

use super::traits::Callback;
use crate::run::{EventOutcome, RunError, RunState};
use crate::sched::Schedule;

/// Sets one hyperparameter per parameter group from a schedule
///
/// A single schedule is broadcast to every group at `begin_fit`; with
/// several schedules the count must match the group count exactly. The
/// schedule is evaluated at the run's fractional progress before every
/// training batch.
pub struct ParamScheduler {
    pname: String,
    scheds: Vec<Schedule>,
}

impl ParamScheduler {
    /// Schedule `pname` with one schedule, broadcast to all groups
    pub fn new(pname: impl Into<String>, sched: Schedule) -> Self {
        Self {
            pname: pname.into(),
            scheds: vec![sched],
        }
    }

    /// Schedule `pname` with one schedule per parameter group
    pub fn per_group(pname: impl Into<String>, scheds: Vec<Schedule>) -> Self {
        Self {
            pname: pname.into(),
            scheds,
        }
    }

    fn set_param(&self, state: &mut RunState) {
        let pos = state.progress();
        let groups = state.learner.opt.param_groups_mut();
        for (group, sched) in groups.iter_mut().zip(&self.scheds) {
            group.insert(self.pname.clone(), sched.at(pos));
        }
    }
}

impl Callback for ParamScheduler {
    fn name(&self) -> &'static str {
        "param_scheduler"
    }

    // After train_eval, before anything that reads hyperparameters.
    fn order(&self) -> i32 {
        1
    }

    fn begin_fit(&mut self, state: &mut RunState) -> EventOutcome {
        let groups = state.learner.opt.param_groups().len();
        if self.scheds.len() == 1 && groups > 1 {
            let sched = self.scheds[0].clone();
            self.scheds.resize(groups, sched);
        }
        if self.scheds.len() != groups {
            return Err(RunError::ScheduleGroupMismatch {
                schedules: self.scheds.len(),
                groups,
            }
            .into());
        }
        Ok(false)
    }

    fn begin_batch(&mut self, state: &mut RunState) -> EventOutcome {
        if state.in_train {
            self.set_param(state);
        }
        Ok(false)
    }
}
