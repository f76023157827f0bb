//! Shared doubles for engine integration tests

#![allow(dead_code)]

use corredor::{
    Array, Batch, Callback, Cancel, Criterion, DataBundle, Event, EventOutcome, Learner, Mode,
    Model, Optimizer, ParamGroup, ParamSlot, RunState, Task,
};
use ndarray::IxDyn;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// `y = w * x` with a single scalar weight
pub struct ScalarModel {
    pub weight: Array,
    pub grad: Array,
    pub mode_switches: Vec<Mode>,
}

impl ScalarModel {
    pub fn new(weight: f32) -> Self {
        Self {
            weight: Array::from_elem(IxDyn(&[1]), weight),
            grad: Array::zeros(IxDyn(&[1])),
            mode_switches: vec![],
        }
    }

    pub fn w(&self) -> f32 {
        self.weight[[0]]
    }
}

impl Model for ScalarModel {
    fn forward(&mut self, input: &Array) -> corredor::run::Result<Array> {
        Ok(input * self.w())
    }

    fn backward(&mut self, grad: &Array) -> corredor::run::Result<()> {
        self.grad[[0]] += grad.sum();
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode_switches.push(mode);
    }

    fn parameters(&mut self) -> Vec<ParamSlot<'_>> {
        vec![ParamSlot {
            value: &mut self.weight,
            grad: &mut self.grad,
        }]
    }
}

/// Plain gradient descent over whatever groups it is given
pub struct Sgd {
    pub groups: Vec<ParamGroup>,
    pub steps: Rc<RefCell<usize>>,
}

impl Sgd {
    pub fn with_groups(n: usize, lr: f32) -> (Self, Rc<RefCell<usize>>) {
        let steps = Rc::new(RefCell::new(0));
        let mut group = ParamGroup::new();
        group.insert("lr".to_string(), lr);
        (
            Self {
                groups: vec![group; n],
                steps: steps.clone(),
            },
            steps,
        )
    }
}

impl Optimizer for Sgd {
    fn param_groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.groups
    }

    fn step(&mut self, model: &mut dyn Model) -> corredor::run::Result<()> {
        *self.steps.borrow_mut() += 1;
        let lr = self.groups[0].get("lr").copied().unwrap_or(0.0);
        for slot in model.parameters() {
            let update = &*slot.grad * lr;
            *slot.value -= &update;
        }
        Ok(())
    }
}

/// Mean squared error, element-wise over flattened outputs
pub struct MseLoss;

impl Criterion for MseLoss {
    fn forward(&mut self, pred: &Array, target: &Array) -> corredor::run::Result<f32> {
        let n = pred.len().max(1) as f32;
        let sum: f32 = pred
            .iter()
            .zip(target.iter())
            .map(|(p, t)| (p - t) * (p - t))
            .sum();
        Ok(sum / n)
    }

    fn backward(&mut self, pred: &Array, target: &Array) -> corredor::run::Result<Array> {
        let n = pred.len().max(1) as f32;
        let mut grad = pred.clone();
        for (g, t) in grad.iter_mut().zip(target.iter()) {
            *g = 2.0 * (*g - *t) / n;
        }
        Ok(grad)
    }
}

pub fn batch(rows: usize, value: f32) -> Batch {
    Batch {
        x: Array::from_elem(IxDyn(&[rows, 1]), value),
        y: Array::from_elem(IxDyn(&[rows]), value * 2.0),
    }
}

/// A learner over `train`/`valid` batches of 4 rows each
pub fn learner(train: usize, valid: usize) -> (Learner, Rc<RefCell<usize>>) {
    learner_with_groups(train, valid, 1)
}

pub fn learner_with_groups(
    train: usize,
    valid: usize,
    groups: usize,
) -> (Learner, Rc<RefCell<usize>>) {
    let (sgd, steps) = Sgd::with_groups(groups, 0.01);
    let learner = Learner {
        model: Box::new(ScalarModel::new(1.0)),
        opt: Box::new(sgd),
        criterion: Box::new(MseLoss),
        data: DataBundle {
            train: Box::new((0..train).map(|i| batch(4, i as f32)).collect::<Vec<_>>()),
            valid: Box::new((0..valid).map(|i| batch(4, i as f32)).collect::<Vec<_>>()),
        },
        task: Task::Regression,
    };
    (learner, steps)
}

pub type EventCounts = Rc<RefCell<HashMap<Event, usize>>>;

/// Counts every dispatched event
pub struct CountingCallback {
    pub counts: EventCounts,
}

impl CountingCallback {
    pub fn new() -> (Self, EventCounts) {
        let counts: EventCounts = Rc::new(RefCell::new(HashMap::new()));
        (
            Self {
                counts: counts.clone(),
            },
            counts,
        )
    }
}

impl Callback for CountingCallback {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn call(&mut self, event: Event, _state: &mut RunState) -> EventOutcome {
        *self.counts.borrow_mut().entry(event).or_insert(0) += 1;
        Ok(false)
    }
}

pub fn count(counts: &EventCounts, event: Event) -> usize {
    counts.borrow().get(&event).copied().unwrap_or(0)
}

/// Raises a cancel signal at one event, on its n-th occurrence
pub struct CancelAt {
    pub event: Event,
    pub occurrence: usize,
    pub cancel: Cancel,
    seen: usize,
}

impl CancelAt {
    pub fn new(event: Event, occurrence: usize, cancel: Cancel) -> Self {
        Self {
            event,
            occurrence,
            cancel,
            seen: 0,
        }
    }
}

impl Callback for CancelAt {
    fn name(&self) -> &'static str {
        "cancel_at"
    }

    fn call(&mut self, event: Event, _state: &mut RunState) -> EventOutcome {
        if event == self.event {
            self.seen += 1;
            if self.seen == self.occurrence {
                return Err(self.cancel.into());
            }
        }
        Ok(false)
    }
}

/// Captures the scheduled value of a hyperparameter at every batch
pub struct HyperTap {
    pub pname: &'static str,
    pub seen: Rc<RefCell<Vec<Vec<f32>>>>,
}

impl HyperTap {
    pub fn new(pname: &'static str) -> (Self, Rc<RefCell<Vec<Vec<f32>>>>) {
        let seen = Rc::new(RefCell::new(vec![]));
        (
            Self {
                pname,
                seen: seen.clone(),
            },
            seen,
        )
    }
}

impl Callback for HyperTap {
    fn name(&self) -> &'static str {
        "hyper_tap"
    }

    // Samples after schedulers have written their values.
    fn order(&self) -> i32 {
        5
    }

    fn begin_batch(&mut self, state: &mut RunState) -> EventOutcome {
        if state.in_train {
            let values = state
                .learner
                .opt
                .param_groups()
                .iter()
                .map(|g| g.get(self.pname).copied().unwrap_or(f32::NAN))
                .collect();
            self.seen.borrow_mut().push(values);
        }
        Ok(false)
    }
}

pub fn group_map(entries: &[(&str, f32)]) -> BTreeMap<String, f32> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}
