//! Engine behavior over whole fits: event counts, cancellation scopes,
//! scheduling, and recorded statistics.

mod common;

use approx::assert_relative_eq;
use common::{
    batch, count, learner, learner_with_groups, CancelAt, CountingCallback, HyperTap, MseLoss,
    ScalarModel, Sgd,
};
use corredor::{
    combine_scheds, AvgStatsCallback, Cancel, DataBundle, EarlyStopCallback, Event, FitOutcome,
    Learner, Metric, ParamScheduler, Recorder, RunError, Runner, Schedule, Task,
};
use std::sync::Once;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

#[test]
fn test_event_counts_over_n_epochs() {
    init_logging();
    for epochs in [0usize, 1, 3] {
        let (mut learner, _) = learner(2, 1);
        let (counting, counts) = CountingCallback::new();
        let mut runner = Runner::new(vec![Box::new(counting)]);
        let report = runner.fit(epochs, &mut learner).unwrap();

        assert_eq!(report.outcome, FitOutcome::Completed);
        assert_eq!(count(&counts, Event::BeginFit), 1);
        assert_eq!(count(&counts, Event::AfterFit), 1);
        assert_eq!(count(&counts, Event::BeginEpoch), epochs);
        assert_eq!(count(&counts, Event::AfterEpoch), epochs);
        assert_eq!(count(&counts, Event::BeginValidate), epochs);
        // 2 training + 1 validation batch per epoch.
        assert_eq!(count(&counts, Event::AfterBatch), epochs * 3);
        assert_eq!(count(&counts, Event::AfterStep), epochs * 2);
    }
}

#[test]
fn test_cancel_batch_still_finalizes_the_batch() {
    let (mut learner, steps) = learner(3, 0);
    let (counting, counts) = CountingCallback::new();
    let cancel = CancelAt::new(Event::AfterPred, 2, Cancel::Batch);
    let mut runner = Runner::new(vec![Box::new(cancel), Box::new(counting)]);
    let report = runner.fit(1, &mut learner).unwrap();

    assert_eq!(report.outcome, FitOutcome::Completed);
    assert_eq!(count(&counts, Event::AfterCancelBatch), 1);
    // The cancelled batch still gets its finalizer, and the remaining
    // batch of the epoch still runs.
    assert_eq!(count(&counts, Event::AfterBatch), 3);
    // The second batch skipped its optimizer step.
    assert_eq!(*steps.borrow(), 2);
}

#[test]
fn test_cancel_epoch_skips_remaining_batches_only() {
    let (mut learner, _) = learner(4, 1);
    let (counting, counts) = CountingCallback::new();
    let cancel = CancelAt::new(Event::AfterLoss, 2, Cancel::Epoch);
    let mut runner = Runner::new(vec![Box::new(cancel), Box::new(counting)]);
    let report = runner.fit(2, &mut learner).unwrap();

    assert_eq!(report.outcome, FitOutcome::Completed);
    assert_eq!(count(&counts, Event::AfterCancelEpoch), 1);
    // Epoch 1 trains batches 1-2 (second cancelled), epoch 2 all 4;
    // validation adds one batch per epoch.
    assert_eq!(count(&counts, Event::AfterBatch), 2 + 4 + 2);
    assert_eq!(count(&counts, Event::AfterEpoch), 2);
}

#[test]
fn test_cancel_train_ends_the_run() {
    let (mut learner, _) = learner(2, 1);
    let (counting, counts) = CountingCallback::new();
    let cancel = CancelAt::new(Event::AfterEpoch, 2, Cancel::Train);
    let mut runner = Runner::new(vec![Box::new(cancel), Box::new(counting)]);
    let report = runner.fit(5, &mut learner).unwrap();

    assert_eq!(report.outcome, FitOutcome::Cancelled);
    assert_eq!(report.final_epoch, 1);
    assert_eq!(count(&counts, Event::AfterCancelTrain), 1);
    assert_eq!(count(&counts, Event::AfterFit), 1);
    assert_eq!(count(&counts, Event::BeginEpoch), 2);
}

#[test]
fn test_stop_flag_ends_the_pass() {
    struct StopSecond;
    impl corredor::Callback for StopSecond {
        fn name(&self) -> &'static str {
            "stop_second"
        }
        fn after_batch(&mut self, state: &mut corredor::RunState) -> corredor::EventOutcome {
            if state.in_train && state.iter == 1 {
                state.stop = true;
            }
            Ok(false)
        }
    }

    let (mut learner, steps) = learner(5, 0);
    let mut runner = Runner::new(vec![Box::new(StopSecond)]);
    let report = runner.fit(2, &mut learner).unwrap();

    assert_eq!(report.outcome, FitOutcome::Completed);
    // Two batches per epoch before the stop flag trips, both epochs.
    assert_eq!(*steps.borrow(), 4);
}

#[test]
fn test_param_scheduler_broadcasts_to_groups() {
    let (mut learner, _) = learner_with_groups(4, 0, 3);
    let sched = combine_scheds(
        &[0.5, 0.5],
        vec![Schedule::lin(0.0, 1.0), Schedule::lin(1.0, 0.0)],
    )
    .unwrap();
    let (tap, seen) = HyperTap::new("lr");
    let mut runner = Runner::new(vec![
        Box::new(ParamScheduler::new("lr", sched)),
        Box::new(tap),
    ]);
    runner.fit(1, &mut learner).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    for per_batch in seen.iter() {
        // One schedule broadcast across all three groups.
        assert_eq!(per_batch.len(), 3);
        assert_relative_eq!(per_batch[0], per_batch[1]);
        assert_relative_eq!(per_batch[1], per_batch[2]);
    }
    // Triangle schedule over 4 batches: 0, 0.5, 1, 0.5.
    assert_relative_eq!(seen[0][0], 0.0);
    assert_relative_eq!(seen[1][0], 0.5);
    assert_relative_eq!(seen[2][0], 1.0);
    assert_relative_eq!(seen[3][0], 0.5);
}

#[test]
fn test_param_scheduler_rejects_group_mismatch() {
    let (mut learner, _) = learner_with_groups(2, 0, 3);
    let scheds = vec![Schedule::constant(0.1), Schedule::constant(0.2)];
    let mut runner = Runner::new(vec![Box::new(ParamScheduler::per_group("lr", scheds))]);
    let err = runner.fit(1, &mut learner).unwrap_err();
    assert!(matches!(
        err,
        RunError::ScheduleGroupMismatch {
            schedules: 2,
            groups: 3
        }
    ));
}

#[test]
fn test_recorder_tracks_training_only() {
    let (mut learner, _) = learner(3, 2);
    let (recorder, history) = Recorder::new();
    let mut runner = Runner::new(vec![Box::new(recorder)]);
    runner.fit(2, &mut learner).unwrap();

    let history = history.borrow();
    // 3 training batches per epoch, 2 epochs; validation not recorded.
    assert_eq!(history.losses.len(), 6);
    assert_eq!(history.lrs.len(), 1);
    assert_eq!(history.lrs[0].len(), 6);
    assert!(history.losses.iter().all(|l| l.is_finite()));
}

#[test]
fn test_avg_stats_accumulates_per_pass() {
    let (stats_cb, stats) = AvgStatsCallback::new(vec![]);
    let mut learner = Learner {
        model: Box::new(ScalarModel::new(1.0)),
        opt: Box::new(Sgd::with_groups(1, 0.0).0),
        criterion: Box::new(MseLoss),
        data: DataBundle {
            // Uneven batch sizes so plain averaging of batch losses
            // would give the wrong answer.
            train: Box::new(vec![batch(6, 1.0), batch(2, 3.0)]),
            valid: Box::new(vec![batch(4, 2.0)]),
        },
        task: Task::Regression,
    };
    let mut runner = Runner::new(vec![Box::new(stats_cb)]);
    runner.fit(1, &mut learner).unwrap();

    let stats = stats.borrow();
    // lr is 0 so the model stays y = x: loss per row is (x - 2x)^2 = x^2.
    // Weighted train average: (6*1 + 2*9) / 8 = 3.
    assert_relative_eq!(stats.train.avg_loss(), 3.0);
    assert_relative_eq!(stats.valid.avg_loss(), 4.0);
}

#[test]
fn test_avg_stats_with_accuracy_metric() {
    use corredor::{Array, Batch};
    use ndarray::arr2;

    struct Logits;
    impl corredor::Model for Logits {
        fn forward(&mut self, input: &Array) -> corredor::run::Result<Array> {
            Ok(input.clone())
        }
        fn backward(&mut self, _grad: &Array) -> corredor::run::Result<()> {
            Ok(())
        }
        fn set_mode(&mut self, _mode: corredor::Mode) {}
        fn parameters(&mut self) -> Vec<corredor::ParamSlot<'_>> {
            vec![]
        }
    }

    // 4 rows, 3 of them classified correctly by arg-max.
    let x = arr2(&[[0.9, 0.1], [0.2, 0.8], [0.7, 0.3], [0.4, 0.6]]).into_dyn();
    let y = ndarray::arr1(&[0.0, 1.0, 1.0, 1.0]).into_dyn();

    let (stats_cb, stats) = AvgStatsCallback::new(vec![Metric::accuracy()]);
    let mut learner = Learner {
        model: Box::new(Logits),
        opt: Box::new(Sgd::with_groups(1, 0.0).0),
        criterion: Box::new(MseLoss),
        data: DataBundle {
            train: Box::new(Vec::<Batch>::new()),
            valid: Box::new(vec![Batch { x, y }]),
        },
        task: Task::classification(["a", "b"]),
    };
    let mut runner = Runner::new(vec![Box::new(stats_cb)]);
    runner.fit(1, &mut learner).unwrap();

    let stats = stats.borrow();
    let valid = stats.valid.avg_stats();
    assert_relative_eq!(valid[1], 0.75);
}

#[test]
fn test_early_stop_cancels_on_plateau() {
    // lr 0 keeps the loss constant, so nothing ever improves after the
    // first epoch sets the best.
    let (sgd, _) = Sgd::with_groups(1, 0.0);
    let mut learner = Learner {
        model: Box::new(ScalarModel::new(1.0)),
        opt: Box::new(sgd),
        criterion: Box::new(MseLoss),
        data: DataBundle {
            train: Box::new(vec![batch(4, 1.0)]),
            valid: Box::new(vec![batch(4, 1.0)]),
        },
        task: Task::Regression,
    };
    let mut runner = Runner::new(vec![Box::new(EarlyStopCallback::new(2, 1e-6))]);
    let report = runner.fit(10, &mut learner).unwrap();

    assert_eq!(report.outcome, FitOutcome::Cancelled);
    // Epoch 0 sets the best, epochs 1 and 2 plateau, then the run stops.
    assert_eq!(report.final_epoch, 2);
}

#[test]
fn test_sample_input_is_exported() {
    let (mut learner, _) = learner(2, 1);
    let mut runner = Runner::new(vec![]);
    let report = runner.fit(1, &mut learner).unwrap();

    // The export slot holds the last batch input seen (a validation
    // batch of 4 rows).
    let sample = report.sample_input.unwrap();
    assert_eq!(sample.shape(), &[4, 1]);
}
