//! Evaluation metrics accumulated during training and validation

use crate::Array;
use ndarray::Axis;

/// A metric maps `(predictions, targets)` to a scalar in batch-average form.
///
/// Predictions carry one score per class along the trailing axis;
/// targets hold integer class indices (as floats) along the leading axis.
pub type MetricFn = fn(&Array, &Array) -> f32;

/// A named metric function, as tracked by the statistics accumulator
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub func: MetricFn,
}

impl Metric {
    pub fn new(name: &'static str, func: MetricFn) -> Self {
        Self { name, func }
    }

    /// Top-1 accuracy
    pub fn accuracy() -> Self {
        Self::new("accuracy", accuracy)
    }

    /// Evaluate the metric on one batch
    pub fn eval(&self, pred: &Array, target: &Array) -> f32 {
        (self.func)(pred, target)
    }
}

/// Fraction of rows whose arg-max score matches the target class index
pub fn accuracy(pred: &Array, target: &Array) -> f32 {
    let last = Axis(pred.ndim().saturating_sub(1));
    let mut correct = 0usize;
    let mut total = 0usize;
    for (lane, t) in pred.lanes(last).into_iter().zip(target.iter()) {
        let mut best = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (i, score) in lane.iter().enumerate() {
            if *score > best_score {
                best_score = *score;
                best = i;
            }
        }
        if best as f32 == *t {
            correct += 1;
        }
        total += 1;
    }
    if total == 0 {
        0.0
    } else {
        correct as f32 / total as f32
    }
}

/// Fraction of rows whose target class index is among the `k` highest scores
pub fn accuracy_topk(pred: &Array, target: &Array, k: usize) -> f32 {
    let last = Axis(pred.ndim().saturating_sub(1));
    let mut correct = 0usize;
    let mut total = 0usize;
    for (lane, t) in pred.lanes(last).into_iter().zip(target.iter()) {
        let mut ranked: Vec<(usize, f32)> = lane.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        if ranked.iter().take(k).any(|(i, _)| *i as f32 == *t) {
            correct += 1;
        }
        total += 1;
    }
    if total == 0 {
        0.0
    } else {
        correct as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn logits() -> Array {
        arr2(&[
            [0.1, 0.7, 0.2],
            [0.9, 0.05, 0.05],
            [0.2, 0.3, 0.5],
            [0.6, 0.3, 0.1],
        ])
        .into_dyn()
    }

    #[test]
    fn test_accuracy() {
        let targets = ndarray::arr1(&[1.0, 0.0, 2.0, 1.0]).into_dyn();
        assert_relative_eq!(accuracy(&logits(), &targets), 0.75);
    }

    #[test]
    fn test_accuracy_perfect_and_empty() {
        let targets = ndarray::arr1(&[1.0, 0.0, 2.0, 0.0]).into_dyn();
        assert_relative_eq!(accuracy(&logits(), &targets), 1.0);

        let empty_pred = Array::zeros(ndarray::IxDyn(&[0, 3]));
        let empty_target = Array::zeros(ndarray::IxDyn(&[0]));
        assert_eq!(accuracy(&empty_pred, &empty_target), 0.0);
    }

    #[test]
    fn test_accuracy_topk() {
        let targets = ndarray::arr1(&[2.0, 1.0, 0.0, 1.0]).into_dyn();
        // Top-1 misses every row; top-2 catches all but the third row.
        assert_relative_eq!(accuracy_topk(&logits(), &targets, 1), 0.0);
        assert_relative_eq!(accuracy_topk(&logits(), &targets, 2), 0.75);
        assert_relative_eq!(accuracy_topk(&logits(), &targets, 3), 1.0);
    }

    #[test]
    fn test_metric_wrapper() {
        let m = Metric::accuracy();
        assert_eq!(m.name, "accuracy");
        let targets = ndarray::arr1(&[1.0, 0.0, 2.0, 1.0]).into_dyn();
        assert_relative_eq!(m.eval(&logits(), &targets), 0.75);
    }
}
