//! Task descriptors
//!
//! A task tags the problem the runner is solving and supplies the default
//! transform from raw model outputs to predictions.

use crate::Array;
use ndarray::Axis;

/// Supervised task descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Classification over a fixed label set
    Classification { class_labels: Vec<String> },
    /// Scalar regression
    Regression,
}

impl Task {
    /// Classification task over the given labels
    pub fn classification<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Task::Classification {
            class_labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Task::Classification { .. })
    }

    /// Class labels, if this is a classification task
    pub fn class_labels(&self) -> Option<&[String]> {
        match self {
            Task::Classification { class_labels } => Some(class_labels),
            Task::Regression => None,
        }
    }

    /// Label text for a predicted class index
    pub fn label_for(&self, index: usize) -> Option<&str> {
        self.class_labels()?.get(index).map(String::as_str)
    }

    /// Turn raw model outputs into predictions
    ///
    /// Classification takes the arg-max over the trailing axis; regression
    /// flattens the output to one value per row.
    pub fn predictions(&self, output: &Array) -> Array {
        match self {
            Task::Classification { .. } => {
                let last = Axis(output.ndim().saturating_sub(1));
                let indices: Vec<f32> = output
                    .lanes(last)
                    .into_iter()
                    .map(|lane| {
                        let mut best = 0usize;
                        let mut best_score = f32::NEG_INFINITY;
                        for (i, score) in lane.iter().enumerate() {
                            if *score > best_score {
                                best_score = *score;
                                best = i;
                            }
                        }
                        best as f32
                    })
                    .collect();
                ndarray::Array1::from_vec(indices).into_dyn()
            }
            Task::Regression => {
                let flat: Vec<f32> = output.iter().copied().collect();
                ndarray::Array1::from_vec(flat).into_dyn()
            }
        }
    }
}
