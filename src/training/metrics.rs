//! Evaluation metrics
//!
//! Confusion matrix with per-class precision, recall and F1. A class with
//! no predicted rows has no precision and a class with no true rows has
//! no recall; both surface as `UndefinedMetric` instead of NaN.

use std::fmt;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::model::Predictor;
use crate::{GridironError, MetricKind, Outcome, Result};

/// Counts indexed `[true class, predicted class]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    pub fn from_predictions(
        y_true: ArrayView1<usize>,
        y_pred: ArrayView1<usize>,
        n_classes: usize,
    ) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(GridironError::DataShape(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(GridironError::DataShape(
                "cannot evaluate zero predictions".to_string(),
            ));
        }

        let mut counts = Array2::<usize>::zeros((n_classes, n_classes));
        for (&truth, &predicted) in y_true.iter().zip(y_pred.iter()) {
            if truth >= n_classes || predicted >= n_classes {
                return Err(GridironError::DataShape(format!(
                    "label pair ({}, {}) outside {} classes",
                    truth, predicted, n_classes
                )));
            }
            counts[[truth, predicted]] += 1;
        }
        Ok(ConfusionMatrix { counts })
    }

    pub fn from_counts(counts: Array2<usize>) -> Result<Self> {
        if counts.nrows() != counts.ncols() || counts.is_empty() {
            return Err(GridironError::DataShape(format!(
                "confusion matrix must be square, got {:?}",
                counts.dim()
            )));
        }
        Ok(ConfusionMatrix { counts })
    }

    pub fn counts(&self) -> ArrayView2<usize> {
        self.counts.view()
    }

    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }

    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f64 / total as f64,
        }
    }

    /// True instances of `class` (row sum)
    pub fn support(&self, class: usize) -> usize {
        self.counts.row(class).sum()
    }

    /// Instances predicted as `class` (column sum)
    pub fn predicted(&self, class: usize) -> usize {
        self.counts.column(class).sum()
    }

    /// TP / (TP + FP)
    pub fn precision(&self, class: usize) -> Result<f64> {
        match self.predicted(class) {
            0 => Err(GridironError::UndefinedMetric {
                class,
                metric: MetricKind::Precision,
                reason: "no predicted instances",
            }),
            predicted => Ok(self.counts[[class, class]] as f64 / predicted as f64),
        }
    }

    /// TP / (TP + FN)
    pub fn recall(&self, class: usize) -> Result<f64> {
        match self.support(class) {
            0 => Err(GridironError::UndefinedMetric {
                class,
                metric: MetricKind::Recall,
                reason: "no true instances",
            }),
            support => Ok(self.counts[[class, class]] as f64 / support as f64),
        }
    }

    /// Harmonic mean of precision and recall, 0 when both are 0
    pub fn f1(&self, class: usize) -> Result<f64> {
        let as_f1 = |e: GridironError| match e {
            GridironError::UndefinedMetric { class, reason, .. } => GridironError::UndefinedMetric {
                class,
                metric: MetricKind::F1,
                reason,
            },
            other => other,
        };
        let precision = self.precision(class).map_err(as_f1)?;
        let recall = self.recall(class).map_err(as_f1)?;
        if precision + recall == 0.0 {
            Ok(0.0)
        } else {
            Ok(2.0 * precision * recall / (precision + recall))
        }
    }

    pub fn class_scores(&self, class: usize) -> Result<ClassScores> {
        Ok(ClassScores {
            precision: self.precision(class)?,
            recall: self.recall(class)?,
            f1: self.f1(class)?,
            support: self.support(class),
        })
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.counts.rows() {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>6}", c)).collect();
            writeln!(f, "[{} ]", cells.join(""))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Held-out evaluation of a fitted model
#[derive(Debug)]
pub struct Evaluation {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    /// One entry per class; `Err` holds the `UndefinedMetric` cause
    pub classes: Vec<Result<ClassScores>>,
}

impl Evaluation {
    pub fn from_predictions(y_true: ArrayView1<usize>, y_pred: ArrayView1<usize>) -> Result<Self> {
        let confusion = ConfusionMatrix::from_predictions(y_true, y_pred, Outcome::COUNT)?;
        Ok(Self::from_confusion(confusion))
    }

    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let classes = (0..confusion.n_classes())
            .map(|class| confusion.class_scores(class))
            .collect();
        Evaluation {
            accuracy: confusion.accuracy(),
            confusion,
            classes,
        }
    }

    /// Unweighted mean F1, if defined for every class
    pub fn macro_f1(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .classes
            .iter()
            .map(|scores| scores.as_ref().ok().map(|s| s.f1))
            .collect::<Option<Vec<_>>>()?;
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

fn class_label(class: usize) -> String {
    Outcome::from_class(class)
        .map(|outcome| outcome.to_string())
        .unwrap_or_else(|| format!("class {}", class))
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (class, scores) in self.classes.iter().enumerate() {
            match scores {
                Ok(s) => writeln!(
                    f,
                    "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                    class_label(class),
                    s.precision,
                    s.recall,
                    s.f1,
                    s.support
                )?,
                Err(e) => writeln!(
                    f,
                    "{:>12} {:>10} ({}) {:>10}",
                    class_label(class),
                    "undefined",
                    e,
                    self.confusion.support(class)
                )?,
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        )?;
        if let Some(macro_f1) = self.macro_f1() {
            writeln!(
                f,
                "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
                "macro f1",
                "",
                "",
                macro_f1,
                self.confusion.total()
            )?;
        }
        Ok(())
    }
}

/// Score `model` on held-out data
pub fn evaluate<P: Predictor + ?Sized>(
    model: &P,
    x: ArrayView2<f64>,
    y: ArrayView1<usize>,
) -> Result<Evaluation> {
    let predicted = model.predict(x)?;
    let evaluation = Evaluation::from_predictions(y, predicted.view())?;
    log::info!(
        "Evaluated {} rows: accuracy {:.2}%",
        y.len(),
        evaluation.accuracy * 100.0
    );
    Ok(evaluation)
}
