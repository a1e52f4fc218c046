//! Evaluation metrics for the emotion classifier.

use serde::Serialize;

use super::{Classifier, LabelEncoding, TrainDataset, argmax};

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    pub class: String,
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    pub f1: f32,
    /// Number of true examples for the class.
    pub support: u32,
}

/// Accuracy plus the per-class breakdown printed after a training run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f32,
    pub samples: u64,
    pub per_class: Vec<PerClassStats>,
}

/// Run `classifier` over `data` and summarize the results per class.
pub fn evaluate(
    classifier: &dyn Classifier,
    data: &TrainDataset,
    encoding: &LabelEncoding,
) -> Result<EvaluationReport, String> {
    let mut cm = ConfusionMatrix::new(encoding.len());
    for (row, &truth) in data.x.iter().zip(&data.y) {
        let probs = classifier.infer(row)?;
        let predicted = argmax(&probs).ok_or_else(|| "Classifier returned no classes".to_string())?;
        cm.add(truth, predicted);
    }
    Ok(EvaluationReport {
        accuracy: accuracy(&cm),
        samples: cm.total(),
        per_class: precision_recall_by_class(&cm, encoding.classes()),
    })
}

/// Per-class precision, recall and F1 from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix, classes: &[String]) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    (0..k)
        .map(|class_idx| {
            let tp = cm.get(class_idx, class_idx) as f32;
            let support: u32 = (0..k).map(|j| cm.get(class_idx, j)).sum();
            let predicted: u32 = (0..k).map(|i| cm.get(i, class_idx)).sum();
            let precision = if predicted == 0 { 0.0 } else { tp / predicted as f32 };
            let recall = if support == 0 { 0.0 } else { tp / support as f32 };
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            PerClassStats {
                class: classes
                    .get(class_idx)
                    .cloned()
                    .unwrap_or_else(|| class_idx.to_string()),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

/// Fraction of samples on the diagonal.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes).map(|i| cm.get(i, i) as u64).sum();
    correct as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_and_recall_follow_confusion_counts() {
        let mut cm = ConfusionMatrix::new(2);
        cm.add(0, 0);
        cm.add(0, 0);
        cm.add(0, 1);
        cm.add(1, 1);
        cm.add(5, 0);
        let stats = precision_recall_by_class(&cm, &["angry".into(), "calm".into()]);
        assert_eq!(stats[0].class, "angry");
        assert!((stats[0].precision - 1.0).abs() < 1e-6);
        assert!((stats[0].recall - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(stats[0].support, 3);
        assert!((stats[1].precision - 0.5).abs() < 1e-6);
        assert!((stats[1].recall - 1.0).abs() < 1e-6);
        assert!((accuracy(&cm) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn empty_matrix_has_zero_accuracy() {
        assert_eq!(accuracy(&ConfusionMatrix::new(3)), 0.0);
    }

    struct AlwaysFirst;

    impl Classifier for AlwaysFirst {
        fn class_count(&self) -> usize {
            2
        }

        fn infer(&self, _features: &[f32]) -> Result<Vec<f32>, String> {
            Ok(vec![0.9, 0.1])
        }
    }

    #[test]
    fn evaluate_counts_every_row() {
        let data = TrainDataset {
            x: vec![vec![0.0]; 4],
            y: vec![0, 0, 1, 1],
            n_classes: 2,
        };
        let encoding = LabelEncoding::fit(["happy", "sad"]).unwrap();
        let report = evaluate(&AlwaysFirst, &data, &encoding).unwrap();
        assert_eq!(report.samples, 4);
        assert!((report.accuracy - 0.5).abs() < 1e-6);
        assert_eq!(report.per_class[1].class, "sad");
        assert_eq!(report.per_class[1].recall, 0.0);
    }
}
