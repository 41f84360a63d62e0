//! Evaluation metrics for multi-class predictions

use std::fmt;

/// Fraction of predictions equal to the true label
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(truth, pred)| truth == pred)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Confusion matrix: rows are true classes, columns predicted classes
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tally predictions for classes `0..n_classes`; out-of-range labels are ignored
    pub fn new(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let mut counts = vec![vec![0; n_classes]; n_classes];
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            if truth < n_classes && pred < n_classes {
                counts[truth][pred] += 1;
            }
        }
        Self { counts }
    }

    /// Count of samples of class `truth` predicted as `pred`
    pub fn get(&self, truth: usize, pred: usize) -> usize {
        self.counts[truth][pred]
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Correct predictions of class `k`
    pub fn true_positives(&self, k: usize) -> usize {
        self.counts[k][k]
    }

    /// Samples wrongly predicted as class `k`
    pub fn false_positives(&self, k: usize) -> usize {
        (0..self.n_classes())
            .filter(|&t| t != k)
            .map(|t| self.counts[t][k])
            .sum()
    }

    /// Samples of class `k` predicted as something else
    pub fn false_negatives(&self, k: usize) -> usize {
        (0..self.n_classes())
            .filter(|&p| p != k)
            .map(|p| self.counts[k][p])
            .sum()
    }

    /// Samples whose true class is `k`
    pub fn support(&self, k: usize) -> usize {
        self.counts[k].iter().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.counts {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>3}")).collect();
            writeln!(f, "[{}]", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(label: String, tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * (precision * recall) / (precision + recall)
        };
        Self {
            label,
            precision,
            recall,
            f1_score,
            support: tp + fn_,
        }
    }
}

/// Per-class metrics with macro and weighted averages
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build the report; `labels` names classes `0..labels.len()`
    pub fn new(y_true: &[usize], y_pred: &[usize], labels: &[&str]) -> Self {
        let matrix = ConfusionMatrix::new(y_true, y_pred, labels.len());
        let classes: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(k, name)| {
                ClassMetrics::from_counts(
                    name.to_string(),
                    matrix.true_positives(k),
                    matrix.false_positives(k),
                    matrix.false_negatives(k),
                )
            })
            .collect();

        let total_support: usize = classes.iter().map(|c| c.support).sum();
        let n = classes.len().max(1) as f64;
        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n,
            support: total_support,
        };

        let weight = |c: &ClassMetrics| {
            if total_support == 0 {
                0.0
            } else {
                c.support as f64 / total_support as f64
            }
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1_score: classes.iter().map(|c| c.f1_score * weight(c)).sum(),
            support: total_support,
        };

        Self {
            classes,
            accuracy: accuracy(y_true, y_pred),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            write_row(f, c)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, &self.macro_avg)?;
        write_row(f, &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, c: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        c.label, c.precision, c.recall, c.f1_score, c.support
    )
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
