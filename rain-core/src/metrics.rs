//! Held-out evaluation: per-class report, ROC curve and ROC-AUC.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Indexed by label: `[0]` is "no rain", `[1]` is "rain".
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn class_metrics(truth: &[u8], pred: &[u8], label: u8) -> ClassMetrics {
    let mut tp = 0;
    let mut predicted = 0;
    let mut support = 0;
    for (&t, &p) in truth.iter().zip(pred) {
        if p == label {
            predicted += 1;
        }
        if t == label {
            support += 1;
            if p == label {
                tp += 1;
            }
        }
    }

    let precision = ratio(tp, predicted);
    let recall = ratio(tp, support);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

impl ClassificationReport {
    /// Undefined ratios (no predictions or no support for a class) count as 0.
    pub fn compute(truth: &[u8], pred: &[u8]) -> Self {
        let classes = [class_metrics(truth, pred, 0), class_metrics(truth, pred, 1)];
        let total = truth.len();
        let correct = truth.iter().zip(pred).filter(|(t, p)| t == p).count();

        let macro_avg = ClassMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            let sum: f64 = classes.iter().map(|c| f(c) * c.support as f64).sum();
            sum / total.max(1) as f64
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    pub threshold: f64,
}

fn class_counts(truth: &[u8]) -> (usize, usize) {
    let pos = truth.iter().filter(|&&y| y == 1).count();
    (pos, truth.len() - pos)
}

/// ROC points from the strictest threshold down, one per distinct score.
/// Returns an empty curve when `truth` holds a single class.
pub fn roc_curve(truth: &[u8], scores: &[f64]) -> Vec<RocPoint> {
    let (pos, neg) = class_counts(truth);
    if pos == 0 || neg == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..scores.len().min(truth.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let origin = RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    };
    let mut points = vec![origin];
    let (mut tp, mut fp) = (0usize, 0usize);

    for (i, &idx) in order.iter().enumerate() {
        if truth[idx] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }

        let last_of_tie = order
            .get(i + 1)
            .is_none_or(|&next| scores[next] != scores[idx]);
        if last_of_tie {
            points.push(RocPoint {
                fpr: ratio(fp, neg),
                tpr: ratio(tp, pos),
                threshold: scores[idx],
            });
        }
    }

    points
}

/// Area under the ROC curve, or `None` if only one class is present.
pub fn roc_auc(truth: &[u8], scores: &[f64]) -> Option<f64> {
    let curve = roc_curve(truth, scores);
    if curve.is_empty() {
        return None;
    }

    let area = curve
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum();
    Some(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn report_counts_per_class() {
        let truth = [0, 0, 0, 1, 1];
        let pred = [0, 0, 1, 1, 0];

        let report = ClassificationReport::compute(&truth, &pred);

        let rain = report.classes[1];
        assert!(close(rain.precision, 0.5));
        assert!(close(rain.recall, 0.5));
        assert_eq!(rain.support, 2);

        let dry = report.classes[0];
        assert!(close(dry.precision, 2.0 / 3.0));
        assert!(close(dry.recall, 2.0 / 3.0));
        assert_eq!(dry.support, 3);

        assert!(close(report.accuracy, 0.6));
        assert_eq!(report.macro_avg.support, 5);
        assert!(close(report.weighted_avg.recall, 0.6));
    }

    #[test]
    fn report_handles_class_never_predicted() {
        let report = ClassificationReport::compute(&[0, 1], &[0, 0]);

        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
        assert!(close(report.classes[0].precision, 0.5));
    }

    #[test]
    fn auc_perfect_and_inverted() {
        let truth = [0, 0, 1, 1];

        assert_eq!(roc_auc(&truth, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&truth, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
    }

    #[test]
    fn auc_counts_ties_as_half() {
        let auc = roc_auc(&[0, 1], &[0.5, 0.5]).unwrap();
        assert!(close(auc, 0.5));
    }

    #[test]
    fn auc_mixed_ranking() {
        // One of four positive/negative pairs is mis-ordered.
        let auc = roc_auc(&[0, 1, 0, 1], &[0.1, 0.4, 0.5, 0.8]).unwrap();
        assert!(close(auc, 0.75));
    }

    #[test]
    fn auc_is_skipped_for_single_class() {
        assert_eq!(roc_auc(&[0, 0, 0], &[0.1, 0.2, 0.3]), None);
        assert!(roc_curve(&[1, 1], &[0.1, 0.2]).is_empty());
    }

    #[test]
    fn curve_ends_at_one_one() {
        let curve = roc_curve(&[0, 1, 1, 0], &[0.3, 0.9, 0.6, 0.1]);
        let last = curve.last().unwrap();

        assert_eq!(curve[0].tpr, 0.0);
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
        assert!(curve.windows(2).all(|w| w[0].threshold > w[1].threshold));
    }
}
