//! Standardization followed by L2-regularized logistic regression.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Probability at or above which a prediction is "rain".
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary decision for a positive-class probability (threshold inclusive).
pub fn decide(prob: f64) -> u8 {
    u8::from(prob >= DECISION_THRESHOLD)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn check_width(row: &[f64], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(Error::data(format!(
            "Feature row has {} values, model expects {expected}",
            row.len()
        )));
    }
    Ok(())
}

/// Per-column zero-mean, unit-variance scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Population mean and standard deviation per column. Constant columns get scale 1.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| Error::data("Cannot fit scaler on zero rows"))?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            check_width(row, width)?;
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut var = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let sd = v.sqrt();
                if sd > f64::EPSILON { sd } else { 1.0 }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        check_width(row, self.mean.len())?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Reweight samples so both classes carry equal total weight.
    pub balanced: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 200,
            tol: 1e-8,
            balanced: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    /// Minimize `0.5 * |w|^2 + C * sum(s_i * logloss_i)` with damped Newton steps.
    /// The intercept is not penalized.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &LogisticParams) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::data(format!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::data("No training rows"))?;

        let n = labels.len() as f64;
        let positives = labels.iter().filter(|&&y| y == 1).count() as f64;
        let negatives = n - positives;
        if positives == 0.0 || negatives == 0.0 {
            return Err(Error::data(
                "Training labels contain a single class; need both rain and no-rain hours",
            ));
        }

        let weights: Vec<f64> = labels
            .iter()
            .map(|&y| match (params.balanced, y) {
                (false, _) => 1.0,
                (true, 1) => n / (2.0 * positives),
                (true, _) => n / (2.0 * negatives),
            })
            .collect();

        let k = width + 1;
        let design: Vec<DVector<f64>> = rows
            .iter()
            .map(|r| -> Result<DVector<f64>> {
                check_width(r, width)?;
                let values = r.iter().copied().chain(std::iter::once(1.0));
                Ok(DVector::from_iterator(k, values))
            })
            .collect::<Result<_>>()?;

        let objective = |beta: &DVector<f64>| -> f64 {
            let penalty = 0.5 * beta.rows(0, width).norm_squared();
            let loss: f64 = design
                .iter()
                .zip(labels)
                .zip(&weights)
                .map(|((x, &y), s)| {
                    let z = x.dot(beta);
                    s * (softplus(z) - f64::from(y) * z)
                })
                .sum();
            penalty + params.c * loss
        };

        let mut beta = DVector::<f64>::zeros(k);
        let mut current = objective(&beta);

        for iter in 0..params.max_iter {
            let mut grad = DVector::<f64>::zeros(k);
            let mut hess = DMatrix::<f64>::zeros(k, k);

            for ((x, &y), s) in design.iter().zip(labels).zip(&weights) {
                let p = sigmoid(x.dot(&beta));
                grad.axpy(params.c * s * (p - f64::from(y)), x, 1.0);
                hess.ger(params.c * s * p * (1.0 - p), x, x, 1.0);
            }
            for j in 0..width {
                grad[j] += beta[j];
                hess[(j, j)] += 1.0;
            }

            let step = hess
                .clone()
                .cholesky()
                .map(|ch| ch.solve(&grad))
                .or_else(|| hess.lu().solve(&grad))
                .ok_or_else(|| Error::data("Logistic regression Hessian is singular"))?;

            // Backtrack until the objective stops increasing.
            let mut t = 1.0;
            let mut next = &beta - &step * t;
            let mut value = objective(&next);
            while value > current && t > 1e-10 {
                t *= 0.5;
                next = &beta - &step * t;
                value = objective(&next);
            }

            let moved = (&step * t).amax();
            beta = next;
            current = value;

            if moved < params.tol {
                tracing::debug!(iterations = iter + 1, "Logistic regression converged");
                break;
            }
        }

        Ok(Self {
            coef: beta.rows(0, width).iter().copied().collect(),
            intercept: beta[width],
        })
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        check_width(row, self.coef.len())?;
        let dot: f64 = row.iter().zip(&self.coef).map(|(x, w)| x * w).sum();
        Ok(sigmoid(dot + self.intercept))
    }
}

/// Scaler + logistic regression, fitted and applied as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainClassifier {
    pub scaler: StandardScaler,
    pub logistic: LogisticRegression,
}

impl RainClassifier {
    /// Fit the scaler on `rows`, then the classifier on the scaled rows.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &LogisticParams) -> Result<Self> {
        let scaler = StandardScaler::fit(rows)?;
        let scaled = rows
            .iter()
            .map(|r| scaler.transform(r))
            .collect::<Result<Vec<_>>>()?;
        let logistic = LogisticRegression::fit(&scaled, labels, params)?;

        Ok(Self { scaler, logistic })
    }

    pub fn n_features(&self) -> usize {
        self.logistic.coef.len()
    }

    /// Probability of the positive ("rain") class.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        self.logistic.predict_proba(&self.scaler.transform(row)?)
    }

    pub fn predict(&self, row: &[f64]) -> Result<u8> {
        self.predict_proba(row).map(decide)
    }
}
