use crate::functions;
use crate::table::FeatureMatrix;
use crate::Predictor;
use itertools::izip;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Penalty {
    /// Lasso (`‖w‖₁`).
    L1,

    /// Ridge (`½‖w‖²`).
    L2,
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::L1 => write!(f, "l1"),
            Self::L2 => write!(f, "l2"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegressionOptions {
    penalty: Penalty,
    c: f64,
    fit_intercept: bool,
    max_iter: usize,
    tol: f64,
}

impl LogisticRegressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    /// Inverse regularization strength; smaller values regularize more.
    pub fn c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn fit_intercept(mut self, enabled: bool) -> Self {
        self.fit_intercept = enabled;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Minimizes `mean log-loss + penalty(w) / (C * n)` with accelerated
    /// proximal gradient descent.
    ///
    /// The intercept is never penalized. Fails with [`FitError::NotConverged`]
    /// when `max_iter` steps do not bring the gradient mapping under `tol`.
    pub fn fit(
        &self,
        features: &FeatureMatrix,
        target: &[f64],
    ) -> Result<LogisticRegression, FitError> {
        self.validate(features, target)?;

        let problem = Problem {
            columns: features.columns(),
            target,
            lambda: 1.0 / (self.c * target.len() as f64),
            penalty: self.penalty,
            fit_intercept: self.fit_intercept,
        };
        let step = 1.0 / problem.lipschitz();
        log::debug!(
            "fitting logistic regression: penalty={}, C={}, step={}",
            self.penalty,
            self.c,
            step
        );

        let features_len = features.features_len();
        let mut current = Params::zeros(features_len);
        let mut point = current.clone();
        let mut momentum = 1.0f64;
        for iteration in 1..=self.max_iter {
            let gradient = problem.gradient(&point);
            let next = problem.proximal_step(&point, &gradient, step);

            let mapping_norm = point.max_abs_diff(&next) / step;
            if mapping_norm < self.tol {
                log::debug!("converged after {} iterations", iteration);
                return Ok(LogisticRegression {
                    coefficients: next.weights,
                    intercept: next.intercept,
                    iterations: iteration,
                });
            }

            // Adaptive restart: drop the momentum once it points uphill.
            if point.diff_dot(&next, &current) > 0.0 {
                momentum = 1.0;
            }
            let next_momentum = (1.0 + (1.0 + 4.0 * momentum * momentum).sqrt()) / 2.0;
            point = next.extrapolate(&current, (momentum - 1.0) / next_momentum);
            current = next;
            momentum = next_momentum;
        }

        Err(FitError::NotConverged {
            iterations: self.max_iter,
        })
    }

    fn validate(&self, features: &FeatureMatrix, target: &[f64]) -> Result<(), FitError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(FitError::InvalidStrength(self.c));
        }
        if target.is_empty() {
            return Err(FitError::EmptyRows);
        }
        if features.rows_len() != target.len() {
            return Err(FitError::RowSizeMismatch);
        }
        if let Some(&label) = target.iter().find(|&&y| y != 0.0 && y != 1.0) {
            return Err(FitError::NonBinaryTarget(label));
        }
        if let Some(i) = features
            .columns()
            .iter()
            .position(|c| c.iter().any(|x| !x.is_finite()))
        {
            return Err(FitError::NonFiniteFeature {
                feature: features.names()[i].clone(),
            });
        }
        Ok(())
    }
}

impl Default for LogisticRegressionOptions {
    fn default() -> Self {
        Self {
            penalty: Penalty::L2,
            c: 1.0,
            fit_intercept: true,
            max_iter: 10_000,
            tol: 1e-4,
        }
    }
}

/// A fitted binary classifier.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    iterations: usize,
}

impl LogisticRegression {
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn decision_function(&self, row: &[f64]) -> f64 {
        functions::dot(&self.coefficients, row) + self.intercept
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        functions::sigmoid(self.decision_function(row))
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.decision_function(row) > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    /// Fraction of rows whose predicted label equals `target`.
    pub fn score(&self, features: &FeatureMatrix, target: &[f64]) -> f64 {
        functions::mean(
            features
                .rows()
                .zip(target.iter())
                .map(|(row, &y)| if self.predict(&row) == y { 1.0 } else { 0.0 }),
        )
    }
}

impl Predictor for LogisticRegression {
    fn predict(&self, row: &[f64]) -> f64 {
        LogisticRegression::predict(self, row)
    }
}

#[derive(Debug, Clone)]
struct Params {
    weights: Vec<f64>,
    intercept: f64,
}

impl Params {
    fn zeros(features_len: usize) -> Self {
        Self {
            weights: vec![0.0; features_len],
            intercept: 0.0,
        }
    }

    fn max_abs_diff(&self, other: &Self) -> f64 {
        self.weights
            .iter()
            .zip(other.weights.iter())
            .map(|(a, b)| (a - b).abs())
            .fold((self.intercept - other.intercept).abs(), f64::max)
    }

    /// `(self - next) · (next - prev)`
    fn diff_dot(&self, next: &Self, prev: &Self) -> f64 {
        izip!(&self.weights, &next.weights, &prev.weights)
            .map(|(s, n, p)| (s - n) * (n - p))
            .sum::<f64>()
            + (self.intercept - next.intercept) * (next.intercept - prev.intercept)
    }

    fn extrapolate(&self, prev: &Self, beta: f64) -> Self {
        Self {
            weights: self
                .weights
                .iter()
                .zip(prev.weights.iter())
                .map(|(w, p)| w + beta * (w - p))
                .collect(),
            intercept: self.intercept + beta * (self.intercept - prev.intercept),
        }
    }
}

struct Problem<'a> {
    columns: &'a [Vec<f64>],
    target: &'a [f64],
    lambda: f64,
    penalty: Penalty,
    fit_intercept: bool,
}

impl<'a> Problem<'a> {
    fn rows_len(&self) -> f64 {
        self.target.len() as f64
    }

    fn lipschitz(&self) -> f64 {
        let squares = self
            .columns
            .iter()
            .flat_map(|c| c.iter())
            .map(|x| x * x)
            .sum::<f64>();
        let intercept = if self.fit_intercept { 1.0 } else { 0.0 };
        let mut l = 0.25 * (squares / self.rows_len() + intercept);
        if self.penalty == Penalty::L2 {
            l += self.lambda;
        }
        if l > 0.0 {
            l
        } else {
            1.0
        }
    }

    fn gradient(&self, params: &Params) -> Params {
        let mut z = vec![params.intercept; self.target.len()];
        for (column, &w) in self.columns.iter().zip(params.weights.iter()) {
            for (z, x) in z.iter_mut().zip(column.iter()) {
                *z += w * x;
            }
        }
        let residuals = z
            .iter()
            .zip(self.target.iter())
            .map(|(&z, &y)| functions::sigmoid(z) - y)
            .collect::<Vec<_>>();

        let n = self.rows_len();
        let weights = self
            .columns
            .iter()
            .zip(params.weights.iter())
            .map(|(column, &w)| {
                let g = functions::dot(column, &residuals) / n;
                match self.penalty {
                    Penalty::L2 => g + self.lambda * w,
                    Penalty::L1 => g,
                }
            })
            .collect();
        let intercept = if self.fit_intercept {
            residuals.iter().sum::<f64>() / n
        } else {
            0.0
        };
        Params { weights, intercept }
    }

    fn proximal_step(&self, point: &Params, gradient: &Params, step: f64) -> Params {
        let threshold = step * self.lambda;
        let weights = point
            .weights
            .iter()
            .zip(gradient.weights.iter())
            .map(|(w, g)| {
                let w = w - step * g;
                match self.penalty {
                    Penalty::L2 => w,
                    Penalty::L1 => w.signum() * (w.abs() - threshold).max(0.0),
                }
            })
            .collect();
        Params {
            weights,
            intercept: point.intercept - step * gradient.intercept,
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("features and target must have one or more rows")]
    EmptyRows,

    #[error("features and target have different row counts")]
    RowSizeMismatch,

    #[error("target must only contain 0 or 1, found {0}")]
    NonBinaryTarget(f64),

    #[error("feature {feature:?} contains non finite numbers")]
    NonFiniteFeature { feature: String },

    #[error("regularization strength C must be a positive finite number, got {0}")]
    InvalidStrength(f64),

    #[error("solver did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (FeatureMatrix, Vec<f64>) {
        let mut x1 = Vec::new();
        let mut x2 = Vec::new();
        let mut y = Vec::new();
        for i in (-10..=10).filter(|&i| i != 0) {
            for &sign in &[1.0, -1.0] {
                x1.push(i as f64 / 5.0);
                x2.push(sign);
                y.push(if i > 0 { 1.0 } else { 0.0 });
            }
        }
        let features =
            FeatureMatrix::new(vec!["x1".to_owned(), "x2".to_owned()], vec![x1, x2])
                .expect("valid matrix");
        (features, y)
    }

    #[test]
    fn separable_data_is_learned() -> anyhow::Result<()> {
        let (features, target) = separable();
        let model = LogisticRegressionOptions::new()
            .penalty(Penalty::L2)
            .c(1.0)
            .fit(&features, &target)?;

        assert!(model.iterations() < 10_000);
        assert!(model.coefficients()[0] > 0.0);
        let accuracy = model.score(&features, &target);
        assert!(accuracy >= 0.95, "accuracy = {}", accuracy);
        assert!(model.predict_proba(&[2.0, 1.0]) > 0.5);
        assert!(model.predict_proba(&[-2.0, 1.0]) < 0.5);
        Ok(())
    }

    #[test]
    fn l1_zeroes_uninformative_feature() -> anyhow::Result<()> {
        let (features, target) = separable();
        let model = LogisticRegressionOptions::new()
            .penalty(Penalty::L1)
            .c(0.5)
            .fit(&features, &target)?;

        assert!(model.coefficients()[0] > 0.0);
        assert_eq!(model.coefficients()[1], 0.0);
        Ok(())
    }

    #[test]
    fn stronger_regularization_shrinks_coefficients() -> anyhow::Result<()> {
        let (features, target) = separable();
        let weak = LogisticRegressionOptions::new().c(1.0).fit(&features, &target)?;
        let strong = LogisticRegressionOptions::new().c(0.01).fit(&features, &target)?;
        assert!(strong.coefficients()[0].abs() < weak.coefficients()[0].abs());
        Ok(())
    }

    #[test]
    fn exhausted_iterations_is_convergence_error() {
        let (features, target) = separable();
        let result = LogisticRegressionOptions::new()
            .max_iter(1)
            .fit(&features, &target);
        assert_eq!(
            result.map(|_| ()),
            Err(FitError::NotConverged { iterations: 1 })
        );
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let (features, target) = separable();
        let fit = |options: LogisticRegressionOptions, target: &[f64]| {
            options.fit(&features, target).map(|_| ())
        };

        assert_eq!(
            fit(LogisticRegressionOptions::new().c(0.0), &target),
            Err(FitError::InvalidStrength(0.0))
        );
        assert_eq!(
            fit(LogisticRegressionOptions::new(), &target[1..]),
            Err(FitError::RowSizeMismatch)
        );

        let mut bad = target.clone();
        bad[3] = 2.0;
        assert_eq!(
            fit(LogisticRegressionOptions::new(), &bad),
            Err(FitError::NonBinaryTarget(2.0))
        );
    }
}
