/// Train a binary logistic regression on gene counts and read back its weights.
use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{FitError, InputShapeError, LengthMismatchError};
use crate::features::FeatureMatrix;

// Solver defaults; not exposed for tuning.
const ALPHA: f64 = 1.0;
const MAX_ITERATIONS: u64 = 100;
const GRADIENT_TOLERANCE: f64 = 1e-4;
/// Largest penalized-objective gradient norm accepted as converged.
const CONVERGENCE_TOLERANCE: f64 = 1e-3;

/// A trained classifier. Immutable once built by [`train_logistic_regression`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    coefficients: Array1<f64>,
    intercept: f64,
    converged: bool,
    gradient_norm: f64,
    feature_names: Vec<String>,
}

impl FittedModel {
    /// Weights in the column order of the training matrix.
    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn gradient_norm(&self) -> f64 {
        self.gradient_norm
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Column labels of the matrix the model was trained on.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Weights paired with the training matrix's own column labels.
    pub fn labelled_coefficients(&self) -> CoefficientVector {
        CoefficientVector {
            entries: self
                .feature_names
                .iter()
                .cloned()
                .zip(self.coefficients.iter().copied())
                .collect(),
        }
    }

    /// P(y = 1 | x) for each row of `x`.
    pub fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array1<f64>, InputShapeError> {
        if x.ncols() != self.n_features() {
            return Err(InputShapeError::LabelCount {
                axis: "column",
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        Ok((x.dot(&self.coefficients) + self.intercept).mapv(sigmoid))
    }

    /// Class predictions at the 0.5 probability threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>, InputShapeError> {
        Ok(self
            .predict_probabilities(x)?
            .mapv(|p| if p >= 0.5 { 1 } else { 0 }))
    }
}

/// Feature weights keyed by name, in the order the names were given.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientVector {
    entries: Vec<(String, f64)>,
}

impl CoefficientVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, w)| w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, w)| (n.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by decreasing absolute weight.
    pub fn sorted_by_magnitude(&self) -> Vec<(String, f64)> {
        let mut out = self.entries.clone();
        out.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        out
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn validate(x: &FeatureMatrix, y: &[u8]) -> Result<(), FitError> {
    let (rows, cols) = x.values.dim();
    if rows == 0 || cols == 0 {
        return Err(InputShapeError::Empty { rows, cols }.into());
    }
    if rows != y.len() {
        return Err(FitError::ShapeMismatch {
            rows,
            labels: y.len(),
        });
    }
    if let Some(((row, col), &value)) = x.values.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(InputShapeError::NonFinite { row, col, value }.into());
    }
    if let Some((index, &value)) = y.iter().enumerate().find(|(_, &v)| v > 1) {
        return Err(InputShapeError::NonBinaryLabel { index, value }.into());
    }
    Ok(())
}

/// L2 norm of the gradient of
/// `sum_i -log sigmoid(s_i (w.x_i + b)) + alpha/2 |w|^2`, with `s_i` in {-1, +1}.
fn penalized_gradient_norm(
    x: ArrayView2<'_, f64>,
    signs: &Array1<f64>,
    w: &Array1<f64>,
    b: f64,
    alpha: f64,
) -> f64 {
    let margins = (x.dot(w) + b) * signs;
    let residual = margins.mapv(|m| sigmoid(m) - 1.0) * signs;
    let grad_w = x.t().dot(&residual) + w * alpha;
    let grad_b = residual.sum();
    (grad_w.dot(&grad_w) + grad_b * grad_b).sqrt()
}

/// Fits `P(y=1 | x) = sigmoid(w.x + b)` with an L2 penalty on `w`.
///
/// Labels must be 0/1 and line up with the rows of `x`. The returned weights
/// follow the column order of `x`.
pub fn train_logistic_regression(x: &FeatureMatrix, y: &[u8]) -> Result<FittedModel, FitError> {
    validate(x, y)?;
    info!(
        "Training logistic regression on {} samples x {} features",
        x.nrows(),
        x.ncols()
    );

    let targets: Array1<bool> = y.iter().map(|&l| l == 1).collect();
    let ds = Dataset::new(x.values.clone(), targets);
    let fitted = LogisticRegression::default()
        .alpha(ALPHA)
        .max_iterations(MAX_ITERATIONS)
        .gradient_tolerance(GRADIENT_TOLERANCE)
        .fit(&ds)?;

    // linfa picks its own positive class (majority, or first seen on a tie);
    // flip the fit so the weights always describe P(y = 1)
    let (coefficients, intercept) = if fitted.labels().pos.class {
        (fitted.params().to_owned(), fitted.intercept())
    } else {
        (fitted.params().mapv(|w| -w), -fitted.intercept())
    };

    let signs: Array1<f64> = y.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();
    let gradient_norm =
        penalized_gradient_norm(x.values.view(), &signs, &coefficients, intercept, ALPHA);
    debug!("Final gradient norm {:.3e}", gradient_norm);
    if !(gradient_norm <= CONVERGENCE_TOLERANCE) {
        return Err(FitError::NotConverged {
            gradient_norm,
            tolerance: CONVERGENCE_TOLERANCE,
        });
    }

    Ok(FittedModel {
        coefficients,
        intercept,
        converged: true,
        gradient_norm,
        feature_names: x.column_labels.clone(),
    })
}

/// Pairs `feature_names[i]` with the model's i-th weight.
///
/// Pairing is positional only: names are not checked against the labels the
/// model was trained with. Use [`FittedModel::labelled_coefficients`] for that.
pub fn get_feature_coefficients(
    model: &FittedModel,
    feature_names: &[String],
) -> Result<CoefficientVector, LengthMismatchError> {
    if feature_names.len() != model.n_features() {
        return Err(LengthMismatchError {
            expected: model.n_features(),
            found: feature_names.len(),
        });
    }
    Ok(CoefficientVector {
        entries: feature_names
            .iter()
            .cloned()
            .zip(model.coefficients.iter().copied())
            .collect(),
    })
}
