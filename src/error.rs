// Error types for loading, feature building, fitting and weight extraction.
use thiserror::Error;

/// Malformed input: missing columns, ragged or non-numeric matrices, bad labels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputShapeError {
    #[error("required column '{0}' was not found in the input header")]
    MissingColumn(String),
    #[error("feature matrix is empty ({rows} rows x {cols} columns)")]
    Empty { rows: usize, cols: usize },
    #[error("feature matrix has {found} {axis} labels but {expected} {axis}s")]
    LabelCount {
        axis: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("non-finite value {value} at row {row}, column {col}")]
    NonFinite { row: usize, col: usize, value: f64 },
    #[error("label {value} at position {index} is not binary (expected 0 or 1)")]
    NonBinaryLabel { index: usize, value: u8 },
    #[error("label '{value}' for patient '{patient}' is not 0 or 1")]
    UnparsableLabel { patient: String, value: String },
    #[error("no response label supplied for patient '{0}'")]
    MissingLabel(String),
}

/// Failures while fitting the logistic classifier.
#[derive(Error, Debug)]
pub enum FitError {
    #[error(transparent)]
    InputShape(#[from] InputShapeError),
    #[error("feature matrix has {rows} rows but {labels} labels were supplied")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("logistic regression solver failed: {0}")]
    Solver(#[from] linfa_logistic::error::Error),
    #[error("solver did not converge (gradient norm {gradient_norm:.3e} > {tolerance:.1e})")]
    NotConverged { gradient_norm: f64, tolerance: f64 },
}

/// Feature names do not line up with the model's weights.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected} feature names to match the model's weights, got {found}")]
pub struct LengthMismatchError {
    pub expected: usize,
    pub found: usize,
}

/// Failures while reading the CSV inputs.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    InputShape(#[from] InputShapeError),
}
