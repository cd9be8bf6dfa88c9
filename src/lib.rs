//! Therapy-response modelling from NGS variant calls: per-patient gene counts
//! feed a binary logistic regression whose per-gene weights are reported.
pub mod error;
pub mod features;
pub mod io;
pub mod model;

pub use error::{FitError, InputShapeError, IoError, LengthMismatchError};
pub use features::{build_gene_level_features, FeatureMatrix, GeneCountMatrix};
pub use io::{align_labels, load_labels, load_variants, LabelRecord, VariantRecord};
pub use model::{
    get_feature_coefficients, train_logistic_regression, CoefficientVector, FittedModel,
};
