// Reshapes long-format variant records into a dense patient x gene count matrix.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, warn};
use ndarray::Array2;

use crate::error::InputShapeError;
use crate::io::VariantRecord;

/// Patient x gene variant counts. Dense: every gene seen anywhere has a column
/// in every patient's row, with 0 where the patient has no variant in it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneCountMatrix {
    pub patients: Vec<String>,
    pub genes: Vec<String>,
    /// Shape: [patients.len(), genes.len()].
    pub counts: Array2<u32>,
}

impl GeneCountMatrix {
    pub fn n_patients(&self) -> usize {
        self.patients.len()
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    fn patient_index(&self, patient: &str) -> Option<usize> {
        self.patients
            .binary_search_by(|p| p.as_str().cmp(patient))
            .ok()
    }

    fn gene_index(&self, gene: &str) -> Option<usize> {
        self.genes.binary_search_by(|g| g.as_str().cmp(gene)).ok()
    }

    /// Count for one cell, `None` if either id was never observed.
    pub fn count(&self, patient: &str, gene: &str) -> Option<u32> {
        let p = self.patient_index(patient)?;
        let g = self.gene_index(gene)?;
        Some(self.counts[[p, g]])
    }

    /// The full row for a patient, keyed by gene.
    pub fn row(&self, patient: &str) -> Option<BTreeMap<&str, u32>> {
        let p = self.patient_index(patient)?;
        Some(
            self.genes
                .iter()
                .map(String::as_str)
                .zip(self.counts.row(p).iter().copied())
                .collect(),
        )
    }

    /// Number of variant records observed for a patient across all genes.
    pub fn row_total(&self, patient: &str) -> Option<u32> {
        let p = self.patient_index(patient)?;
        Some(self.counts.row(p).sum())
    }

    /// Numeric view for the classifier: rows are patients, columns are genes.
    pub fn to_feature_matrix(&self) -> FeatureMatrix {
        FeatureMatrix {
            row_labels: self.patients.clone(),
            column_labels: self.genes.clone(),
            values: self.counts.mapv(f64::from),
        }
    }
}

/// Rectangular numeric table with named rows (samples) and columns (features).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, InputShapeError> {
        if row_labels.len() != values.nrows() {
            return Err(InputShapeError::LabelCount {
                axis: "row",
                expected: values.nrows(),
                found: row_labels.len(),
            });
        }
        if column_labels.len() != values.ncols() {
            return Err(InputShapeError::LabelCount {
                axis: "column",
                expected: values.ncols(),
                found: column_labels.len(),
            });
        }
        Ok(Self {
            row_labels,
            column_labels,
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }
}

/// Counts variants per (patient, gene).
///
/// First pass discovers the patient and gene id spaces, second pass fills a
/// zeroed dense table. Patients and genes are sorted, so the result does not
/// depend on record order. Records with a missing patient id or gene are
/// dropped, matching a group-by that discards null keys.
pub fn build_gene_level_features(
    records: &[VariantRecord],
) -> Result<GeneCountMatrix, InputShapeError> {
    let keyed: Vec<(&str, &str)> = records
        .iter()
        .filter_map(|r| Some((r.patient_id.as_deref()?, r.gene.as_deref()?)))
        .collect();

    let dropped = records.len() - keyed.len();
    if dropped > 0 {
        warn!(
            "Dropped {} variant records with a missing patient_id or gene",
            dropped
        );
    }

    // 1) Discover the patient and gene id spaces and give each id a dense index
    let patient_set: BTreeSet<&str> = keyed.iter().map(|&(p, _)| p).collect();
    let gene_set: BTreeSet<&str> = keyed.iter().map(|&(_, g)| g).collect();
    let patient_idx: HashMap<&str, usize> =
        patient_set.iter().enumerate().map(|(i, &p)| (p, i)).collect();
    let gene_idx: HashMap<&str, usize> =
        gene_set.iter().enumerate().map(|(i, &g)| (g, i)).collect();

    // 2) Scan the records once, bumping the (patient, gene) cell
    let mut counts = Array2::<u32>::zeros((patient_set.len(), gene_set.len()));
    for (p, g) in &keyed {
        counts[[patient_idx[p], gene_idx[g]]] += 1;
    }

    debug!(
        "Built gene count matrix: {} patients x {} genes from {} records",
        patient_set.len(),
        gene_set.len(),
        keyed.len()
    );

    Ok(GeneCountMatrix {
        patients: patient_set.into_iter().map(str::to_string).collect(),
        genes: gene_set.into_iter().map(str::to_string).collect(),
        counts,
    })
}
