// Module for loading the variant and response tables. It reads the csv files, checks headers, and keeps missing keys as None.
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use serde::Deserialize;

use crate::error::{InputShapeError, IoError};

/// One observed variant for one patient in one gene.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantRecord {
    #[serde(rename = "patient_id", default)]
    pub patient_id: Option<String>,
    #[serde(rename = "gene", default)]
    pub gene: Option<String>,
    #[serde(rename = "variant", default)]
    pub variant: Option<String>,
}

impl VariantRecord {
    pub fn new(patient_id: &str, gene: &str, variant: &str) -> Self {
        Self {
            patient_id: Some(patient_id.to_string()),
            gene: Some(gene.to_string()),
            variant: Some(variant.to_string()),
        }
    }
}

/// Therapy response for one patient, as read from the label table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelRecord {
    pub patient_id: String,
    pub response: String,
}

fn reader(path: &Path) -> Result<csv::Reader<File>, IoError> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn require_columns(headers: &StringRecord, required: &[&str]) -> Result<(), InputShapeError> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(InputShapeError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

fn is_blank(raw: &StringRecord) -> bool {
    raw.iter().all(|f| f.trim().is_empty())
}

/// Reads a `patient_id,gene[,variant]` table. Empty cells become `None`.
pub fn load_variants(path: impl AsRef<Path>) -> Result<Vec<VariantRecord>, IoError> {
    let path = path.as_ref();
    let mut rdr = reader(path)?;
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &["patient_id", "gene"])?;

    let mut out = Vec::new();
    for result in rdr.records() {
        let raw = result?;
        if is_blank(&raw) {
            continue;
        }
        // empty cells deserialize to None
        out.push(raw.deserialize::<VariantRecord>(Some(&headers))?);
    }

    info!("Loaded {} variant records from {}", out.len(), path.display());
    Ok(out)
}

/// Reads a `patient_id,response` table.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<LabelRecord>, IoError> {
    let path = path.as_ref();
    let mut rdr = reader(path)?;
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &["patient_id", "response"])?;

    let mut out = Vec::new();
    for result in rdr.records() {
        let raw = result?;
        if is_blank(&raw) {
            continue;
        }
        out.push(raw.deserialize::<LabelRecord>(Some(&headers))?);
    }

    info!("Loaded {} response labels from {}", out.len(), path.display());
    Ok(out)
}

/// Orders the labels to follow `patients`; every patient needs a 0/1 response.
pub fn align_labels(patients: &[String], labels: &[LabelRecord]) -> Result<Vec<u8>, InputShapeError> {
    let mut by_patient: HashMap<&str, &str> = HashMap::with_capacity(labels.len());
    for label in labels {
        by_patient.insert(label.patient_id.as_str(), label.response.as_str());
    }

    let mut y = Vec::with_capacity(patients.len());
    for patient in patients {
        let raw = by_patient
            .remove(patient.as_str())
            .ok_or_else(|| InputShapeError::MissingLabel(patient.clone()))?;
        let value = match raw {
            "0" => 0,
            "1" => 1,
            other => {
                return Err(InputShapeError::UnparsableLabel {
                    patient: patient.clone(),
                    value: other.to_string(),
                })
            }
        };
        y.push(value);
    }

    for unused in by_patient.keys() {
        debug!("Ignoring label for patient '{}' with no variants", unused);
    }
    Ok(y)
}
