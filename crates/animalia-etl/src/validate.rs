//! Schema validation for normalized species records
//!
//! Partitions a batch of loosely-typed records into accepted and rejected
//! sets. An invalid record is data, not an error: it is captured with its
//! input index, original content, and a structured error, and never aborts
//! the batch. The only fatal path is an input file that cannot be parsed as
//! a JSON array of objects.

use crate::model::{Animal, IucnStatus};
use crate::write_json_artifact;
use animalia_common::{EtlError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// Accepted-records artifact file name.
pub const VALIDATED_FILE: &str = "animals_validated.json";

/// Rejected-records artifact file name. Written only when at least one
/// record was rejected; its absence signals zero rejections.
pub const VALIDATION_ERRORS_FILE: &str = "animals_validation_errors.json";

/// Classification of a per-record validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationErrorKind {
    MissingRequiredField,
    TypeMismatch,
    InvalidEnumValue,
}

/// A record that failed validation, with full context for triage
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRecord {
    /// Zero-based position in the input batch
    pub index: usize,

    /// The original, unmodified input record
    pub record: Value,

    /// Human-readable error message
    pub error: String,

    /// Error classification tag
    #[serde(rename = "error_type")]
    pub kind: ValidationErrorKind,
}

/// The outcome of validating a single record
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Accepted(Animal),
    Rejected(RejectedRecord),
}

/// Deterministic partition of a batch into accepted and rejected records.
///
/// Invariant: `accepted.len() + rejected.len()` equals the input length, and
/// both sets preserve input order.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub accepted: Vec<Animal>,
    pub rejected: Vec<RejectedRecord>,
}

impl ValidationReport {
    /// Total number of input records covered by this report
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

/// A single field-rule violation: the first one found rejects the record.
struct FieldViolation {
    kind: ValidationErrorKind,
    message: String,
}

impl FieldViolation {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// JSON type name for error messages
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract an optional string field: absent and null are both `None`,
/// any non-string value is a type mismatch.
fn optional_string(
    record: &Map<String, Value>,
    field: &str,
) -> std::result::Result<Option<String>, FieldViolation> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FieldViolation::new(
            ValidationErrorKind::TypeMismatch,
            format!(
                "field '{}' must be a string or null, got {}",
                field,
                type_name(other)
            ),
        )),
    }
}

/// Extract the required scientific name: must be present, a string, and
/// non-empty.
fn required_name(record: &Map<String, Value>) -> std::result::Result<String, FieldViolation> {
    match record.get("nom") {
        None | Some(Value::Null) => Err(FieldViolation::new(
            ValidationErrorKind::MissingRequiredField,
            "missing required field 'nom'",
        )),
        Some(Value::String(s)) if s.is_empty() => Err(FieldViolation::new(
            ValidationErrorKind::MissingRequiredField,
            "required field 'nom' must not be empty",
        )),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(FieldViolation::new(
            ValidationErrorKind::TypeMismatch,
            format!("field 'nom' must be a string, got {}", type_name(other)),
        )),
    }
}

/// Extract and check the conservation status against the IUCN enumeration.
fn conservation_status(
    record: &Map<String, Value>,
) -> std::result::Result<Option<IucnStatus>, FieldViolation> {
    let Some(raw) = optional_string(record, "statutUICN")? else {
        return Ok(None);
    };

    raw.parse::<IucnStatus>().map(Some).map_err(|_| {
        FieldViolation::new(
            ValidationErrorKind::InvalidEnumValue,
            format!(
                "unknown conservation status '{}' (valid statuses: {})",
                raw,
                IucnStatus::valid_codes()
            ),
        )
    })
}

/// Validate a single record against the canonical schema.
///
/// Fields are checked in the stable artifact order; the first violation
/// found determines the reported error. Unknown fields are ignored. On
/// success the returned [`Animal`] carries every recognized field, with
/// absent optional fields as `None`.
pub fn validate_record(index: usize, record: &Map<String, Value>) -> ValidationOutcome {
    match check_record(record) {
        Ok(animal) => ValidationOutcome::Accepted(animal),
        Err(violation) => ValidationOutcome::Rejected(RejectedRecord {
            index,
            record: Value::Object(record.clone()),
            error: violation.message,
            kind: violation.kind,
        }),
    }
}

fn check_record(record: &Map<String, Value>) -> std::result::Result<Animal, FieldViolation> {
    Ok(Animal {
        nom: required_name(record)?,
        nom_commun: optional_string(record, "nom_commun")?,
        rang: optional_string(record, "rang")?,
        statut_uicn: conservation_status(record)?,
        ordre: optional_string(record, "ordre")?,
        famille: optional_string(record, "famille")?,
        genre: optional_string(record, "genre")?,
        descriptions: optional_string(record, "descriptions")?,
        image_url: optional_string(record, "imageUrl")?,
    })
}

/// Validate a whole batch, preserving input order in both result sets.
pub fn validate_batch(records: &[Map<String, Value>]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (index, record) in records.iter().enumerate() {
        match validate_record(index, record) {
            ValidationOutcome::Accepted(animal) => report.accepted.push(animal),
            ValidationOutcome::Rejected(rejected) => {
                let name = record
                    .get("nom")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>");
                warn!(index, name, error = %rejected.error, "record rejected");
                report.rejected.push(rejected);
            }
        }
    }

    info!(
        accepted = report.accepted.len(),
        rejected = report.rejected.len(),
        "validation finished"
    );

    report
}

/// Load a batch file as a sequence of mappings.
///
/// This is the validator's only hard-error path: a container that is not a
/// JSON array of objects is fatal for the whole batch.
pub fn load_batch(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| EtlError::malformed(path.display().to_string(), e))
}

/// Validate a batch file and write the result artifacts.
///
/// Always writes the accepted-records artifact (possibly an empty array).
/// Writes the errors artifact only when at least one record was rejected;
/// a stale errors artifact from a previous run is removed so its absence
/// keeps meaning zero rejections.
pub fn validate_file(input: &Path, output_dir: &Path) -> Result<ValidationReport> {
    let records = load_batch(input)?;
    info!(path = %input.display(), records = records.len(), "batch loaded");

    let report = validate_batch(&records);

    let validated_path = output_dir.join(VALIDATED_FILE);
    write_json_artifact(&validated_path, &report.accepted)?;
    info!(path = %validated_path.display(), "accepted records written");

    let errors_path = output_dir.join(VALIDATION_ERRORS_FILE);
    if report.rejected.is_empty() {
        if errors_path.exists() {
            std::fs::remove_file(&errors_path)?;
        }
    } else {
        write_json_artifact(&errors_path, &report.rejected)?;
        warn!(path = %errors_path.display(), count = report.rejected.len(), "validation errors written");
    }

    Ok(report)
}
