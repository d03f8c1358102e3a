//! Send client for the target catalog API
//!
//! Pushes each validated record individually to the configured endpoint, in
//! input order, collecting per-record outcomes. A failed send is recorded
//! and the remaining records are still attempted; only a missing or
//! malformed input artifact aborts the stage.

use crate::model::Animal;
use crate::retry::RetryPolicy;
use crate::write_json_artifact;
use animalia_common::{EtlError, PipelineConfig, Result};
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Send-errors artifact file name. Written only when at least one send
/// attempt failed.
pub const SEND_ERRORS_FILE: &str = "send_errors.json";

/// Classification of a per-record send failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendErrorKind {
    /// Non-2xx response from the target API
    HttpError,
    /// Request timed out
    Timeout,
    /// Could not connect to the target API
    ConnectionError,
    /// Anything else
    UnexpectedError,
}

/// One failed send attempt, with enough context for replay or triage
#[derive(Debug, Clone, Serialize)]
pub struct SendFailure {
    /// Zero-based position in the validated batch
    pub index: usize,

    /// The record that could not be delivered
    pub animal: Animal,

    /// Failure classification tag
    #[serde(rename = "error_type")]
    pub kind: SendErrorKind,

    /// HTTP status, for upstream errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Response body, for upstream errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Transport error description, for network failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-record outcomes of one send run
#[derive(Debug, Default)]
pub struct SendReport {
    /// Number of records attempted (one attempt per validated record)
    pub attempted: usize,

    /// Number of records accepted by the target API (200/201)
    pub sent: usize,

    /// Failed attempts, in input order
    pub failures: Vec<SendFailure>,
}

impl SendReport {
    /// Whether every attempted record was delivered
    pub fn all_sent(&self) -> bool {
        self.failures.is_empty()
    }
}

/// HTTP client for the target catalog API
pub struct TargetClient {
    client: Client,
    api_url: String,
    retry: RetryPolicy,
}

impl TargetClient {
    /// Create a client with the configured timeout and retry policy.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            retry: RetryPolicy::from_config(config),
        })
    }

    /// POST each record to the target API, one at a time, in order.
    ///
    /// Never fails: per-record outcomes are collected into the report.
    pub async fn send_animals(&self, animals: &[Animal]) -> SendReport {
        let mut report = SendReport {
            attempted: animals.len(),
            ..Default::default()
        };

        info!(target = %self.api_url, records = animals.len(), "sending records");

        for (index, animal) in animals.iter().enumerate() {
            match self.post_record(animal).await {
                Ok(()) => {
                    info!(
                        record = index + 1,
                        total = animals.len(),
                        name = %animal.nom,
                        "record delivered"
                    );
                    report.sent += 1;
                }
                Err(e) => {
                    error!(
                        record = index + 1,
                        total = animals.len(),
                        name = %animal.nom,
                        error = %e,
                        "record delivery failed"
                    );
                    report.failures.push(classify_failure(index, animal.clone(), e));
                }
            }
        }

        info!(
            sent = report.sent,
            failed = report.failures.len(),
            "send finished"
        );

        report
    }

    /// POST one record, retrying network failures per policy.
    async fn post_record(&self, animal: &Animal) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.try_post(animal).await {
                Err(e) if self.retry.should_retry(&e, attempt) => {
                    self.retry.backoff(attempt, &self.api_url).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_post(&self, animal: &Animal) -> Result<()> {
        let response = self.client.post(&self.api_url).json(animal).send().await?;
        let status = response.status().as_u16();

        if matches!(status, 200 | 201) {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(EtlError::upstream(status, body))
    }
}

/// Map a fatal per-record error onto the structured failure entry.
fn classify_failure(index: usize, animal: Animal, error: EtlError) -> SendFailure {
    let (kind, status_code, response, message) = match error {
        EtlError::Upstream { status, body } => {
            (SendErrorKind::HttpError, Some(status), Some(body), None)
        }
        EtlError::Network(e) if e.is_timeout() => {
            (SendErrorKind::Timeout, None, None, Some(e.to_string()))
        }
        EtlError::Network(e) if e.is_connect() => {
            (SendErrorKind::ConnectionError, None, None, Some(e.to_string()))
        }
        other => (SendErrorKind::UnexpectedError, None, None, Some(other.to_string())),
    };

    SendFailure {
        index,
        animal,
        kind,
        status_code,
        response,
        error: message,
    }
}

/// Write the send-errors artifact when the report carries failures.
///
/// A stale artifact from a previous run is removed on an all-sent run so
/// that its absence keeps meaning zero failures. Returns the artifact path
/// when one was written.
pub fn write_failure_artifact(report: &SendReport, output_dir: &Path) -> Result<Option<PathBuf>> {
    let path = output_dir.join(SEND_ERRORS_FILE);

    if report.failures.is_empty() {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        return Ok(None);
    }

    write_json_artifact(&path, &report.failures)?;
    warn!(path = %path.display(), count = report.failures.len(), "send errors written");
    Ok(Some(path))
}

/// Send a validated artifact file and persist the failure report.
///
/// A missing or malformed input file is fatal; individual send failures are
/// not.
pub async fn send_file(
    input: &Path,
    output_dir: &Path,
    client: &TargetClient,
) -> Result<SendReport> {
    let content = std::fs::read_to_string(input)?;
    let animals: Vec<Animal> = serde_json::from_str(&content)
        .map_err(|e| EtlError::malformed(input.display().to_string(), e))?;
    info!(path = %input.display(), records = animals.len(), "validated artifact loaded");

    let report = client.send_animals(&animals).await;
    write_failure_artifact(&report, output_dir)?;

    Ok(report)
}
