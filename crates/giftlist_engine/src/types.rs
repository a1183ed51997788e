use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the metadata service at start time.
pub type JobId = String;

/// Lifecycle state of one metadata-fetch job.
///
/// `TimedOut` and `Cancelled` are decided locally; the service only ever
/// reports the first four. All of `Completed`, `Failed`, `TimedOut` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed-out",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Opaque key/value payload describing the fetched item (title, price,
/// image URL and whatever else the scraper found).
pub type ItemMetadata = serde_json::Map<String, serde_json::Value>;

/// One poll response from the metadata service.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<ItemMetadata>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Uniform bulk operation applied to a whole selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniformOperation {
    Delete,
    SetVisibility,
    SetLists,
}

impl UniformOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniformOperation::Delete => "delete",
            UniformOperation::SetVisibility => "set-visibility",
            UniformOperation::SetLists => "set-lists",
        }
    }
}

impl fmt::Display for UniformOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The service's own report for a uniform operation. Surfaced verbatim;
/// the client never re-derives partial results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationReport {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
