use std::fmt;

/// Failure of one metadata-fetch job, as seen by the caller.
///
/// All variants are recoverable; the caller decides whether to retry,
/// show a message, or abandon the job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// Raised locally before any network call.
    #[error("job input is empty")]
    InvalidInput,
    /// The start request did not yield a job id; no handle exists.
    #[error("failed to start job: {message}")]
    StartFailed { message: String },
    /// The service reported the job as failed.
    #[error("remote job failed: {message}")]
    RemoteJobFailed { message: String },
    /// Local attempt-count ceiling reached; independent of server state.
    #[error("job did not finish within {attempts} poll attempts")]
    Timeout { attempts: u32 },
    #[error("job was cancelled")]
    Cancelled,
}

/// Failure of a bulk reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Nothing differs from the baseline; no request was made.
    #[error("no fields differ from the baseline")]
    NoChanges,
    /// The selection is empty; no request was made.
    #[error("no items are selected")]
    EmptySelection,
    /// The mutation request failed. Pending edits are kept so the caller
    /// can retry without re-entering values.
    #[error("bulk mutation failed: {message}")]
    RemoteMutationFailed { message: String },
}

/// Transport-level failure from a remote service implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub(crate) fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Network,
    Timeout,
    HttpStatus(u16),
    /// The response could not be decoded as the expected JSON shape.
    Protocol,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::Network => write!(f, "network error"),
            ServiceErrorKind::Timeout => write!(f, "request timeout"),
            ServiceErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            ServiceErrorKind::Protocol => write!(f, "protocol error"),
        }
    }
}
