use std::sync::Arc;

use client_logging::{client_debug, client_warn};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use giftlist_core::BackoffSchedule;

use crate::{
    EventDispatcher, ItemMetadata, JobError, JobEvent, JobId, JobStatus, MetadataService,
};

/// Starts metadata-fetch jobs against a [`MetadataService`].
///
/// Owned by whichever collaborator needs it and constructed with explicit
/// configuration; independent instances are independent.
pub struct JobClient {
    service: Arc<dyn MetadataService>,
    schedule: BackoffSchedule,
    events: EventDispatcher,
}

impl JobClient {
    pub fn new(service: Arc<dyn MetadataService>, schedule: BackoffSchedule) -> Self {
        Self {
            service,
            schedule,
            events: EventDispatcher::new(),
        }
    }

    /// Subscription point for UI collaborators; handles emit through the
    /// same dispatcher.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Starts one job. Empty input fails locally; a transport failure on
    /// the start request fails without creating a handle.
    pub async fn start(&self, input: &str) -> Result<JobHandle, JobError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(JobError::InvalidInput);
        }

        let job_id = self.service.start_job(input).await.map_err(|err| {
            client_warn!("start request failed: {err}");
            JobError::StartFailed {
                message: err.to_string(),
            }
        })?;
        client_debug!("job {job_id} started");

        let (status_tx, _) = watch::channel(JobStatus::Pending);
        let handle = JobHandle {
            inner: Arc::new(HandleInner {
                job_id: job_id.clone(),
                service: self.service.clone(),
                schedule: self.schedule,
                events: self.events.clone(),
                cancel: CancellationToken::new(),
                status_tx,
                outcome: Mutex::new(None),
            }),
        };
        self.events.emit(JobEvent::StatusChanged {
            job_id,
            status: JobStatus::Pending,
        });
        Ok(handle)
    }
}

type JobOutcome = Result<ItemMetadata, JobError>;

/// Handle to one running job. Cloning shares the same job; all clones see
/// the same outcome.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    job_id: JobId,
    service: Arc<dyn MetadataService>,
    schedule: BackoffSchedule,
    events: EventDispatcher,
    cancel: CancellationToken,
    status_tx: watch::Sender<JobStatus>,
    // Serializes result() callers and caches the terminal outcome.
    outcome: Mutex<Option<JobOutcome>>,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.inner.job_id)
            .finish_non_exhaustive()
    }
}

impl JobHandle {
    pub fn id(&self) -> &JobId {
        &self.inner.job_id
    }

    /// Current status snapshot for read-only UI binding.
    pub fn status(&self) -> JobStatus {
        *self.inner.status_tx.borrow()
    }

    /// Watch-style subscription to status changes of this handle.
    pub fn status_updates(&self) -> watch::Receiver<JobStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Polls the job to a terminal state and returns its outcome.
    ///
    /// Single suspension point: the caller is suspended between status
    /// requests by the backoff schedule. Concurrent callers are serialized
    /// on an internal mutex, so only one poll loop ever runs; later (or
    /// concurrent) callers get the cached outcome of that loop.
    pub async fn result(&self) -> JobOutcome {
        let mut slot = self.inner.outcome.lock().await;
        if let Some(outcome) = slot.as_ref() {
            return outcome.clone();
        }
        let outcome = self.inner.poll_until_terminal().await;
        *slot = Some(outcome.clone());
        outcome
    }

    /// Cancels the job. The local handle becomes `Cancelled` immediately
    /// and any in-flight `result()` resolves with [`JobError::Cancelled`];
    /// the remote cancel request is best-effort. No-op once the job is in
    /// any terminal state.
    pub async fn cancel(&self) {
        let inner = &self.inner;
        let current = *inner.status_tx.borrow();
        if current.is_terminal() {
            return;
        }
        inner.cancel.cancel();
        inner.publish_status(JobStatus::Cancelled);
        match inner.service.cancel_job(&inner.job_id).await {
            Ok(acknowledged) => {
                client_debug!("job {} cancel acknowledged: {acknowledged}", inner.job_id);
            }
            Err(err) => {
                client_warn!("cancel request for job {} failed: {err}", inner.job_id);
            }
        }
    }
}

impl HandleInner {
    /// Moves the status forward and notifies subscribers. Transitions out
    /// of a terminal state are refused.
    fn publish_status(&self, next: JobStatus) {
        let changed = self
            .status_tx
            .send_if_modified(|status| {
                if *status == next || status.is_terminal() {
                    false
                } else {
                    *status = next;
                    true
                }
            });
        if changed {
            client_debug!("job {} is now {next}", self.job_id);
            self.events.emit(JobEvent::StatusChanged {
                job_id: self.job_id.clone(),
                status: next,
            });
        }
    }

    async fn poll_until_terminal(&self) -> JobOutcome {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }

            // An in-flight status request is allowed to complete; a cancel
            // arriving during it just discards the response.
            let report = tokio::select! {
                _ = self.cancel.cancelled() => return Err(JobError::Cancelled),
                report = self.service.get_job_status(&self.job_id) => report,
            };

            match report {
                Ok(report) => match report.status {
                    JobStatus::Completed => {
                        self.publish_status(JobStatus::Completed);
                        return Ok(report.result.unwrap_or_default());
                    }
                    JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled => {
                        self.publish_status(JobStatus::Failed);
                        return Err(JobError::RemoteJobFailed {
                            message: report
                                .error
                                .unwrap_or_else(|| format!("server reported {}", report.status)),
                        });
                    }
                    JobStatus::Processing => self.publish_status(JobStatus::Processing),
                    JobStatus::Pending => {}
                },
                // A flaky poll is not a job failure; it spends an attempt
                // and the next poll tries again.
                Err(err) => {
                    client_warn!("status request for job {} failed: {err}", self.job_id);
                }
            }

            let delay = self.schedule.delay(attempt);
            attempt += 1;
            if attempt >= self.schedule.max_attempts() {
                self.publish_status(JobStatus::TimedOut);
                return Err(JobError::Timeout { attempts: attempt });
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(JobError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
