use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex, Once};
use std::time::Duration;

use giftlist_core::BackoffSchedule;
use giftlist_engine::{
    ChannelEventSink, JobClient, JobError, JobEvent, JobStatus, MetadataService, ServiceError,
    ServiceErrorKind, StatusReport,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

fn fast_schedule(max_attempts: u32) -> BackoffSchedule {
    BackoffSchedule {
        base: Duration::from_millis(1),
        step: Duration::ZERO,
        cap: Duration::from_millis(1),
        max_attempts,
    }
}

fn processing() -> StatusReport {
    StatusReport {
        status: JobStatus::Processing,
        result: None,
        error: None,
    }
}

fn completed() -> StatusReport {
    let result = serde_json::json!({ "title": "Wool socks", "price": "9.99" });
    StatusReport {
        status: JobStatus::Completed,
        result: result.as_object().cloned(),
        error: None,
    }
}

/// Metadata service that replays a fixed status script; the last report
/// repeats once the script is exhausted.
struct ScriptedMetadata {
    script: Mutex<Vec<StatusReport>>,
    fail_start: bool,
    start_calls: AtomicU32,
    status_calls: AtomicU32,
    cancel_calls: AtomicU32,
}

impl ScriptedMetadata {
    fn new(script: Vec<StatusReport>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            fail_start: false,
            start_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            cancel_calls: AtomicU32::new(0),
        })
    }

    fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Vec::new()),
            fail_start: true,
            start_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            cancel_calls: AtomicU32::new(0),
        })
    }
}

#[async_trait::async_trait]
impl MetadataService for ScriptedMetadata {
    async fn start_job(&self, _input: &str) -> Result<String, ServiceError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ServiceError {
                kind: ServiceErrorKind::Network,
                message: "connection refused".to_string(),
            });
        }
        Ok("job-1".to_string())
    }

    async fn get_job_status(&self, _job_id: &String) -> Result<StatusReport, ServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            Ok(script.remove(0))
        } else {
            Ok(script[0].clone())
        }
    }

    async fn cancel_job(&self, _job_id: &String) -> Result<bool, ServiceError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[tokio::test]
async fn empty_input_fails_without_a_network_call() {
    init_logging();
    let service = ScriptedMetadata::new(vec![completed()]);
    let client = JobClient::new(service.clone(), fast_schedule(3));

    let err = client.start("   ").await.unwrap_err();

    assert_eq!(err, JobError::InvalidInput);
    assert_eq!(service.start_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn start_transport_failure_yields_no_handle() {
    let service = ScriptedMetadata::failing_start();
    let client = JobClient::new(service.clone(), fast_schedule(3));

    let err = client.start("https://shop.example/socks").await.unwrap_err();

    assert!(matches!(err, JobError::StartFailed { .. }));
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn job_completing_at_the_last_allowed_attempt_resolves() {
    let service = ScriptedMetadata::new(vec![processing(), processing(), completed()]);
    let client = JobClient::new(service.clone(), fast_schedule(3));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    let metadata = handle.result().await.unwrap();

    assert_eq!(metadata["title"], "Wool socks");
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 3);
    assert_eq!(handle.status(), JobStatus::Completed);
}

#[tokio::test]
async fn job_stuck_in_processing_times_out_locally() {
    let service = ScriptedMetadata::new(vec![processing()]);
    let client = JobClient::new(service.clone(), fast_schedule(3));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    let err = handle.result().await.unwrap_err();

    assert_eq!(err, JobError::Timeout { attempts: 3 });
    // No request is issued past the attempt ceiling.
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 3);
    assert_eq!(handle.status(), JobStatus::TimedOut);
}

#[tokio::test]
async fn server_reported_failure_carries_the_message() {
    let service = ScriptedMetadata::new(vec![StatusReport {
        status: JobStatus::Failed,
        result: None,
        error: Some("page returned 404".to_string()),
    }]);
    let client = JobClient::new(service, fast_schedule(3));

    let handle = client.start("https://shop.example/gone").await.unwrap();
    let err = handle.result().await.unwrap_err();

    assert_eq!(
        err,
        JobError::RemoteJobFailed {
            message: "page returned 404".to_string()
        }
    );
}

#[tokio::test]
async fn cancel_resolves_an_in_flight_result_call() {
    let service = ScriptedMetadata::new(vec![processing()]);
    // Long sleeps so the cancel lands during a backoff suspension.
    let schedule = BackoffSchedule {
        base: Duration::from_secs(30),
        step: Duration::ZERO,
        cap: Duration::from_secs(30),
        max_attempts: 100,
    };
    let client = JobClient::new(service.clone(), schedule);

    let handle = client.start("https://shop.example/socks").await.unwrap();
    let pending = tokio::spawn({
        let handle = handle.clone();
        async move { handle.result().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.cancel().await;

    let outcome = pending.await.unwrap();
    assert_eq!(outcome.unwrap_err(), JobError::Cancelled);
    assert_eq!(handle.status(), JobStatus::Cancelled);
    assert_eq!(service.cancel_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let service = ScriptedMetadata::new(vec![processing()]);
    let client = JobClient::new(service.clone(), fast_schedule(10));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    handle.cancel().await;
    handle.cancel().await;

    assert_eq!(service.cancel_calls.load(Ordering::SeqCst), 1);
    assert_eq!(handle.result().await.unwrap_err(), JobError::Cancelled);
}

#[tokio::test]
async fn concurrent_result_calls_share_one_poll_loop() {
    let service = ScriptedMetadata::new(vec![processing(), completed()]);
    let client = JobClient::new(service.clone(), fast_schedule(5));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.result().await }
    });
    let second = tokio::spawn({
        let handle = handle.clone();
        async move { handle.result().await }
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first, second);
    // One loop served both callers: two scripted reports, two requests.
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn result_after_completion_returns_the_cached_outcome() {
    let service = ScriptedMetadata::new(vec![completed()]);
    let client = JobClient::new(service.clone(), fast_schedule(3));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    let first = handle.result().await.unwrap();
    let second = handle.result().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn subscribers_see_the_status_transitions() {
    let service = ScriptedMetadata::new(vec![processing(), completed()]);
    let client = JobClient::new(service, fast_schedule(5));

    let (tx, rx) = mpsc::channel();
    client.events().subscribe(Arc::new(ChannelEventSink::new(tx)));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    handle.result().await.unwrap();

    let statuses: Vec<JobStatus> = rx
        .try_iter()
        .map(|event| match event {
            JobEvent::StatusChanged { status, .. } => status,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
    );
}

#[tokio::test]
async fn unsubscribed_sinks_stop_receiving() {
    let service = ScriptedMetadata::new(vec![completed()]);
    let client = JobClient::new(service, fast_schedule(3));

    let (tx, rx) = mpsc::channel();
    let subscription = client.events().subscribe(Arc::new(ChannelEventSink::new(tx)));
    assert!(client.events().unsubscribe(subscription));
    assert!(!client.events().unsubscribe(subscription));

    let handle = client.start("https://shop.example/socks").await.unwrap();
    handle.result().await.unwrap();

    assert_eq!(rx.try_iter().count(), 0);
}
