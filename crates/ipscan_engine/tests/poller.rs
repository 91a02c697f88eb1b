use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use ipscan_core::{CredentialCheck, JobHandle, JobStatus, ProgressSnapshot, ResultRow};
use ipscan_engine::{poll_snapshots, AnalysisBackend, BackendError, BackendFailure, PollOutcome};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Replays scripted poll outcomes; once the script runs out it keeps
/// reporting a running job.
struct ScriptedBackend {
    script: Mutex<VecDeque<PollOutcome>>,
    latency: Duration,
    started: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    fn new(script: Vec<PollOutcome>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            latency,
            started: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn offsets_from(&self, origin: Instant) -> Vec<Duration> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(origin))
            .collect()
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn validate_credential(&self, _: &str) -> Result<CredentialCheck, BackendError> {
        unreachable!("not used by the poller")
    }

    async fn submit_job(&self, _: &[String], _: &str) -> Result<JobHandle, BackendError> {
        unreachable!("not used by the poller")
    }

    async fn poll_job(&self, _: &JobHandle) -> Result<ProgressSnapshot, BackendError> {
        self.started.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ProgressSnapshot::running(0, 1)))
    }

    async fn fetch_results(&self, _: &JobHandle) -> Result<Vec<ResultRow>, BackendError> {
        unreachable!("not used by the poller")
    }
}

/// Paused time can land a timer up to a millisecond late.
fn assert_offsets(actual: Vec<Duration>, expected_secs: &[u64]) {
    assert_eq!(actual.len(), expected_secs.len(), "{actual:?}");
    for (offset, secs) in actual.iter().zip(expected_secs) {
        let expected = Duration::from_secs(*secs);
        assert!(
            *offset >= expected && *offset <= expected + Duration::from_millis(5),
            "{actual:?}"
        );
    }
}

fn transport_error() -> BackendError {
    BackendError {
        kind: BackendFailure::Network,
        message: "connection reset".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn first_poll_is_immediate_then_every_interval() {
    let backend = ScriptedBackend::new(
        vec![
            Ok(ProgressSnapshot::running(1, 3)),
            Ok(ProgressSnapshot::running(2, 3)),
            Ok(ProgressSnapshot::completed(3)),
        ],
        Duration::ZERO,
    );
    let origin = Instant::now();
    let outcomes: Vec<PollOutcome> = poll_snapshots(
        backend.clone(),
        JobHandle::new("job"),
        Duration::from_secs(2),
        CancellationToken::new(),
    )
    .collect()
    .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[2].as_ref().unwrap().status, JobStatus::Completed);
    assert_offsets(backend.offsets_from(origin), &[0, 2, 4]);
}

#[tokio::test(start_paused = true)]
async fn error_status_ends_the_stream() {
    let backend = ScriptedBackend::new(
        vec![Ok(ProgressSnapshot::failed("quota exhausted"))],
        Duration::ZERO,
    );
    let outcomes: Vec<PollOutcome> = poll_snapshots(
        backend,
        JobHandle::new("job"),
        Duration::from_secs(2),
        CancellationToken::new(),
    )
    .collect()
    .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].as_ref().unwrap().status, JobStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_do_not_stop_polling() {
    let backend = ScriptedBackend::new(
        vec![
            Err(transport_error()),
            Err(transport_error()),
            Ok(ProgressSnapshot::completed(5)),
        ],
        Duration::ZERO,
    );
    let outcomes: Vec<PollOutcome> = poll_snapshots(
        backend,
        JobHandle::new("job"),
        Duration::from_secs(2),
        CancellationToken::new(),
    )
    .collect()
    .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_err());
    assert!(outcomes[1].is_err());
    assert!(outcomes[2].is_ok());
}

#[tokio::test(start_paused = true)]
async fn slow_responses_delay_the_schedule_without_overlap() {
    let backend = ScriptedBackend::new(
        vec![
            Ok(ProgressSnapshot::running(1, 3)),
            Ok(ProgressSnapshot::running(2, 3)),
            Ok(ProgressSnapshot::completed(3)),
        ],
        Duration::from_secs(3),
    );
    let origin = Instant::now();
    let outcomes: Vec<PollOutcome> = poll_snapshots(
        backend.clone(),
        JobHandle::new("job"),
        Duration::from_secs(2),
        CancellationToken::new(),
    )
    .collect()
    .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    assert_offsets(backend.offsets_from(origin), &[0, 3, 6]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_between_polls_ends_the_stream() {
    let backend = ScriptedBackend::new(Vec::new(), Duration::ZERO);
    let cancel = CancellationToken::new();
    let mut stream = Box::pin(poll_snapshots(
        backend.clone(),
        JobHandle::new("job"),
        Duration::from_secs(2),
        cancel.clone(),
    ));

    assert!(stream.next().await.is_some());
    cancel.cancel();
    assert!(stream.next().await.is_none());
    assert_eq!(backend.started.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_an_in_flight_request() {
    let backend = ScriptedBackend::new(Vec::new(), Duration::from_secs(30));
    let cancel = CancellationToken::new();
    let stream = poll_snapshots(
        backend,
        JobHandle::new("job"),
        Duration::from_secs(2),
        cancel.clone(),
    );

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let origin = Instant::now();
    let outcomes: Vec<PollOutcome> = stream.collect().await;
    assert!(outcomes.is_empty());
    assert!(origin.elapsed() < Duration::from_secs(30));
}
