use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ipscan_core::{
    CredentialCheck, Generation, JobHandle, JobStatus, ProgressSnapshot, ResultRow,
};
use ipscan_engine::{AnalysisBackend, BackendError, EngineEvent, EngineHandle};

/// Completes every job on its third status check.
#[derive(Default)]
struct FakeBackend {
    polls: AtomicUsize,
}

#[async_trait::async_trait]
impl AnalysisBackend for FakeBackend {
    async fn validate_credential(&self, credential: &str) -> Result<CredentialCheck, BackendError> {
        Ok(CredentialCheck {
            valid: credential == "good",
            quota: None,
            error: None,
        })
    }

    async fn submit_job(&self, addresses: &[String], _: &str) -> Result<JobHandle, BackendError> {
        Ok(JobHandle::new(format!("job-{}", addresses.len())))
    }

    async fn poll_job(&self, _: &JobHandle) -> Result<ProgressSnapshot, BackendError> {
        let count = self.polls.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        if count >= 3 {
            Ok(ProgressSnapshot::completed(3))
        } else {
            Ok(ProgressSnapshot::running(count, 3))
        }
    }

    async fn fetch_results(&self, job: &JobHandle) -> Result<Vec<ResultRow>, BackendError> {
        Ok(vec![ResultRow::default()
            .with("ip", "1.1.1.1")
            .with("job", job.as_str())])
    }
}

fn next_event(engine: &EngineHandle) -> EngineEvent {
    engine
        .recv_timeout(Duration::from_secs(5))
        .expect("engine event")
}

#[test]
fn runs_a_job_end_to_end() {
    let engine = EngineHandle::new(Arc::new(FakeBackend::default()));
    let generation = Generation(1);

    engine.validate_credential("good");
    assert!(matches!(
        next_event(&engine),
        EngineEvent::CredentialChecked { credential, result: Ok(check) }
            if credential == "good" && check.valid
    ));

    engine.submit(generation, vec!["1.1.1.1".into(), "::1".into()], "good".into());
    let job = match next_event(&engine) {
        EngineEvent::JobSubmitted {
            generation: tagged,
            result: Ok(job),
        } => {
            assert_eq!(tagged, generation);
            job
        }
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(job, JobHandle::new("job-2"));

    engine.start_polling(generation, job.clone(), Duration::from_millis(10));
    let mut statuses = Vec::new();
    while statuses.last() != Some(&JobStatus::Completed) {
        match next_event(&engine) {
            EngineEvent::Polled {
                generation: tagged,
                result: Ok(snapshot),
            } => {
                assert_eq!(tagged, generation);
                statuses.push(snapshot.status);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(
        statuses,
        vec![JobStatus::Running, JobStatus::Running, JobStatus::Completed]
    );

    engine.fetch_results(generation, job);
    match next_event(&engine) {
        EngineEvent::ResultsLoaded {
            generation: tagged,
            result: Ok(rows),
        } => {
            assert_eq!(tagged, generation);
            assert_eq!(rows[0].address(), "1.1.1.1");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

/// Never finishes, so only cancellation ends its poller.
struct EndlessBackend;

#[async_trait::async_trait]
impl AnalysisBackend for EndlessBackend {
    async fn validate_credential(&self, _: &str) -> Result<CredentialCheck, BackendError> {
        unreachable!()
    }

    async fn submit_job(&self, _: &[String], _: &str) -> Result<JobHandle, BackendError> {
        unreachable!()
    }

    async fn poll_job(&self, _: &JobHandle) -> Result<ProgressSnapshot, BackendError> {
        Ok(ProgressSnapshot::running(0, 1))
    }

    async fn fetch_results(&self, _: &JobHandle) -> Result<Vec<ResultRow>, BackendError> {
        unreachable!()
    }
}

fn drain_for(engine: &EngineHandle, window: Duration) -> Vec<Generation> {
    let deadline = Instant::now() + window;
    let mut seen = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match engine.recv_timeout(remaining) {
            Some(EngineEvent::Polled { generation, .. }) => seen.push(generation),
            Some(other) => panic!("unexpected event {other:?}"),
            None => break,
        }
    }
    seen
}

#[test]
fn starting_a_poller_replaces_the_previous_one() {
    let engine = EngineHandle::new(Arc::new(EndlessBackend));
    let interval = Duration::from_millis(20);

    engine.start_polling(Generation(1), JobHandle::new("a"), interval);
    assert!(matches!(
        next_event(&engine),
        EngineEvent::Polled {
            generation: Generation(1),
            ..
        }
    ));

    engine.start_polling(Generation(2), JobHandle::new("b"), interval);
    // Let anything the first poller already sent arrive, then only the
    // second poller may be heard from.
    drain_for(&engine, Duration::from_millis(100));
    let later = drain_for(&engine, Duration::from_millis(200));
    assert!(!later.is_empty());
    assert!(later.iter().all(|generation| *generation == Generation(2)));
}

#[test]
fn cancelled_poller_goes_quiet() {
    let engine = EngineHandle::new(Arc::new(EndlessBackend));
    engine.start_polling(Generation(3), JobHandle::new("a"), Duration::from_millis(20));
    next_event(&engine);

    // Cancelling some other generation leaves the poller running.
    engine.cancel_polling(Generation(2));
    assert!(!drain_for(&engine, Duration::from_millis(100)).is_empty());

    engine.cancel_polling(Generation(3));
    drain_for(&engine, Duration::from_millis(50));
    assert!(drain_for(&engine, Duration::from_millis(200)).is_empty());
}
