use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use ipscan_core::{JobHandle, ProgressSnapshot};
use ipscan_logging::scan_debug;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{AnalysisBackend, BackendError};

pub type PollOutcome = Result<ProgressSnapshot, BackendError>;

struct PollState<B: ?Sized> {
    backend: Arc<B>,
    job: JobHandle,
    period: Duration,
    ticker: Option<Interval>,
    cancel: CancellationToken,
    finished: bool,
}

/// Polls `job` until it reaches a terminal status or `cancel` fires.
///
/// The first request goes out immediately, later ones every `period`. A slow
/// response pushes the schedule back instead of queueing a burst, so at most
/// one request is ever in flight. Transport failures are yielded and polling
/// continues.
pub fn poll_snapshots<B>(
    backend: Arc<B>,
    job: JobHandle,
    period: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = PollOutcome> + Send
where
    B: AnalysisBackend + ?Sized + 'static,
{
    let state = PollState {
        backend,
        job,
        period,
        ticker: None,
        cancel,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        let period = state.period;
        let ticker = state.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        tokio::select! {
            biased;
            _ = state.cancel.cancelled() => {
                scan_debug!("Polling for job {} cancelled", state.job);
                return None;
            }
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = state.cancel.cancelled() => {
                scan_debug!("Polling for job {} cancelled mid-request", state.job);
                return None;
            }
            outcome = state.backend.poll_job(&state.job) => outcome,
        };
        if matches!(&outcome, Ok(snapshot) if snapshot.status.is_terminal()) {
            state.finished = true;
        }
        Some((outcome, state))
    })
}
