use ipscan_logging::{scan_debug, scan_info, scan_warn};

use crate::{
    AppState, CredentialStatus, Effect, Generation, JobStatus, Msg, RunError, RunPhase,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::CredentialChanged(raw) => {
            let credential = raw.trim().to_owned();
            let persist = credential != state.credential();
            apply_credential(&mut state, credential, persist)
        }
        Msg::CredentialLoaded(raw) => apply_credential(&mut state, raw.trim().to_owned(), false),
        Msg::CredentialChecked { credential, result } => {
            if credential != state.credential() {
                scan_debug!("Ignoring credential check for a superseded key");
                return (state, Vec::new());
            }
            let status = match result {
                Ok(check) if check.valid => CredentialStatus::Valid { quota: check.quota },
                Ok(check) => CredentialStatus::Invalid(
                    check.error.unwrap_or_else(|| "invalid API key".to_string()),
                ),
                Err(message) => CredentialStatus::Invalid(message),
            };
            state.set_credential_status(status);
            Vec::new()
        }
        Msg::SubmitClicked => {
            if !state.credential_status().is_valid() {
                state.set_notice(RunError::InvalidCredential);
                return (state, Vec::new());
            }
            if state.batch().is_empty() {
                state.set_notice(RunError::EmptyBatch);
                return (state, Vec::new());
            }
            if state.advisory().needs_confirmation() {
                let count = state.batch().len();
                let limit = state.config().limits.hard;
                state.set_pending_confirmation(Some(count));
                return (state, vec![Effect::ConfirmOversize { count, limit }]);
            }
            begin_submission(&mut state)
        }
        Msg::OversizeConfirmed => {
            if state.take_pending_confirmation().is_none() {
                return (state, Vec::new());
            }
            if !state.credential_status().is_valid() {
                state.set_notice(RunError::InvalidCredential);
                return (state, Vec::new());
            }
            begin_submission(&mut state)
        }
        Msg::OversizeDeclined => {
            state.take_pending_confirmation();
            Vec::new()
        }
        Msg::StopClicked => {
            if !state.phase().is_active() {
                return (state, Vec::new());
            }
            let generation = state.generation();
            scan_info!("Stopping run {}", generation);
            state.stop();
            vec![Effect::CancelPolling { generation }]
        }
        Msg::JobSubmitted { generation, result } => {
            if is_stale(&state, generation, &RunPhase::Submitting) {
                return (state, Vec::new());
            }
            match result {
                Ok(job) => {
                    scan_info!("Run {} submitted as job {}", generation, job);
                    state.start_polling(job.clone());
                    vec![Effect::StartPolling {
                        generation,
                        job,
                        interval: state.config().poll_interval,
                    }]
                }
                Err(message) => {
                    scan_warn!("Run {} submission failed: {}", generation, message);
                    state.fail(RunError::Submission(message));
                    Vec::new()
                }
            }
        }
        Msg::PollResponse { generation, result } => {
            if is_stale(&state, generation, &RunPhase::Polling) {
                return (state, Vec::new());
            }
            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(message) => {
                    // Transient; the next scheduled poll proceeds.
                    scan_warn!("Status check for run {} failed: {}", generation, message);
                    return (state, Vec::new());
                }
            };
            match snapshot.status {
                JobStatus::Running => {
                    state.apply_snapshot(snapshot);
                    Vec::new()
                }
                JobStatus::Completed => {
                    let Some(job) = state.job().cloned() else {
                        return (state, Vec::new());
                    };
                    scan_info!("Run {} completed remotely, loading results", generation);
                    state.apply_snapshot(snapshot);
                    state.start_fetching();
                    vec![
                        Effect::CancelPolling { generation },
                        Effect::FetchResults { generation, job },
                    ]
                }
                JobStatus::Error => {
                    let message = snapshot
                        .error
                        .unwrap_or_else(|| "unknown error".to_string());
                    scan_warn!("Run {} reported an error: {}", generation, message);
                    state.fail(RunError::Job(message));
                    vec![Effect::CancelPolling { generation }]
                }
            }
        }
        Msg::ResultsLoaded { generation, result } => {
            if is_stale(&state, generation, &RunPhase::FetchingResults) {
                return (state, Vec::new());
            }
            match result {
                Ok(rows) => {
                    scan_info!("Run {} loaded {} result rows", generation, rows.len());
                    state.complete(rows);
                }
                Err(message) => {
                    scan_warn!("Run {} result download failed: {}", generation, message);
                    state.fail(RunError::ResultFetch(message));
                }
            }
            Vec::new()
        }
        Msg::SortClicked(field) => {
            let (sort, rows) = state.sort_mut();
            if rows.is_empty() {
                return (state, Vec::new());
            }
            sort.sort_by(&field, rows);
            state.mark_dirty();
            Vec::new()
        }
        Msg::QuickSortClicked(quick) => {
            let (sort, rows) = state.sort_mut();
            if rows.is_empty() {
                return (state, Vec::new());
            }
            sort.quick_sort(quick, rows);
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Opens a new generation and emits the submit call. Any poller of the run
/// being replaced is cancelled first so two pollers never overlap.
/// Adopts `credential`, writing it back only when `persist` is set.
fn apply_credential(state: &mut AppState, credential: String, persist: bool) -> Vec<Effect> {
    let mut effects = Vec::new();
    if persist {
        effects.push(Effect::PersistCredential {
            credential: credential.clone(),
        });
    }
    if credential.is_empty() {
        state.set_credential(
            credential,
            CredentialStatus::Invalid("no API key configured".to_string()),
        );
    } else {
        state.set_credential(credential.clone(), CredentialStatus::Checking);
        effects.push(Effect::ValidateCredential { credential });
    }
    effects
}

fn begin_submission(state: &mut AppState) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    if state.phase().is_active() {
        effects.push(Effect::CancelPolling {
            generation: state.generation(),
        });
    }
    let generation = state.begin_run();
    let addresses = state.batch().addresses.clone();
    scan_info!(
        "Submitting run {} with {} addresses",
        generation,
        addresses.len()
    );
    effects.push(Effect::SubmitJob {
        generation,
        addresses,
        credential: state.credential().to_owned(),
    });
    effects
}

fn is_stale(state: &AppState, generation: Generation, expected: &RunPhase) -> bool {
    if generation != state.generation() || state.phase() != expected {
        scan_debug!(
            "Discarding response for {} (current {}, phase {})",
            generation,
            state.generation(),
            state.phase().label()
        );
        return true;
    }
    false
}
