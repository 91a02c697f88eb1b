use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use ipscan_core::{Effect, Msg};
use ipscan_engine::{EngineEvent, EngineHandle};
use ipscan_logging::{scan_error, scan_info, scan_warn};

use crate::persistence;

/// How an oversized batch is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OversizePolicy {
    Accept,
    Decline,
    /// Ask on the terminal.
    Ask,
}

/// Executes core effects against the engine and local storage.
pub struct EffectRunner {
    engine: EngineHandle,
    state_dir: PathBuf,
    oversize: OversizePolicy,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, state_dir: PathBuf, oversize: OversizePolicy) -> Self {
        Self {
            engine,
            state_dir,
            oversize,
        }
    }

    /// Runs `effects` in order. Effects answered on the spot (the oversize
    /// prompt) come back as messages for the caller to dispatch.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut replies = Vec::new();
        for effect in effects {
            match effect {
                Effect::ValidateCredential { credential } => {
                    self.engine.validate_credential(credential);
                }
                Effect::PersistCredential { credential } => {
                    if let Err(err) = persistence::save_credential(&self.state_dir, &credential) {
                        scan_error!("Failed to persist credential: {}", err);
                    }
                }
                Effect::ConfirmOversize { count, limit } => {
                    let accepted = match self.oversize {
                        OversizePolicy::Accept => true,
                        OversizePolicy::Decline => false,
                        OversizePolicy::Ask => ask_oversize(count, limit),
                    };
                    scan_info!(
                        "Oversize batch of {} (limit {}) {}",
                        count,
                        limit,
                        if accepted { "accepted" } else { "declined" }
                    );
                    replies.push(if accepted {
                        Msg::OversizeConfirmed
                    } else {
                        Msg::OversizeDeclined
                    });
                }
                Effect::SubmitJob {
                    generation,
                    addresses,
                    credential,
                } => self.engine.submit(generation, addresses, credential),
                Effect::StartPolling {
                    generation,
                    job,
                    interval,
                } => self.engine.start_polling(generation, job, interval),
                Effect::CancelPolling { generation } => self.engine.cancel_polling(generation),
                Effect::FetchResults { generation, job } => {
                    self.engine.fetch_results(generation, job)
                }
            }
        }
        replies
    }

    /// Next engine event as a core message, waiting up to `timeout`.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::CredentialChecked { credential, result } => Msg::CredentialChecked {
            credential,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::JobSubmitted { generation, result } => Msg::JobSubmitted {
            generation,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::Polled { generation, result } => Msg::PollResponse {
            generation,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::ResultsLoaded { generation, result } => Msg::ResultsLoaded {
            generation,
            result: result.map_err(|err| err.to_string()),
        },
    }
}

fn ask_oversize(count: usize, limit: usize) -> bool {
    eprint!("Batch has {count} addresses, above the limit of {limit}. Send anyway? [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(err) => {
            scan_warn!("Could not read confirmation: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipscan_core::{Generation, ProgressSnapshot};
    use ipscan_engine::{BackendError, BackendFailure};

    #[test]
    fn engine_failures_become_message_text() {
        let msg = map_event(EngineEvent::JobSubmitted {
            generation: Generation(4),
            result: Err(BackendError {
                kind: BackendFailure::Rejected,
                message: "no valid IP addresses".to_string(),
            }),
        });
        assert_eq!(
            msg,
            Msg::JobSubmitted {
                generation: Generation(4),
                result: Err("no valid IP addresses".to_string()),
            }
        );
    }

    #[test]
    fn poll_events_keep_their_generation() {
        let snapshot = ProgressSnapshot::running(1, 2);
        let msg = map_event(EngineEvent::Polled {
            generation: Generation(2),
            result: Ok(snapshot.clone()),
        });
        assert_eq!(
            msg,
            Msg::PollResponse {
                generation: Generation(2),
                result: Ok(snapshot),
            }
        );
    }
}
