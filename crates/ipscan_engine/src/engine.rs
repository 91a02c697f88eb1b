use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use futures_util::StreamExt;
use ipscan_core::{Generation, JobHandle};
use ipscan_logging::{scan_debug, scan_info};
use tokio_util::sync::CancellationToken;

use crate::poller::poll_snapshots;
use crate::{AnalysisBackend, BackendError, BackendSettings, EngineEvent, ReqwestBackend};

enum EngineCommand {
    ValidateCredential {
        credential: String,
    },
    Submit {
        generation: Generation,
        addresses: Vec<String>,
        credential: String,
    },
    StartPolling {
        generation: Generation,
        job: JobHandle,
        interval: Duration,
    },
    CancelPolling {
        generation: Generation,
    },
    FetchResults {
        generation: Generation,
        job: JobHandle,
    },
}

/// The poller currently running, if any.
struct ActivePoller {
    generation: Generation,
    cancel: CancellationToken,
}

/// Runs backend calls on a dedicated tokio thread. Commands go in over a
/// channel, [`EngineEvent`]s come back over another; the caller stays
/// synchronous.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut poller: Option<ActivePoller> = None;
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&runtime, &backend, &mut poller, command, &event_tx);
            }
            if let Some(active) = poller.take() {
                active.cancel.cancel();
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn with_settings(settings: BackendSettings) -> Result<Self, BackendError> {
        let backend = ReqwestBackend::new(settings)?;
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn validate_credential(&self, credential: impl Into<String>) {
        self.send(EngineCommand::ValidateCredential {
            credential: credential.into(),
        });
    }

    pub fn submit(&self, generation: Generation, addresses: Vec<String>, credential: String) {
        self.send(EngineCommand::Submit {
            generation,
            addresses,
            credential,
        });
    }

    /// Starts polling `job`. A poller that is still running is cancelled first.
    pub fn start_polling(&self, generation: Generation, job: JobHandle, interval: Duration) {
        self.send(EngineCommand::StartPolling {
            generation,
            job,
            interval,
        });
    }

    pub fn cancel_polling(&self, generation: Generation) {
        self.send(EngineCommand::CancelPolling { generation });
    }

    pub fn fetch_results(&self, generation: Generation, job: JobHandle) {
        self.send(EngineCommand::FetchResults { generation, job });
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    backend: &Arc<dyn AnalysisBackend>,
    poller: &mut Option<ActivePoller>,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    let backend = Arc::clone(backend);
    let event_tx = event_tx.clone();
    match command {
        EngineCommand::ValidateCredential { credential } => {
            runtime.spawn(async move {
                let result = backend.validate_credential(&credential).await;
                let _ = event_tx.send(EngineEvent::CredentialChecked { credential, result });
            });
        }
        EngineCommand::Submit {
            generation,
            addresses,
            credential,
        } => {
            runtime.spawn(async move {
                let result = backend.submit_job(&addresses, &credential).await;
                let _ = event_tx.send(EngineEvent::JobSubmitted { generation, result });
            });
        }
        EngineCommand::StartPolling {
            generation,
            job,
            interval,
        } => {
            if let Some(previous) = poller.take() {
                scan_debug!("Replacing poller of {}", previous.generation);
                previous.cancel.cancel();
            }
            let cancel = CancellationToken::new();
            *poller = Some(ActivePoller {
                generation,
                cancel: cancel.clone(),
            });
            scan_info!("Polling job {} for {} every {:?}", job, generation, interval);
            runtime.spawn(async move {
                let mut snapshots = std::pin::pin!(poll_snapshots(backend, job, interval, cancel));
                while let Some(result) = snapshots.next().await {
                    if event_tx
                        .send(EngineEvent::Polled { generation, result })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        EngineCommand::CancelPolling { generation } => {
            if poller
                .as_ref()
                .is_some_and(|active| active.generation == generation)
            {
                if let Some(active) = poller.take() {
                    active.cancel.cancel();
                }
            } else {
                scan_debug!("No poller for {} to cancel", generation);
            }
        }
        EngineCommand::FetchResults { generation, job } => {
            runtime.spawn(async move {
                let result = backend.fetch_results(&job).await;
                let _ = event_tx.send(EngineEvent::ResultsLoaded { generation, result });
            });
        }
    }
}
