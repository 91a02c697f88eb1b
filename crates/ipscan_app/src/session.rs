//! Drives one analysis run from the terminal: feeds operator input and
//! engine events through `update` and prints whatever changed.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use ipscan_core::{
    update, AppState, CredentialStatus, LifecycleConfig, Msg, QuickSort, RunError, RunPhase,
};
use ipscan_logging::{scan_debug, scan_info};
use thiserror::Error;

use crate::effects::EffectRunner;
use crate::render;

const EVENT_WAIT: Duration = Duration::from_millis(100);

/// Why a settled run did not produce results.
#[derive(Debug, Error, PartialEq)]
pub enum RunOutcomeError {
    #[error("not submitted: {0}")]
    Refused(RunError),
    #[error("not submitted: oversize batch declined")]
    Declined,
    #[error("{0}")]
    Failed(RunError),
    #[error("analysis stopped")]
    Stopped,
}

/// Anything but a completed run is an error.
pub fn check_outcome(state: &AppState) -> Result<(), RunOutcomeError> {
    match state.phase() {
        RunPhase::Completed => Ok(()),
        RunPhase::Failed(error) => Err(RunOutcomeError::Failed(error.clone())),
        RunPhase::Stopped => Err(RunOutcomeError::Stopped),
        RunPhase::Idle => Err(state
            .notice()
            .cloned()
            .map_or(RunOutcomeError::Declined, RunOutcomeError::Refused)),
        RunPhase::Submitting | RunPhase::Polling | RunPhase::FetchingResults => Ok(()),
    }
}

/// Everything the run needs besides the engine.
pub struct RunRequest {
    pub input: String,
    pub credential: String,
    pub sort: Option<String>,
    pub descending: bool,
    pub quick: Option<QuickSort>,
    /// Whether an Enter keypress on stdin should stop the run.
    pub stop_on_enter: bool,
    /// Upper bound on waiting for the credential check.
    pub check_timeout: Duration,
}

pub struct Session {
    state: AppState,
    runner: EffectRunner,
    stop_rx: Option<mpsc::Receiver<Msg>>,
    last_progress: Option<String>,
}

impl Session {
    pub fn new(config: LifecycleConfig, runner: EffectRunner) -> Self {
        Self {
            state: AppState::with_config(config),
            runner,
            stop_rx: None,
            last_progress: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Applies `msg` and everything it triggers synchronously.
    pub fn dispatch(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            inbox.extend(self.runner.run(effects));
        }
        if self.state.consume_dirty() {
            self.render();
        }
    }

    /// Runs the whole lifecycle and returns once it settles.
    pub fn run(&mut self, request: RunRequest) -> &AppState {
        self.dispatch(Msg::InputChanged(request.input));
        eprintln!("{}", render::batch_line(&self.state.view()));

        self.dispatch(Msg::CredentialLoaded(request.credential));
        let deadline = Instant::now() + request.check_timeout;
        while *self.state.credential_status() == CredentialStatus::Checking
            && Instant::now() < deadline
        {
            self.pump();
        }
        eprintln!("{}", render::credential_line(self.state.credential_status()));

        self.dispatch(Msg::SubmitClicked);
        if let Some(notice) = self.state.notice() {
            eprintln!("Not submitted: {notice}");
            return &self.state;
        }
        if !self.state.phase().is_active() {
            eprintln!("Not submitted.");
            return &self.state;
        }

        if request.stop_on_enter {
            eprintln!("Press Enter to stop.");
            self.stop_rx = Some(spawn_stop_watcher());
        }
        while self.state.phase().is_active() {
            self.pump();
        }
        eprintln!("{}", render::outcome_line(&self.state.view()));

        if *self.state.phase() == RunPhase::Completed {
            if let Some(quick) = request.quick {
                self.dispatch(Msg::QuickSortClicked(quick));
            }
            if let Some(field) = request.sort {
                self.dispatch(Msg::SortClicked(field.clone()));
                if request.descending {
                    self.dispatch(Msg::SortClicked(field));
                }
            }
        }
        &self.state
    }

    /// Waits briefly for one engine event or stop request and applies it.
    fn pump(&mut self) {
        if let Some(msg) = self.stop_rx.as_ref().and_then(|rx| rx.try_recv().ok()) {
            scan_info!("Stop requested from the terminal");
            self.dispatch(msg);
            return;
        }
        match self.runner.next_msg(EVENT_WAIT) {
            Some(msg) => self.dispatch(msg),
            None => self.dispatch(Msg::Tick),
        }
    }

    fn render(&mut self) {
        let view = self.state.view();
        let line = render::progress_line(&view);
        if let Some(text) = line.as_deref().filter(|_| line != self.last_progress) {
            eprintln!("{text}");
        }
        self.last_progress = line;
    }
}

fn spawn_stop_watcher() -> mpsc::Receiver<Msg> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        if matches!(io::stdin().lock().read_line(&mut line), Ok(n) if n > 0) {
            scan_debug!("Terminal input received during run");
            let _ = tx.send(Msg::StopClicked);
        }
    });
    rx
}

/// Reads addresses from `path`, or from stdin when no path is given.
pub fn read_input(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => io::read_to_string(io::stdin()),
    }
}
