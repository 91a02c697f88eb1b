//! Run lifecycle types: phases, job handles, progress snapshots and the
//! remaining-time heuristic.

use std::fmt;
use std::time::Duration;

use crate::batch::BatchLimits;
use crate::error::RunError;

/// Tags one analysis run. Responses carrying an older generation are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Server-side identifier of a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        JobHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Latest status report for a job. Each poll replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    pub completed: u64,
    pub total: u64,
    pub current_address: Option<String>,
    pub error: Option<String>,
}

impl ProgressSnapshot {
    pub fn running(completed: u64, total: u64) -> Self {
        Self {
            status: JobStatus::Running,
            completed,
            total,
            current_address: None,
            error: None,
        }
    }

    pub fn completed(total: u64) -> Self {
        Self {
            status: JobStatus::Completed,
            completed: total,
            total,
            current_address: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            completed: 0,
            total: 0,
            current_address: None,
            error: Some(message.into()),
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    FetchingResults,
    Completed,
    Failed(RunError),
    Stopped,
}

impl RunPhase {
    /// Phases with a remote job (or submission) outstanding.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunPhase::Submitting | RunPhase::Polling | RunPhase::FetchingResults
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Failed(_) | RunPhase::Stopped
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Submitting => "submitting",
            RunPhase::Polling => "polling",
            RunPhase::FetchingResults => "fetching results",
            RunPhase::Completed => "completed",
            RunPhase::Failed(_) => "failed",
            RunPhase::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub remaining: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CredentialStatus {
    #[default]
    Unchecked,
    Checking,
    Valid { quota: Option<Quota> },
    Invalid(String),
}

impl CredentialStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CredentialStatus::Valid { .. })
    }
}

/// Outcome of a credential check as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialCheck {
    pub valid: bool,
    pub quota: Option<Quota>,
    pub error: Option<String>,
}

/// Tunables for one session. These are display and cadence defaults, not
/// protocol contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub poll_interval: Duration,
    /// Average analysis time per address, used for the remaining-time estimate.
    pub unit_cost: Duration,
    pub limits: BatchLimits,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            unit_cost: Duration::from_millis(1200),
            limits: BatchLimits::default(),
        }
    }
}

/// Remaining-time estimate; `None` means indeterminate (nothing done yet,
/// or nothing left).
pub fn estimate_remaining(completed: u64, total: u64, unit_cost: Duration) -> Option<Duration> {
    if completed == 0 || completed >= total {
        return None;
    }
    let remaining = u32::try_from(total - completed).ok()?;
    unit_cost.checked_mul(remaining)
}

pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
