use std::fmt;

use ipscan_core::{CredentialCheck, Generation, JobHandle, ProgressSnapshot, ResultRow};

/// Everything the engine reports back, tagged with the run it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CredentialChecked {
        credential: String,
        result: Result<CredentialCheck, BackendError>,
    },
    JobSubmitted {
        generation: Generation,
        result: Result<JobHandle, BackendError>,
    },
    Polled {
        generation: Generation,
        result: Result<ProgressSnapshot, BackendError>,
    },
    ResultsLoaded {
        generation: Generation,
        result: Result<Vec<ResultRow>, BackendError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendFailure,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: BackendFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            // Server-supplied reasons are shown as-is.
            BackendFailure::Rejected => f.write_str(&self.message),
            _ => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    InvalidBaseUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    /// Non-success response carrying an `{"error": ...}` body.
    Rejected,
    Decode,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailure::InvalidBaseUrl => write!(f, "invalid base url"),
            BackendFailure::Network => write!(f, "network error"),
            BackendFailure::Timeout => write!(f, "timeout"),
            BackendFailure::HttpStatus(code) => write!(f, "http status {code}"),
            BackendFailure::Rejected => write!(f, "rejected"),
            BackendFailure::Decode => write!(f, "malformed response"),
        }
    }
}
