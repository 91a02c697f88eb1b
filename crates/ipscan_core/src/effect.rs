use std::time::Duration;

use crate::{Generation, JobHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ValidateCredential {
        credential: String,
    },
    /// Store the credential string for the next session; empty clears it.
    PersistCredential {
        credential: String,
    },
    /// Ask the operator whether an oversized batch should still be sent.
    ConfirmOversize {
        count: usize,
        limit: usize,
    },
    SubmitJob {
        generation: Generation,
        addresses: Vec<String>,
        credential: String,
    },
    /// Start the recurring status poll; the first poll fires immediately.
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
