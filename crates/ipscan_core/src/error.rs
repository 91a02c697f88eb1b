use thiserror::Error;

/// Terminal failures of a run, surfaced verbatim to the operator.
///
/// Poll transport errors never end a run and have no variant here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("credential has not been validated")]
    InvalidCredential,
    #[error("no valid IP addresses found")]
    EmptyBatch,
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("analysis failed: {0}")]
    Job(String),
    #[error("loading results failed: {0}")]
    ResultFetch(String),
}
