use crate::{CredentialCheck, Generation, JobHandle, ProgressSnapshot, QuickSort, ResultRow};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Operator edited the address input box.
    InputChanged(String),
    /// Operator entered or changed the API credential.
    CredentialChanged(String),
    /// Credential supplied for this session only (stored or one-off); it is
    /// validated but never written back.
    CredentialLoaded(String),
    /// Backend answered a credential check. `Err` is a transport failure.
    CredentialChecked {
        credential: String,
        result: Result<CredentialCheck, String>,
    },
    /// Operator asked to analyse the current input.
    SubmitClicked,
    /// Operator accepted a batch above the hard limit.
    OversizeConfirmed,
    /// Operator backed out of a batch above the hard limit.
    OversizeDeclined,
    /// Operator clicked Stop.
    StopClicked,
    /// Remote submit call finished.
    JobSubmitted {
        generation: Generation,
        result: Result<JobHandle, String>,
    },
    /// One status poll finished. `Err` is a transport failure, not a job error.
    PollResponse {
        generation: Generation,
        result: Result<ProgressSnapshot, String>,
    },
    /// Result download finished.
    ResultsLoaded {
        generation: Generation,
        result: Result<Vec<ResultRow>, String>,
    },
    /// Operator clicked a sortable column header.
    SortClicked(String),
    /// Operator picked one of the canned orderings.
    QuickSortClicked(QuickSort),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
