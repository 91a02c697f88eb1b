//! ipscan core: address parsing, the run lifecycle state machine and the
//! result sort engine. Pure and synchronous; all IO is requested through
//! [`Effect`] values.
mod address;
mod batch;
mod effect;
mod error;
mod lifecycle;
mod msg;
mod rows;
mod sort;
mod state;
mod update;
mod view_model;

pub use address::{
    classify, format_for_display, is_valid, parse, AddressBatch, AddressKind, SAMPLE_ADDRESSES,
};
pub use batch::{BatchAdvisory, BatchLimits};
pub use effect::Effect;
pub use error::RunError;
pub use lifecycle::{
    estimate_remaining, format_remaining, CredentialCheck, CredentialStatus, Generation,
    JobHandle, JobStatus, LifecycleConfig, ProgressSnapshot, Quota, RunPhase,
};
pub use msg::Msg;
pub use rows::{FieldValue, ResultRow, RiskLevel, RiskSummary, ADDRESS_FIELD, RISK_LEVEL_FIELD};
pub use sort::{compare, QuickSort, SortController, SortDirection};
pub use state::AppState;
pub use update::update;
pub use view_model::{AppViewModel, ProgressView, ResultRowView, TABLE_COLUMNS};
