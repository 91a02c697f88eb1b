//! ipscan engine: the analysis backend, job polling, effect execution and
//! result export.
mod backend;
mod engine;
mod export;
mod filename;
mod persist;
mod poller;
mod types;

pub use backend::{local_credential_check, AnalysisBackend, BackendSettings, ReqwestBackend};
pub use engine::EngineHandle;
pub use export::{export_csv, export_json, ExportError, ExportSummary};
pub use filename::{date_stem, export_filename, job_stem, today_stem};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{poll_snapshots, PollOutcome};
pub use types::{BackendError, BackendFailure, EngineEvent};
