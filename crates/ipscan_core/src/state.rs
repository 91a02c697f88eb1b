use crate::address::AddressBatch;
use crate::batch::BatchAdvisory;
use crate::error::RunError;
use crate::lifecycle::{
    CredentialStatus, Generation, JobHandle, LifecycleConfig, ProgressSnapshot, RunPhase,
};
use crate::rows::ResultRow;
use crate::sort::SortController;
use crate::view_model::AppViewModel;

/// Session state owned by a single controller. Every field is scoped to the
/// session; nothing is shared between sessions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    config: LifecycleConfig,
    input: String,
    batch: AddressBatch,
    advisory: BatchAdvisory,
    pending_confirmation: Option<usize>,
    credential: String,
    credential_status: CredentialStatus,
    phase: RunPhase,
    generation: Generation,
    job: Option<JobHandle>,
    snapshot: Option<ProgressSnapshot>,
    notice: Option<RunError>,
    results: Vec<ResultRow>,
    results_job: Option<JobHandle>,
    sort: SortController,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::build(self)
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn batch(&self) -> &AddressBatch {
        &self.batch
    }

    pub fn advisory(&self) -> BatchAdvisory {
        self.advisory
    }

    pub fn pending_confirmation(&self) -> Option<usize> {
        self.pending_confirmation
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn credential_status(&self) -> &CredentialStatus {
        &self.credential_status
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn job(&self) -> Option<&JobHandle> {
        self.job.as_ref()
    }

    pub fn snapshot(&self) -> Option<&ProgressSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn notice(&self) -> Option<&RunError> {
        self.notice.as_ref()
    }

    /// Result rows in received order. Never reordered in place.
    pub fn results(&self) -> &[ResultRow] {
        &self.results
    }

    /// Job that produced the current result set.
    pub fn results_job(&self) -> Option<&JobHandle> {
        self.results_job.as_ref()
    }

    pub fn sort(&self) -> &SortController {
        &self.sort
    }

    pub fn sorted_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.sort.sorted(&self.results)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, input: String) {
        self.batch = AddressBatch::from_text(&input);
        self.advisory = BatchAdvisory::classify(self.batch.len(), self.config.limits);
        self.pending_confirmation = None;
        self.input = input;
        self.mark_dirty();
    }

    pub(crate) fn set_credential(&mut self, credential: String, status: CredentialStatus) {
        self.credential = credential;
        self.credential_status = status;
        self.mark_dirty();
    }

    pub(crate) fn set_credential_status(&mut self, status: CredentialStatus) {
        self.credential_status = status;
        self.mark_dirty();
    }

    pub(crate) fn set_notice(&mut self, notice: RunError) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn set_pending_confirmation(&mut self, pending: Option<usize>) {
        self.pending_confirmation = pending;
        self.mark_dirty();
    }

    pub(crate) fn take_pending_confirmation(&mut self) -> Option<usize> {
        let pending = self.pending_confirmation.take();
        if pending.is_some() {
            self.mark_dirty();
        }
        pending
    }

    /// Opens a new run generation in `Submitting`, dropping the previous
    /// job and snapshot. Returns the new generation.
    pub(crate) fn begin_run(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.phase = RunPhase::Submitting;
        self.job = None;
        self.snapshot = None;
        self.notice = None;
        self.mark_dirty();
        self.generation
    }

    pub(crate) fn start_polling(&mut self, job: JobHandle) {
        self.job = Some(job);
        self.phase = RunPhase::Polling;
        self.mark_dirty();
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: ProgressSnapshot) {
        self.snapshot = Some(snapshot);
        self.mark_dirty();
    }

    pub(crate) fn start_fetching(&mut self) {
        self.phase = RunPhase::FetchingResults;
        self.mark_dirty();
    }

    pub(crate) fn complete(&mut self, rows: Vec<ResultRow>) {
        self.results = rows;
        self.results_job = self.job.take();
        self.sort.reset(&self.results);
        self.snapshot = None;
        self.phase = RunPhase::Completed;
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, error: RunError) {
        self.job = None;
        self.snapshot = None;
        self.phase = RunPhase::Failed(error);
        self.mark_dirty();
    }

    /// Ends the current run and retires its generation, so late responses
    /// for it are ignored.
    pub(crate) fn stop(&mut self) {
        self.generation = self.generation.next();
        self.job = None;
        self.snapshot = None;
        self.phase = RunPhase::Stopped;
        self.mark_dirty();
    }

    pub(crate) fn sort_mut(&mut self) -> (&mut SortController, &[ResultRow]) {
        (&mut self.sort, &self.results)
    }
}
