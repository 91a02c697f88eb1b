use crate::address::format_for_display;
use crate::lifecycle::{estimate_remaining, format_remaining};
use crate::rows::{FieldValue, ResultRow, RiskLevel, RiskSummary};
use crate::{AppState, BatchAdvisory, CredentialStatus, RunError, RunPhase, SortDirection};

/// Columns of the results table, in display order.
pub const TABLE_COLUMNS: [&str; 8] = [
    "ip",
    "risk_level",
    "abuse_confidence",
    "total_reports",
    "country",
    "city",
    "org",
    "dns_ptr",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: RunPhase,
    pub address_count: usize,
    pub ipv4_count: usize,
    pub ipv6_count: usize,
    pub advisory: BatchAdvisory,
    pub awaiting_confirmation: Option<usize>,
    pub credential: CredentialStatus,
    pub progress: Option<ProgressView>,
    pub notice: Option<RunError>,
    pub summary: RiskSummary,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub rows: Vec<ResultRowView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    /// Rounded to whole percent.
    pub percent: u8,
    pub completed: u64,
    pub total: u64,
    pub current_address: String,
    /// `None` while the estimate is indeterminate.
    pub remaining: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRowView {
    /// Position in the received (unsorted) result set, for detail lookups.
    pub index: usize,
    pub address: String,
    pub risk: RiskLevel,
    pub abuse_confidence: String,
    pub total_reports: String,
    pub country: String,
    pub city: String,
    pub org: String,
    pub dns_ptr: String,
}

impl AppViewModel {
    pub(crate) fn build(state: &AppState) -> Self {
        let results = state.results();
        let rows = state
            .sort()
            .order()
            .iter()
            .filter_map(|&index| results.get(index).map(|row| ResultRowView::new(index, row)))
            .collect();

        Self {
            phase: state.phase().clone(),
            address_count: state.batch().len(),
            ipv4_count: state.batch().ipv4,
            ipv6_count: state.batch().ipv6,
            advisory: state.advisory(),
            awaiting_confirmation: state.pending_confirmation(),
            credential: state.credential_status().clone(),
            progress: progress_view(state),
            notice: state.notice().cloned(),
            summary: RiskSummary::from_rows(results),
            sort_field: state.sort().field().map(ToOwned::to_owned),
            sort_direction: state.sort().direction(),
            rows,
            dirty: state.is_dirty(),
        }
    }
}

fn progress_view(state: &AppState) -> Option<ProgressView> {
    if !state.phase().is_active() {
        return None;
    }
    let Some(snapshot) = state.snapshot() else {
        return Some(ProgressView {
            percent: 0,
            completed: 0,
            total: 0,
            current_address: "-".to_string(),
            remaining: None,
        });
    };
    Some(ProgressView {
        percent: snapshot.percent().round().clamp(0.0, 100.0) as u8,
        completed: snapshot.completed,
        total: snapshot.total,
        current_address: snapshot
            .current_address
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        remaining: estimate_remaining(snapshot.completed, snapshot.total, state.config().unit_cost)
            .map(format_remaining),
    })
}

impl ResultRowView {
    fn new(index: usize, row: &ResultRow) -> Self {
        Self {
            index,
            address: format_for_display(row.address()),
            risk: row.risk_level(),
            abuse_confidence: cell(row.get("abuse_confidence")),
            total_reports: cell(row.get("total_reports")),
            country: cell(row.get("country")),
            city: cell(row.get("city")),
            org: cell(row.get("org")),
            dns_ptr: cell(row.get("dns_ptr")),
        }
    }
}

/// Missing or blank cells render as "N/A".
fn cell(value: &FieldValue) -> String {
    let text = value.to_string();
    if text.trim().is_empty() {
        "N/A".to_string()
    } else {
        text
    }
}
