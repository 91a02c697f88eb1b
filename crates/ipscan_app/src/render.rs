use ipscan_core::{
    AppViewModel, BatchAdvisory, CredentialStatus, ResultRow, RiskSummary, RunPhase,
    SortDirection, TABLE_COLUMNS,
};

const HEADERS: [&str; 8] = [
    "IP", "Risk", "Confidence", "Reports", "Country", "City", "Org", "PTR",
];
const MAX_CELL: usize = 28;

pub fn batch_line(view: &AppViewModel) -> String {
    let mut line = format!(
        "{} addresses ({} IPv4, {} IPv6)",
        view.address_count, view.ipv4_count, view.ipv6_count
    );
    if let Some(note) = advisory_note(view.advisory) {
        line.push_str(" - ");
        line.push_str(note);
    }
    line
}

fn advisory_note(advisory: BatchAdvisory) -> Option<&'static str> {
    match advisory {
        BatchAdvisory::Within => None,
        BatchAdvisory::ApproachingLimit => Some("large batch, analysis may take a while"),
        BatchAdvisory::ExceedsLimit => Some("above the batch limit, confirmation required"),
    }
}

pub fn credential_line(status: &CredentialStatus) -> String {
    match status {
        CredentialStatus::Unchecked => "API key: not checked".to_string(),
        CredentialStatus::Checking => "API key: checking...".to_string(),
        CredentialStatus::Valid { quota: Some(quota) } => format!(
            "API key: valid ({} of {} requests left)",
            quota.remaining, quota.limit
        ),
        CredentialStatus::Valid { quota: None } => "API key: valid".to_string(),
        CredentialStatus::Invalid(reason) => format!("API key: invalid ({reason})"),
    }
}

/// One-line progress report, or `None` when no run is in flight.
pub fn progress_line(view: &AppViewModel) -> Option<String> {
    let progress = view.progress.as_ref()?;
    let label = match view.phase {
        RunPhase::Submitting => return Some("Submitting batch...".to_string()),
        RunPhase::FetchingResults => "loading results",
        _ => "analysing",
    };
    let remaining = progress
        .remaining
        .as_deref()
        .map(|text| format!(", about {text} left"))
        .unwrap_or_default();
    Some(format!(
        "[{:>3}%] {} {}/{} (current {}){}",
        progress.percent,
        label,
        progress.completed,
        progress.total,
        progress.current_address,
        remaining
    ))
}

pub fn outcome_line(view: &AppViewModel) -> String {
    match &view.phase {
        RunPhase::Completed => format!("Analysis complete. {}", summary_line(&view.summary)),
        RunPhase::Failed(error) => format!("Analysis failed: {error}"),
        RunPhase::Stopped => "Analysis stopped.".to_string(),
        phase => format!("Run is {}.", phase.label()),
    }
}

pub fn summary_line(summary: &RiskSummary) -> String {
    format!(
        "{} analysed: {} high, {} medium, {} low",
        summary.total, summary.high, summary.medium, summary.low
    )
}

/// Result rows in presented order as an aligned text table.
pub fn results_table(view: &AppViewModel) -> String {
    let mut rows: Vec<[String; 8]> = Vec::with_capacity(view.rows.len() + 1);
    rows.push(HEADERS.map(|header| header.to_string()));
    if let Some(field) = view.sort_field.as_deref() {
        if let Some(column) = TABLE_COLUMNS.iter().position(|name| *name == field) {
            let arrow = match view.sort_direction {
                SortDirection::Asc => " ^",
                SortDirection::Desc => " v",
            };
            rows[0][column].push_str(arrow);
        }
    }
    for row in &view.rows {
        rows.push([
            row.address.clone(),
            row.risk.label().to_string(),
            row.abuse_confidence.clone(),
            row.total_reports.clone(),
            row.country.clone(),
            row.city.clone(),
            row.org.clone(),
            row.dns_ptr.clone(),
        ]);
    }

    let cells: Vec<[String; 8]> = rows
        .into_iter()
        .map(|row| row.map(|cell| truncate(&cell)))
        .collect();
    let mut widths = [0usize; 8];
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Full records behind the table rows, in presented order. With `only`,
/// just the row for that address; `None` when it has no result.
pub fn details(view: &AppViewModel, rows: &[ResultRow], only: Option<&str>) -> Option<String> {
    let blocks: Vec<String> = view
        .rows
        .iter()
        .filter_map(|shown| rows.get(shown.index))
        .filter(|row| only.map_or(true, |address| row.address() == address))
        .map(row_details)
        .collect();
    (!blocks.is_empty()).then(|| blocks.join("\n"))
}

fn row_details(row: &ResultRow) -> String {
    let width = row.fields().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
    let mut out = format!("{}\n", row.address());
    for (name, value) in row.fields() {
        let value = if value.is_missing() {
            "N/A".to_string()
        } else {
            value.to_string()
        };
        out.push_str(&format!("  {name:<width$}  {value}\n"));
    }
    out
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL {
        return cell.to_string();
    }
    let kept: String = cell.chars().take(MAX_CELL - 3).collect();
    format!("{kept}...")
}
