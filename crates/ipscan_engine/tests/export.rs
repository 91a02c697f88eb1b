use std::fs;

use ipscan_core::{JobHandle, ResultRow, SortController};
use ipscan_engine::{export_csv, export_filename, export_json, job_stem};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn rows() -> Vec<ResultRow> {
    vec![
        ResultRow::default()
            .with("ip", "1.1.1.1")
            .with("risk_level", "low")
            .with("total_reports", 0i64)
            .with("org", "Cloudflare, Inc."),
        ResultRow::default()
            .with("ip", "2001:db8::1")
            .with("risk_level", "high")
            .with("total_reports", 17i64)
            .with("note", "said \"hi\""),
        ResultRow::default().with("ip", "8.8.8.8"),
    ]
}

#[test]
fn csv_uses_union_header_and_quotes_cells() {
    let temp = TempDir::new().unwrap();
    let name = export_filename("ip_analysis", &job_stem(&JobHandle::new("1a2b3c4d-ffff")), "csv");
    let summary = export_csv(temp.path(), &name, &rows()).unwrap();

    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.path, temp.path().join("ip_analysis_1a2b3c4d.csv"));
    let content = fs::read_to_string(&summary.path).unwrap();
    assert_eq!(
        content,
        "ip,risk_level,total_reports,org,note\r\n\
         1.1.1.1,low,0,\"Cloudflare, Inc.\",\r\n\
         2001:db8::1,high,17,,\"said \"\"hi\"\"\"\r\n\
         8.8.8.8,,,,\r\n"
    );
}

#[test]
fn json_keeps_field_order_and_types() {
    let temp = TempDir::new().unwrap();
    let summary = export_json(temp.path(), "ip_analysis_2024-01-01.json", &rows()[..1]).unwrap();

    let content = fs::read_to_string(&summary.path).unwrap();
    assert_eq!(
        content,
        "[\n  {\n    \"ip\": \"1.1.1.1\",\n    \"risk_level\": \"low\",\n    \"total_reports\": 0,\n    \"org\": \"Cloudflare, Inc.\"\n  }\n]\n"
    );
}

#[test]
fn export_ignores_presented_order() {
    let rows = rows();
    let mut sort = SortController::new();
    sort.sort_by("total_reports", &rows);
    sort.sort_by("total_reports", &rows);
    assert_eq!(sort.order(), &[1, 0, 2]);

    let temp = TempDir::new().unwrap();
    let summary = export_json(temp.path(), "out.json", &rows).unwrap();
    let exported: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&summary.path).unwrap()).unwrap();
    let addresses: Vec<&str> = exported
        .iter()
        .map(|record| record["ip"].as_str().unwrap())
        .collect();
    assert_eq!(addresses, vec!["1.1.1.1", "2001:db8::1", "8.8.8.8"]);
}

#[test]
fn empty_result_set_writes_empty_documents() {
    let temp = TempDir::new().unwrap();
    let csv = export_csv(temp.path(), "empty.csv", &[]).unwrap();
    assert_eq!(fs::read_to_string(csv.path).unwrap(), "");
    let json = export_json(temp.path(), "empty.json", &[]).unwrap();
    assert_eq!(fs::read_to_string(json.path).unwrap(), "[]\n");
}
