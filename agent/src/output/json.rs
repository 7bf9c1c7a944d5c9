//! JSON report builder
//!
//! Builds the machine-readable report. Object keys come out sorted because
//! `serde_json::Map` is ordered by key.

use serde_json::{json, Value};

use crate::report::{AuditReport, FileResult, FileStatus};

/// Build the JSON report
///
/// With `only_flagged`, results keep only flagged and erroring records; the
/// summary always covers every file.
pub fn build_json_report(report: &AuditReport, only_flagged: bool) -> Value {
    let results: Vec<Value> = report
        .results
        .iter()
        .filter(|result| !only_flagged || !result.is_ok() || result.is_flagged())
        .map(build_file_record)
        .collect();

    let mut payload = json!({
        "results": results,
        "summary": report.summary,
    });

    if !report.missing_dirs.is_empty() {
        let missing: Vec<String> = report
            .missing_dirs
            .iter()
            .map(|dir| dir.display().to_string())
            .collect();
        payload["missing_dirs"] = json!(missing);
    }

    payload
}

/// Pretty-printed JSON report (2-space indent)
pub fn render_json(report: &AuditReport, only_flagged: bool) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&build_json_report(report, only_flagged))
}

fn build_file_record(result: &FileResult) -> Value {
    let conf_file = result.conf_file.display().to_string();
    match &result.status {
        FileStatus::Ok {
            allow_own,
            packages,
        } => json!({
            "conf_file": conf_file,
            "packages": packages,
            "status": "ok",
            "flagged": !allow_own.is_empty(),
            "allow_own_in_default_policy": allow_own,
            "findings_count": allow_own.len(),
        }),
        FileStatus::Error { message } => json!({
            "conf_file": conf_file,
            "status": "error",
            "error": message,
        }),
    }
}
