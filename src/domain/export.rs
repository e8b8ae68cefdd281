use chrono::{DateTime, Duration, Utc};

use crate::model::export_job::{ExportFormat, ExportStatus};

/// Completed artifacts stay downloadable for this long.
pub const RETENTION_DAYS: i64 = 7;

pub fn retention_deadline(completed_at: DateTime<Utc>) -> DateTime<Utc> {
    completed_at + Duration::days(RETENTION_DAYS)
}

/// A job is downloadable while it is completed, still has a file on record
/// and has not passed its retention deadline.
pub fn is_downloadable(
    status: ExportStatus,
    has_file: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    status == ExportStatus::Completed
        && has_file
        && expires_at.map(|exp| now < exp).unwrap_or(false)
}

pub fn content_type(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Csv => "text/csv",
        ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ExportFormat::Html => "text/html",
    }
}

pub fn file_extension(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Csv => "csv",
        ExportFormat::Xlsx => "xlsx",
        ExportFormat::Html => "html",
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn build_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&headers.join(","));
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// HTML table, used both as the print rendition and the PDF stand-in.
pub fn build_html_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>");
    out.push_str(&html_escape(title));
    out.push_str("</title></head><body><h1>");
    out.push_str(&html_escape(title));
    out.push_str("</h1><table border=\"1\"><thead><tr>");
    for h in headers {
        out.push_str("<th>");
        out.push_str(&html_escape(h));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&html_escape(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></body></html>");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloadable_until_retention_deadline() {
        let completed = Utc::now();
        let expires = retention_deadline(completed);
        assert!(is_downloadable(
            ExportStatus::Completed,
            true,
            Some(expires),
            completed,
        ));
        // one second past the deadline
        assert!(!is_downloadable(
            ExportStatus::Completed,
            true,
            Some(expires),
            expires + Duration::seconds(1),
        ));
    }

    #[test]
    fn only_completed_jobs_with_a_file_download() {
        let now = Utc::now();
        let exp = Some(now + Duration::days(1));
        assert!(!is_downloadable(ExportStatus::Pending, true, exp, now));
        assert!(!is_downloadable(ExportStatus::Failed, true, exp, now));
        assert!(!is_downloadable(ExportStatus::Completed, false, exp, now));
        assert!(!is_downloadable(ExportStatus::Completed, true, None, now));
    }

    #[test]
    fn retention_is_seven_days() {
        let completed = Utc::now();
        assert_eq!(retention_deadline(completed) - completed, Duration::days(7));
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let csv = build_csv(
            &["no", "name"],
            &[vec!["INV-1".into(), "Acme, \"East\"".into()]],
        );
        assert_eq!(csv, "no,name\nINV-1,\"Acme, \"\"East\"\"\"\n");
    }

    #[test]
    fn html_cells_are_escaped() {
        let html = build_html_table("t", &["h"], &[vec!["<x>&".into()]]);
        assert!(html.contains("<td>&lt;x&gt;&amp;</td>"));
    }
}
