//! Aggregate report and issue-body rendering
//!
//! One detection pass yields an `UpdateReport`; this module turns it into
//! the Markdown tables embedded in tracking issues and fills the
//! configured issue-body template.

/// One origin in a report list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub bundle_name: String,
    pub project: String,
    pub package: String,
}

/// Outcome of one detection pass: the origins that changed and the ones
/// whose check failed. An origin appears in at most one of the lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: Vec<ReportRow>,
    pub failed: Vec<ReportRow>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.failed.is_empty()
    }
}

const TABLE_HEADER: &str = "\
| Bundle Package Name | Origin Project Name | Origin Package Name |
|---------------------|---------------------|---------------------|
";

/// Render the report as Markdown: a table of updated packages, and — only
/// when checks failed — a second table of the failures.
pub fn format_updates_md(report: &UpdateReport) -> String {
    let mut out = String::from(TABLE_HEADER);
    out.push_str(&table_rows(&report.updated));

    if !report.failed.is_empty() {
        out.push_str("\n\nFailed to check the following packages:\n");
        out.push_str(TABLE_HEADER);
        out.push_str(&table_rows(&report.failed));
    }

    out
}

fn table_rows(rows: &[ReportRow]) -> String {
    rows.iter()
        .map(|row| format!("|{}|{}|{}|", row.bundle_name, row.project, row.package))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitute `$key` and `${key}` occurrences in an issue-body template.
///
/// Longer keys are replaced first, so `$last_execution` cannot clobber the
/// tail of `$last_execution_ts`.
pub fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = vars.iter().collect();
    sorted.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));

    let mut out = template.to_string();
    for (key, value) in sorted {
        out = out.replace(&format!("${{{}}}", key), value);
        out = out.replace(&format!("${}", key), value);
    }
    out
}
