//! Plain-text rendering of analysis issues, write outcomes, and check
//! deltas. This module only builds strings; the orchestrator decides where
//! they go.

use crate::analyzer::AnalysisIssue;
use crate::apply::ApplyResult;
use crate::check::CheckReport;

/// One line pair per issue: location and message, then the offending line.
pub fn format_analysis_issues(issues: &[AnalysisIssue]) -> Vec<String> {
    issues
        .iter()
        .map(|issue| {
            format!(
                "  [line {}] {}\n    {}",
                issue.line_number, issue.message, issue.line_content
            )
        })
        .collect()
}

/// Per-file outcomes followed by the batch summary.
pub fn format_write_results(outcome: &ApplyResult) -> String {
    let mut lines = Vec::new();

    for result in &outcome.write_results {
        if result.success {
            lines.push(format!(
                "✔ Written: {} (+{}, -{})",
                result.file_path, result.lines_added, result.lines_deleted
            ));
        } else {
            let reason = result
                .error
                .as_ref()
                .map_or_else(|| "unknown error".to_string(), |err| format!("{err:#}"));
            lines.push(format!("✘ Failed: {} ({reason})", result.file_path));
        }
    }

    let stats = &outcome.stats;
    lines.push(String::new());
    lines.push("Summary:".to_string());
    lines.push(format!(
        "Attempted: {} file(s) ({} succeeded, {} failed)",
        stats.total_attempted, stats.successful_writes, stats.failed_writes
    ));
    lines.push(format!(
        "Lines: +{}, -{}",
        stats.total_lines_added, stats.total_lines_deleted
    ));
    if stats.duration_ms > 0.0 {
        lines.push(format!("Completed in {:.2}ms", stats.duration_ms));
    }

    lines.join("\n")
}

/// Before/after checker comparison. Either side may be missing; the delta
/// is only shown when both runs produced data.
pub fn format_check_outcome(before: Option<&CheckReport>, after: Option<&CheckReport>) -> String {
    match (before, after) {
        (Some(before), Some(after)) => format!(
            "Check: {} error(s), {} warning(s) -> {} error(s), {} warning(s) ({} errors, {} warnings)",
            before.errors,
            before.warnings,
            after.errors,
            after.warnings,
            signed(after.errors as i64 - before.errors as i64),
            signed(after.warnings as i64 - before.warnings as i64),
        ),
        (None, Some(after)) => format!(
            "Check (after apply): {} error(s), {} warning(s); no pre-apply data to compare",
            after.errors, after.warnings
        ),
        (Some(before), None) => format!(
            "Check (before apply): {} error(s), {} warning(s); post-apply check unavailable",
            before.errors, before.warnings
        ),
        (None, None) => "Check data unavailable.".to_string(),
    }
}

fn signed(delta: i64) -> String {
    if delta >= 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}
