use std::collections::BTreeMap;

use branchtag_core::models::ledger::ErrorKind;
use branchtag_reconcile::tags::TagOutcome;
use branchtag_reconcile::{RunReport, WriteStatus};
use comfy_table::{Cell, Color, Table};

/// End-of-run summary: inventory counts, tag outcomes, writes, and errors per kind.
pub fn render(report: &RunReport, errors: &BTreeMap<ErrorKind, usize>, dry_run: bool) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["SUMMARY", "COUNT"]);

    let mut row = |label: &str, count: usize, color: Color| {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(count.to_string()).fg(color),
        ]);
    };

    row("organizations", report.organizations, Color::White);
    row("targets", report.targets, Color::White);
    row("targets with URL", report.targets_with_url, Color::White);
    row("repositories resolved", report.repositories_resolved, Color::White);
    row("projects listed", report.projects_listed, Color::White);
    row("projects matching default branch", report.projects_matched, Color::Cyan);

    let outcomes = report.outcomes();
    for outcome in [TagOutcome::Inserted, TagOutcome::Updated, TagOutcome::Unchanged] {
        let count = outcomes.get(&outcome).copied().unwrap_or(0);
        row(&format!("tag {outcome}"), count, Color::White);
    }

    let writes = report.writes();
    let written = writes.get(&WriteStatus::Written).copied().unwrap_or(0);
    let failed = writes.get(&WriteStatus::Failed).copied().unwrap_or(0);
    if dry_run {
        let would = writes.get(&WriteStatus::DryRun).copied().unwrap_or(0);
        row("writes suppressed (dry run)", would, Color::Yellow);
    } else {
        row("writes succeeded", written, Color::Green);
        row("writes failed", failed, if failed > 0 { Color::Red } else { Color::White });
    }

    if errors.is_empty() {
        row("errors", 0, Color::Green);
    } else {
        for (kind, count) in errors {
            row(&format!("error: {kind}"), *count, Color::Red);
        }
    }

    table
}
