//! Human-readable rendering of plans, reports and collection listings.

use std::fmt::Write;

use colswap_core::store::TimeToLive;
use colswap_core::{
    CollectionDescriptor, CopyResult, MigrationError, MigrationPlan, MigrationReport,
    TempDisposition,
};
use comfy_table::Table;

use crate::commands::CollectionSummary;

fn join_or_none(paths: &[String]) -> String {
    if paths.is_empty() {
        "(none)".to_string()
    } else {
        paths.join(", ")
    }
}

fn properties_table(descriptor: &CollectionDescriptor) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec![
        "Partition key".to_string(),
        join_or_none(descriptor.partition_key_paths()),
    ]);
    table.add_row(vec![
        "Excluded path".to_string(),
        descriptor.excluded_index_path().unwrap_or("(none)").to_string(),
    ]);
    table.add_row(vec![
        "Unique key".to_string(),
        join_or_none(descriptor.unique_key_paths()),
    ]);
    table.add_row(vec![
        "Throughput".to_string(),
        descriptor.offer_throughput().to_string(),
    ]);
    table
}

/// Render a dry-run plan.
pub fn render_plan(plan: &MigrationPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Collection: {}", plan.source().qualified_name());
    let _ = writeln!(out, "Temp:       {}", plan.temp().qualified_name());
    let _ = writeln!(out, "{}", properties_table(plan.source()));
    let _ = writeln!(out, "Steps:");
    for (i, step) in plan.steps().iter().enumerate() {
        let _ = writeln!(out, "  {}. {:<18} {}", i + 1, step.to_string(), step.describe());
    }
    if !plan.is_destructive() {
        let _ = writeln!(out, "The original collection is kept; documents are only staged.");
    }
    out
}

fn copy_line(label: &str, result: &CopyResult) -> String {
    let mut line = format!(
        "{label}: {} read, {} in destination",
        result.source_count, result.destination_count
    );
    if result.duplicates_skipped > 0 {
        let _ = write!(
            line,
            ", {} duplicates skipped ({})",
            result.duplicates_skipped,
            result.skipped_ids.join(", ")
        );
    }
    if result.count_mismatch {
        line.push_str(", COUNT MISMATCH");
    }
    line
}

fn disposition(report: &MigrationReport) -> String {
    let temp = report
        .temp
        .as_ref()
        .map(|t| t.qualified_name())
        .unwrap_or_default();
    match &report.temp_disposition {
        TempDisposition::NeverCreated => "not created".to_string(),
        TempDisposition::Present => format!("{temp} still present"),
        TempDisposition::Deleted => format!("{temp} deleted"),
        TempDisposition::Retained => format!("{temp} retained"),
        TempDisposition::CleanupFailed(reason) => {
            format!("{temp} could not be deleted: {reason}")
        }
    }
}

/// Render what a run did.
pub fn render_report(report: &MigrationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Collection: {}", report.source.qualified_name());
    let _ = writeln!(out, "Phase:      {}", report.phase);
    let steps: Vec<String> = report.completed_steps.iter().map(|s| s.to_string()).collect();
    let _ = writeln!(out, "Completed:  {}", join_or_none(&steps));
    if let Some(staging) = &report.staging {
        let _ = writeln!(out, "{}", copy_line("Staging", staging));
    }
    if let Some(restore) = &report.restore {
        let _ = writeln!(out, "{}", copy_line("Restore", restore));
    }
    let _ = writeln!(out, "Temp:       {}", disposition(report));
    out
}

/// Render a failed run, with recovery guidance.
pub fn render_failure(err: &MigrationError) -> String {
    let report = &err.report;
    let mut out = render_report(report);
    let _ = writeln!(out, "Failed at:  {} ({})", err.step, err.step.describe());
    let _ = writeln!(out, "Cause:      {}", err.cause);

    if !report.original_deleted() {
        let _ = writeln!(out, "The original collection was not modified.");
    } else if report.temp_disposition == TempDisposition::Retained {
        if let Some(temp) = &report.temp {
            let _ = writeln!(
                out,
                "The original collection was deleted. {} holds the staged documents; \
                 copy them into {} before deleting it.",
                temp.qualified_name(),
                report.source.qualified_name()
            );
        }
    } else {
        let _ = writeln!(
            out,
            "The original collection was deleted and the temp collection was removed."
        );
    }
    out
}

fn ttl(value: TimeToLive) -> String {
    match value {
        TimeToLive::Off => "off".to_string(),
        TimeToLive::NoDefaultExpiry => "no default".to_string(),
        TimeToLive::Seconds(secs) => format!("{secs}s"),
    }
}

/// Render a collection listing.
pub fn render_collections(database: &str, summaries: &[CollectionSummary]) -> String {
    if summaries.is_empty() {
        return format!("No collections in {database}\n");
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Collection",
        "Documents",
        "Partition key",
        "Excluded paths",
        "Unique keys",
        "Throughput",
        "TTL",
    ]);
    for summary in summaries {
        let spec = &summary.spec;
        let partition = spec
            .partition_key
            .as_ref()
            .map(|pk| pk.paths.join(", "))
            .unwrap_or_else(|| "(none)".to_string());
        let unique: Vec<String> = spec
            .unique_key_policy
            .unique_keys
            .iter()
            .map(|key| format!("[{}]", key.paths.join(", ")))
            .collect();
        table.add_row(vec![
            spec.id.clone(),
            summary.document_count.to_string(),
            partition,
            join_or_none(&spec.indexing_policy.excluded_paths),
            join_or_none(&unique),
            spec.throughput.to_string(),
            ttl(spec.default_ttl),
        ]);
    }
    format!("{table}\n")
}
