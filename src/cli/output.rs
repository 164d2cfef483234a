//! CLI output formatting

use crate::core::pipeline::{Pipeline, PipelineKind};
use crate::error::GenError;
use crate::graph::ValidationReport;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");

/// Format one violation for display
pub fn format_violation(violation: &GenError) -> String {
    let label = match violation {
        GenError::DuplicateName { .. } => "duplicate name",
        GenError::UnresolvedDependency { .. } => "unresolved dependency",
        GenError::CycleDetected { .. } => "cycle",
        GenError::UnknownVolume { .. } => "unknown volume",
        GenError::InvalidTrigger { .. } => "invalid trigger",
    };
    format!(
        "{} {} {}",
        CROSS,
        style(format!("[{}]", label)).red().bold(),
        violation
    )
}

/// Format the validation summary line
pub fn format_report_summary(report: &ValidationReport) -> String {
    if report.is_clean() {
        format!("{} {}", CHECK, style("no violations found").green())
    } else {
        format!(
            "{} {}",
            CROSS,
            style(format!("{} violation(s) found", report.len())).red()
        )
    }
}

/// Format one pipeline for the list view
pub fn format_pipeline_line(pipeline: &Pipeline) -> String {
    let kind = match pipeline.kind {
        PipelineKind::Standard => "standard",
        PipelineKind::HostedCloud => "hosted-cloud",
    };

    let mut line = format!(
        "  {} ({}, {} steps)",
        style(&pipeline.name).bold(),
        kind,
        style(pipeline.steps.len()).cyan()
    );
    if !pipeline.depends_on.is_empty() {
        line.push_str(&format!(
            " depends on {}",
            style(pipeline.depends_on.join(", ")).dim()
        ));
    }
    line
}
