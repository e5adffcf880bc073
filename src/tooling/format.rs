//! Render command results as text tables or JSON.

use crate::assembly::{AssemblyReport, ObjectReport, PageGap, SequenceCheck};
use crate::error::ApiError;
use crate::fixity::{Classification, HashOutcome, ReconciliationReport};
use crate::staging::{CopySummary, LayoutReport, StagingFolder};
use clap::ValueEnum;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn status_word(ok: bool, good: &str, bad: &str) -> String {
    if ok {
        format!("{}", good.green())
    } else {
        format!("{}", bad.red())
    }
}

pub fn format_hash_outcome(
    outcome: &HashOutcome,
    log_path: &Path,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        let errors: Vec<_> = outcome
            .errors
            .iter()
            .map(|e| json!({ "key": e.key(), "error": e.to_string() }))
            .collect();
        let value = json!({
            "log": log_path.display().to_string(),
            "records": outcome.log.len(),
            "hashed": outcome.hashed,
            "carried_forward": outcome.carried_forward,
            "appended": outcome.appended,
            "errors": errors,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Fixity")));
    out.push_str(&format!("  Log: {}\n", log_path.display()));
    out.push_str(&format!("  Records: {}\n", outcome.log.len()));
    out.push_str(&format!("  Hashed: {}\n", outcome.hashed));
    out.push_str(&format!("  Carried forward: {}\n", outcome.carried_forward));
    out.push_str(&format!("  Appended: {}\n", outcome.appended));
    if !outcome.errors.is_empty() {
        out.push_str(&format!(
            "\n{}\n\n",
            format_section_heading(&format!("Errors ({})", outcome.errors.len()))
        ));
        for error in &outcome.errors {
            out.push_str(&format!("  {}\n", error));
        }
    }
    Ok(out)
}

fn audit_label(classification: Classification) -> &'static str {
    match classification {
        Classification::Consistent => "GOOD",
        Classification::Missing => "NOT MOVED",
        Classification::Corrupted => "BAD HASH",
        Classification::Unexpected => "FOREIGN FILE",
    }
}

pub fn format_reconciliation(
    report: &ReconciliationReport,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        let value = json!({
            "clean": report.is_clean(),
            "summary": report.summary,
            "entries": report.entries,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let summary = &report.summary;
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n\n",
        format_section_heading("Audit"),
        status_word(report.is_clean(), "clean", "problems found")
    ));
    out.push_str(&format!("  {} file(s) total in the staging area\n", summary.staged_files));
    out.push_str(&format!("  {} file(s) recorded at origin\n", summary.origin_files));
    out.push_str(&format!("  {} file(s) consistent\n", summary.consistent));
    out.push_str(&format!("  {} file(s) not copied\n", summary.missing));
    out.push_str(&format!("  {} file(s) have a different hash from the origin\n", summary.corrupted));
    out.push_str(&format!("  {} file(s) appear to not have come from the origin\n", summary.unexpected));

    if !report.is_clean() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Status", "Key", "Origin digest", "Staged digest"]);
        for entry in report
            .entries
            .iter()
            .filter(|e| e.classification != Classification::Consistent)
        {
            table.add_row(vec![
                audit_label(entry.classification).to_string(),
                entry.key.clone(),
                entry.origin_digest.clone().unwrap_or_else(|| "-".to_string()),
                entry.staged_digest.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        out.push_str(&format!("\n{}\n", table));
    }
    Ok(out)
}

/// Per-key audit line in the form written to the staging run log.
pub fn audit_line(classification: Classification, key: &str, digest: Option<&str>) -> String {
    match digest {
        Some(d) => format!("{}: {}:{}", audit_label(classification), key, d),
        None => format!("{}: {}", audit_label(classification), key),
    }
}

pub fn format_layout(report: &LayoutReport, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        let value = json!({ "valid": report.is_valid(), "layout": report });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n\n",
        format_section_heading("Staging layout"),
        status_word(report.is_valid(), "valid", "invalid")
    ));
    out.push_str(&format!("  Folders: {}\n", report.folders.len()));
    for name in &report.only_in_data {
        out.push_str(&format!("  Directory appears in data but not admin: {}\n", name));
    }
    for name in &report.only_in_admin {
        out.push_str(&format!("  Directory appears in admin but not data: {}\n", name));
    }
    for entry in &report.non_directories {
        out.push_str(&format!("  Not a directory: {}\n", entry));
    }
    for (folder, missing) in &report.incomplete_admin {
        out.push_str(&format!("  admin/{} is missing: {}\n", folder, missing.join(", ")));
    }
    Ok(out)
}

pub fn format_copy(summary: &CopySummary, folder: &StagingFolder, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        let value = json!({ "folder": folder.name, "copy": summary });
        return Ok(serde_json::to_string_pretty(&value)?);
    }
    Ok(format!(
        "{}\n\n  Folder: {}\n  Copied: {}\n  Skipped: {}\n  Bytes: {}\n",
        format_section_heading("Stage"),
        folder.name,
        summary.copied,
        summary.skipped,
        summary.bytes
    ))
}

fn object_problems(object: &ObjectReport) -> Vec<String> {
    let mut problems: Vec<String> = object.errors.iter().map(|e| e.to_string()).collect();
    for check in &object.sequences {
        match check {
            SequenceCheck::NoSequence { role } => {
                problems.push(format!("role '{}': no sequence present", role))
            }
            SequenceCheck::Checked(gaps) if !gaps.is_complete() => problems.push(format!(
                "role '{}': missing page(s) {} of 1..{}",
                gaps.role,
                gaps.missing
                    .iter()
                    .map(PageGap::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                gaps.expected_max
            )),
            SequenceCheck::Checked(_) => {}
        }
    }
    problems
}

pub fn format_assembly(report: &AssemblyReport, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        let objects: Vec<_> = report
            .objects
            .iter()
            .map(|o| json!({ "complete": o.is_complete(), "report": o }))
            .collect();
        let value = json!({
            "clean": report.is_clean(),
            "complete": report.complete_count(),
            "objects": objects,
            "unresolved": report.unresolved,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} {}/{} complete\n\n",
        format_section_heading("Objects"),
        report.complete_count(),
        report.objects.len()
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Identifier", "Members", "Descriptive", "Representation", "Status"]);
    for object in &report.objects {
        table.add_row(vec![
            object.identifier().to_string(),
            object.object.member_count().to_string(),
            object.descriptive_metadata.clone().unwrap_or_else(|| "-".to_string()),
            object.representation.clone().unwrap_or_else(|| "-".to_string()),
            status_word(object.is_complete(), "complete", "incomplete"),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    for object in report.objects.iter().filter(|o| !o.is_complete() || !o.warnings.is_empty()) {
        out.push_str(&format!("\n{}\n", format_section_heading(object.identifier())));
        for problem in object_problems(object) {
            out.push_str(&format!("  {}\n", problem));
        }
        for warning in &object.warnings {
            out.push_str(&format!("  warning: {}\n", warning));
        }
        if !object.unclassified.is_empty() {
            out.push_str(&format!("  unclassified: {}\n", object.unclassified.join(", ")));
        }
    }

    if !report.unresolved.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            format_section_heading(&format!("Unresolved files ({})", report.unresolved.len()))
        ));
        for error in &report.unresolved {
            out.push_str(&format!("  {}\n", error));
        }
    }
    Ok(out)
}
