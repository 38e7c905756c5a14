//! CLI presentation: text formatters for documents, outlines and reports.

use crate::generation::GenerationReport;
use crate::service::{DocumentView, PartSummary};
use crate::types::{Document, DocumentStatus, Part};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::collections::BTreeMap;

fn status_label(status: DocumentStatus) -> String {
    match status {
        DocumentStatus::Generating => status.as_str().yellow().to_string(),
        DocumentStatus::Ready => status.as_str().green().to_string(),
        DocumentStatus::Failed => status.as_str().red().to_string(),
    }
}

pub fn format_document_list(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Title", "Status", "Created"]);
    for doc in documents {
        table.add_row(vec![
            doc.id.to_string(),
            doc.title.clone(),
            status_label(doc.status),
            doc.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.to_string()
}

fn document_header(document: &Document) -> String {
    let mut s = format!(
        "{}\n  Id: {}\n  Status: {}",
        document.title.bold(),
        document.id,
        status_label(document.status)
    );
    if let Some(discipline) = &document.discipline {
        s.push_str(&format!("\n  Discipline: {}", discipline));
    }
    s
}

pub fn format_outline(document: &Document, outline: &BTreeMap<String, String>) -> String {
    let mut s = document_header(document);
    if outline.is_empty() {
        s.push_str("\n\nNo parts yet.");
        return s;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Title"]);
    for (key, title) in outline {
        table.add_row(vec![key.as_str(), title.as_str()]);
    }
    s.push_str("\n\n");
    s.push_str(&table.to_string());
    s
}

pub fn format_part_summaries(prefix: &str, parts: &[PartSummary]) -> String {
    if parts.is_empty() {
        return format!("No parts under '{}'.", prefix);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Title", "Updated"]);
    for part in parts {
        table.add_row(vec![
            part.key.clone(),
            part.title.clone().unwrap_or_else(|| "-".to_string()),
            part.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_part(part: &Part) -> String {
    format!(
        "## {} ({})\n  Words: {}  Updated: {}\n\n{}",
        part.display_title().bold(),
        part.key,
        part.word_count(),
        part.updated_at.format("%Y-%m-%d %H:%M:%S"),
        part.content
    )
}

pub fn format_document_view(view: &DocumentView) -> String {
    let mut s = document_header(&view.document);
    s.push_str(&format!(
        "\n  Progress: {}%\n  Words: {}",
        view.progress,
        view.word_count()
    ));
    for part in view.parts.values() {
        s.push_str(&format!(
            "\n\n## {} ({})\n\n{}",
            part.display_title(),
            part.key,
            part.content
        ));
    }
    s
}

pub fn format_generation_report(report: &GenerationReport) -> String {
    let convergence = &report.convergence;
    let mut s = format!(
        "Sections generated: {}\nSection failures: {}\nWords: {} -> {} (target {}, {})",
        report.sections_generated.len(),
        report.section_failures.len(),
        convergence.initial_words,
        convergence.final_words,
        convergence.target_words,
        if convergence.target_reached {
            "reached".green().to_string()
        } else {
            "not reached".yellow().to_string()
        }
    );
    if convergence.rounds_run > 0 {
        s.push_str(&format!(
            "\nExpansion rounds: {} ({} ok, {} failed)",
            convergence.rounds_run,
            convergence.successful_expansions,
            convergence.failed_expansions
        ));
    }
    for (key, reason) in &report.section_failures {
        s.push_str(&format!("\n  - {}: {}", key.red(), reason));
    }
    s
}
