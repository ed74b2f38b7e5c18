//! Terminal rendering of answers, ingestion reports and stats.
//!
//! The `format_*` functions return plain text so they can be tested; the
//! `print_*` functions add colour on top.

use colored::Colorize;
use lexrag_application::SystemStats;
use lexrag_core::corpus::IngestionReport;
use lexrag_core::refinement::{RagResponse, RefinementMetadata, VerificationStatus};
use lexrag_core::session::Exchange;
use lexrag_infrastructure::corpus::DocumentInfo;
use std::collections::HashSet;

/// Sample questions offered by the interactive shell.
pub const EXAMPLE_QUESTIONS: [&str; 10] = [
    "What are the termination clauses in this contract?",
    "What are the payment terms and conditions?",
    "What are the liability and indemnification provisions?",
    "What is the governing law and jurisdiction?",
    "What are the confidentiality and non-disclosure obligations?",
    "Are there any penalty or liquidated damages clauses?",
    "Who owns the intellectual property created under this agreement?",
    "What does the force majeure clause cover?",
    "What are the renewal or extension options?",
    "How are disputes between the parties resolved?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

/// Whole percentage points, truncated.
pub fn confidence_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0) as u32
}

pub fn confidence_band(confidence: f64) -> ConfidenceBand {
    match confidence_percent(confidence) {
        90.. => ConfidenceBand::High,
        70..=89 => ConfidenceBand::Medium,
        _ => ConfidenceBand::Low,
    }
}

pub fn status_label(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Verified => "VERIFIED",
        VerificationStatus::NeedsCorrection => "NEEDS CORRECTION",
        VerificationStatus::Unverified => "UNKNOWN",
    }
}

pub fn format_corrections(corrections: &[String]) -> String {
    if corrections.is_empty() {
        return "No corrections needed".to_string();
    }
    numbered(corrections.iter().map(String::as_str))
}

/// Numbered list of distinct sources in first-seen order.
pub fn format_sources(sources: &[String]) -> String {
    let mut seen = HashSet::new();
    let distinct: Vec<&str> = sources
        .iter()
        .map(String::as_str)
        .filter(|source| seen.insert(*source))
        .collect();

    if distinct.is_empty() {
        return "No sources available".to_string();
    }
    numbered(distinct.into_iter())
}

pub fn format_metadata(metadata: &RefinementMetadata) -> String {
    let mut lines = vec![
        format!("Retrieved documents: {}", metadata.retrieved_docs),
        format!("Source files: {}", metadata.source_files.len()),
    ];
    if let Some(iterations) = metadata.final_iteration_count {
        lines.push(format!("Processing iterations: {iterations}"));
    }
    if let Some(total) = metadata.total_corrections {
        lines.push(format!("Total corrections: {total}"));
    }
    lines.join("\n")
}

pub fn format_ingestion(report: &IngestionReport) -> String {
    let mut lines = vec![format!(
        "Successfully processed: {} / {}",
        report.successful(),
        report.results.len()
    )];

    for result in &report.results {
        let name = result
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| result.file.display().to_string());
        let mark = if result.success { "ok" } else { "failed" };
        let mut line = format!("  [{mark}] {name}: {}", result.message);
        if result.success {
            line.push_str(&format!(
                " ({} chunks added, {} total)",
                result.chunks_added, result.total_chunks
            ));
        }
        lines.push(line);
    }

    lines.push(format!(
        "Index: {} documents, {} chunks",
        report.index_stats.total_documents, report.index_stats.total_chunks
    ));
    lines.join("\n")
}

pub fn format_stats(stats: &SystemStats, documents: &[DocumentInfo]) -> String {
    let config = &stats.config;
    let mut lines = vec![
        format!("Documents: {}", stats.index_stats.total_documents),
        format!("Chunks: {}", stats.index_stats.total_chunks),
        format!("Sessions: {}", stats.sessions),
        format!("Model: {}", config.model),
        format!("Embedding model: {}", config.embedding_model),
        format!(
            "Chunking: {} chars, {} overlap",
            config.chunk_size, config.chunk_overlap
        ),
        format!(
            "Refinement: threshold {:.2}, up to {} iterations, top {} chunks",
            config.confidence_threshold, config.max_iterations, config.max_retrieval_docs
        ),
        format!(
            "Uploads: {} up to {}MB",
            config.allowed_extensions.join(", "),
            config.max_file_size_mb
        ),
    ];

    if !documents.is_empty() {
        lines.push("Indexed files:".to_string());
        for doc in documents {
            lines.push(format!(
                "  {} ({:.2}MB, {} chunks)",
                doc.source_id, doc.size_mb, doc.chunk_count
            ));
        }
    }
    lines.join("\n")
}

/// One entry per completed exchange, oldest first.
pub fn format_history(history: &[Exchange]) -> String {
    if history.is_empty() {
        return "No questions asked in this session yet".to_string();
    }
    history
        .iter()
        .enumerate()
        .map(|(i, exchange)| {
            format!(
                "{}. {}\n   {} at {}% after {} iterations",
                i + 1,
                exchange.question,
                status_label(exchange.verification_status),
                confidence_percent(exchange.confidence),
                exchange.iterations
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn numbered<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn colored_confidence(confidence: f64) -> String {
    let text = format!("{}%", confidence_percent(confidence));
    match confidence_band(confidence) {
        ConfidenceBand::High => text.bright_green().bold().to_string(),
        ConfidenceBand::Medium => text.bright_yellow().bold().to_string(),
        ConfidenceBand::Low => text.bright_red().bold().to_string(),
    }
}

fn colored_status(status: VerificationStatus) -> String {
    let label = status_label(status);
    match status {
        VerificationStatus::Verified => label.bright_green().to_string(),
        VerificationStatus::NeedsCorrection => label.bright_yellow().to_string(),
        VerificationStatus::Unverified => label.bright_black().to_string(),
    }
}

pub fn print_response(response: &RagResponse) {
    println!();
    for line in response.answer.lines() {
        println!("{}", line.bright_blue());
    }
    println!();
    println!(
        "{} {}   {} {}",
        "Confidence:".bright_black(),
        colored_confidence(response.confidence),
        "Status:".bright_black(),
        colored_status(response.verification_status)
    );

    println!("{}", "Sources".bright_magenta());
    println!("{}", format_sources(&response.sources));
    println!("{}", "Corrections".bright_magenta());
    println!("{}", format_corrections(&response.corrections_text()));
    println!("{}", format_metadata(&response.metadata).bright_black());
    println!();
}

pub fn print_ingestion(report: &IngestionReport) {
    let summary = format_ingestion(report);
    let mut lines = summary.lines();
    if let Some(head) = lines.next() {
        let head = if report.successful() == report.results.len() {
            head.bright_green()
        } else {
            head.bright_yellow()
        };
        println!("{head}");
    }
    for line in lines {
        if line.contains("[failed]") {
            println!("{}", line.red());
        } else {
            println!("{line}");
        }
    }
}
