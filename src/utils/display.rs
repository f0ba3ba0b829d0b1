use crate::agents::messages::{RunOutcome, RunResult};
use crate::core::vector_store::FileStatus;
use crate::ingest::StatusSnapshot;
use crate::trace::TraceRecord;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_warning(text: &str) {
    println!("{}", text.yellow());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_run_result(result: &RunResult) {
    match &result.outcome {
        RunOutcome::Rejected { verdict } => {
            print_warning("Query declined by the guardrail.");
            if !verdict.reasoning.is_empty() {
                print_info(&format!("Reason: {}", verdict.reasoning));
            }
        }
        RunOutcome::Done {
            specialist, answer, ..
        } => {
            print_success(&format!("Answered by {}:", specialist));
            println!("\n{}\n", answer.text);
            if !answer.citations.is_empty() {
                println!("{}", "Sources:".bold());
                for citation in &answer.citations {
                    println!("  - {}", citation);
                }
            }
        }
    }
    print_info(&format!("Trace ID: {}", result.trace_id));
}

pub fn print_status(snapshot: &StatusSnapshot) {
    print_header(&format!("Vector store {}", snapshot.vector_store_id));

    if snapshot.is_empty() {
        print_warning("No files attached.");
        return;
    }

    for file in &snapshot.files {
        let status = match file.status {
            FileStatus::Completed => file.status.to_string().green(),
            FileStatus::InProgress => file.status.to_string().yellow(),
            FileStatus::Failed | FileStatus::Cancelled => file.status.to_string().red(),
            FileStatus::Unknown => file.status.to_string().normal(),
        };
        match &file.last_error {
            Some(error) => println!("  {}  {}  ({})", file.id, status, error.message),
            None => println!("  {}  {}", file.id, status),
        }
    }

    println!(
        "\n{} completed, {} in progress, {} failed",
        snapshot.count(FileStatus::Completed),
        snapshot.count(FileStatus::InProgress),
        snapshot.count(FileStatus::Failed) + snapshot.count(FileStatus::Cancelled)
    );
}

pub fn print_trace_summary(record: &TraceRecord) {
    let state = record
        .final_state()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let specialist = record
        .specialist
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{}  {}  {}  {}  {}",
        record.trace_id.bold(),
        record.started_at.format("%Y-%m-%d %H:%M:%S"),
        state,
        specialist,
        record.workflow_name
    );
}

pub fn print_trace(record: &TraceRecord) -> serde_json::Result<()> {
    print_header(&format!("Trace {}", record.trace_id));
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}
