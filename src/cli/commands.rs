use crate::trace::is_valid_trace_id;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docweb")]
#[command(author, version, about = "Guarded question answering over documents and the web", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question
    Ask {
        query: String,

        /// Workflow name recorded in the trace
        #[arg(short, long)]
        workflow: Option<String>,

        /// Use this trace id instead of generating one
        #[arg(long, value_parser = parse_trace_id)]
        trace_id: Option<String>,

        /// Keep query, answer and reasoning text out of the trace
        #[arg(long)]
        no_sensitive: bool,

        /// Log guardrail rejections instead of stopping the run
        #[arg(long)]
        advisory: bool,
    },

    /// Run a document query, a web query and an off-topic query
    Demo,

    /// Process queries from a file (one per line)
    Batch {
        file: String,

        #[arg(short, long, default_value = "5")]
        concurrency: usize,
    },

    /// Upload a document into a new vector store
    Ingest {
        /// Document to upload (default: ingestion.default_file)
        file: Option<PathBuf>,

        /// Vector store name (default: ingestion.store_name)
        #[arg(short, long)]
        name: Option<String>,

        /// Only list processing status of an existing vector store
        #[arg(long, value_name = "VECTOR_STORE_ID", conflicts_with_all = ["file", "name"])]
        check_only: Option<String>,
    },

    /// Show stored traces, or one trace in full
    Traces {
        #[arg(value_parser = parse_trace_id)]
        trace_id: Option<String>,
    },
}

fn parse_trace_id(value: &str) -> Result<String, String> {
    if is_valid_trace_id(value) {
        Ok(value.to_string())
    } else {
        Err("trace ids may only contain letters, digits, '-' and '_'".to_string())
    }
}
