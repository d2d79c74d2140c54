use anyhow::Result;
use doctree_core::{Node, TreeReport};
use doctree_store::DocumentSummary;
use serde::Serialize;
use std::io::{self, Write};

/// Write one line to stdout, treating a closed pipe as success.
pub(crate) fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

#[derive(Debug, Serialize)]
pub(crate) struct SplitOutput {
    pub document_id: String,
    pub document_name: String,
    pub document_type: String,
    pub chunk_count: usize,
    pub chunks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BuildOutput {
    pub document_id: String,
    pub document_name: String,
    pub document_type: String,
    pub inference_mode: &'static str,
    pub chunk_count: usize,
    pub node_count: usize,
    pub depth: usize,
    pub tier_sizes: Vec<usize>,
    pub root_summary: String,
    pub root_keywords: Vec<String>,
    /// `None` for dry runs.
    pub stored_at: Option<String>,
    pub elapsed_ms: u128,
}

/// `build` over a directory: one entry per document, in path order.
#[derive(Debug, Serialize)]
pub(crate) struct BatchBuildOutput {
    pub root: String,
    pub document_count: usize,
    pub documents: Vec<BuildOutput>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
pub(crate) struct InspectOutput {
    pub document_id: String,
    pub document_name: String,
    pub report: TreeReport,
    pub root_summary: String,
    pub root_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListOutput {
    pub documents: Vec<DocumentSummary>,
}
