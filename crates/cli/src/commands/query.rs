//! Query command handler.

use super::{print_response, read_request};
use anyhow::{Context, Result};
use clap::Args;
use ragsync_knowledge::{handle_query, QueryOutcome, QueryRequest, Response, Services};
use std::path::PathBuf;

/// Answer a question from the indexed documents
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The question to ask
    pub query: Option<String>,

    /// JSON request file ("-" for stdin); flags override its fields
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Bucket holding the corpus, index and ledger
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key of the vector index blob
    #[arg(long)]
    pub index_key: Option<String>,

    /// Key of the metadata ledger blob
    #[arg(long)]
    pub metadata_key: Option<String>,

    /// Number of documents to retrieve (default: 3)
    #[arg(short = 'k', long)]
    pub top_k: Option<i64>,

    /// Prompt template file using {{user_query}} and {{retrieved_docs}}
    #[arg(long)]
    pub template_file: Option<PathBuf>,
}

impl QueryCommand {
    pub async fn execute(&self, services: &Services) -> Result<u16> {
        tracing::debug!("Query options: {:?}", self);

        let mut request = match &self.request {
            Some(path) => match read_request::<QueryRequest>(path)? {
                Ok(request) => request,
                Err(e) => return print_response(&Response::<QueryOutcome>::from_error(&e)),
            },
            None => QueryRequest::default(),
        };

        if self.query.is_some() {
            request.query = self.query.clone();
        }
        if self.bucket.is_some() {
            request.corpus_bucket = self.bucket.clone();
        }
        if self.index_key.is_some() {
            request.index_key = self.index_key.clone();
        }
        if self.metadata_key.is_some() {
            request.metadata_key = self.metadata_key.clone();
        }
        if self.top_k.is_some() {
            request.top_k = self.top_k;
        }
        if let Some(path) = &self.template_file {
            let template = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template file {}", path.display()))?;
            request.prompt_template = Some(template);
        }

        let response = handle_query(services, request).await;
        print_response(&response)
    }
}
