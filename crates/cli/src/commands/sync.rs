//! Sync command handler.

use super::{print_response, read_request};
use anyhow::Result;
use clap::Args;
use ragsync_knowledge::{handle_sync, Response, Services, SyncOutcome, SyncRequest};
use std::path::PathBuf;

/// Embed new documents and prune removed ones
#[derive(Args, Debug)]
pub struct SyncCommand {
    /// JSON request file ("-" for stdin); flags override its fields
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Bucket holding the corpus, index and ledger
    #[arg(long)]
    pub bucket: Option<String>,

    /// Only documents whose key starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Key of the vector index blob
    #[arg(long)]
    pub index_key: Option<String>,

    /// Key of the metadata ledger blob
    #[arg(long)]
    pub metadata_key: Option<String>,

    /// Region hint for the embedding provider
    #[arg(long)]
    pub region: Option<String>,
}

impl SyncCommand {
    pub async fn execute(&self, services: &Services) -> Result<u16> {
        tracing::debug!("Sync options: {:?}", self);

        let mut request = match &self.request {
            Some(path) => match read_request::<SyncRequest>(path)? {
                Ok(request) => request,
                Err(e) => return print_response(&Response::<SyncOutcome>::from_error(&e)),
            },
            None => SyncRequest::default(),
        };

        if self.bucket.is_some() {
            request.corpus_bucket = self.bucket.clone();
        }
        if self.prefix.is_some() {
            request.corpus_prefix = self.prefix.clone();
        }
        if self.index_key.is_some() {
            request.index_key = self.index_key.clone();
        }
        if self.metadata_key.is_some() {
            request.metadata_key = self.metadata_key.clone();
        }
        if self.region.is_some() {
            request.embedding_region = self.region.clone();
        }

        let response = handle_sync(services, request).await;
        print_response(&response)
    }
}
