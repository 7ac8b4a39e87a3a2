//! Stats command handler.
//!
//! Reports ledger and index sizes for a namespace and whether they agree.

use super::print_response;
use anyhow::Result;
use clap::Args;
use ragsync_knowledge::{handle_stats, Services, StatsRequest};

/// Show ledger and index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Bucket holding the index and ledger
    #[arg(long)]
    pub bucket: String,

    /// Key of the vector index blob
    #[arg(long)]
    pub index_key: String,

    /// Key of the metadata ledger blob
    #[arg(long)]
    pub metadata_key: String,
}

impl StatsCommand {
    pub async fn execute(&self, services: &Services) -> Result<u16> {
        let request = StatsRequest {
            corpus_bucket: Some(self.bucket.clone()),
            index_key: Some(self.index_key.clone()),
            metadata_key: Some(self.metadata_key.clone()),
        };
        let response = handle_stats(services, request).await;
        print_response(&response)
    }
}
