//! Retrieval-augmented query pipeline.
//!
//! Embeds the query, searches the vector index, maps rows back to document
//! identities through the ledger sequence, fetches their content and asks
//! the generation provider for an answer grounded in it.

use crate::embeddings::EmbeddingProvider;
use crate::flat_index::FlatL2Index;
use crate::ledger::Ledger;
use crate::prompt::{ContextDocument, PromptTemplate};
use crate::request::{QueryOutcome, QueryParams};
use crate::store::{location, DocumentStore};
use crate::vector_index::VectorIndex;
use ragsync_core::{AppError, AppResult, GenerationSettings};
use ragsync_llm::{ChatMessage, LlmClient, LlmRequest};
use serde::Serialize;
use std::sync::Arc;

/// Answer returned when the generation provider fails.
pub const GENERATION_FAILED_ANSWER: &str = "Error generating text.";

/// A search hit resolved to a document identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub key: String,
    pub row: usize,
    pub distance: f32,
}

/// Full result of a query, including distances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub query: String,
    pub documents: Vec<RetrievedDocument>,
    pub answer: String,
}

impl QueryAnswer {
    pub fn into_outcome(self) -> QueryOutcome {
        QueryOutcome {
            query: self.query,
            retrieved_doc_keys: self.documents.into_iter().map(|d| d.key).collect(),
            answer: self.answer,
        }
    }
}

/// Answers free-text queries against one namespace.
pub struct QueryEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    generation: GenerationSettings,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        generation: GenerationSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            generation,
        }
    }

    pub async fn query(&self, params: &QueryParams) -> AppResult<QueryAnswer> {
        // A bad template is the caller's fault; reject it before any work.
        let template = PromptTemplate::new(params.prompt_template.as_deref())?;

        tracing::info!(
            top_k = params.top_k,
            "Querying {} with: {}",
            location(&params.corpus_bucket, &params.index_key),
            params.query
        );

        let documents = self.retrieve(params).await?;
        let context = self
            .fetch_documents(&params.corpus_bucket, &documents)
            .await;

        let prompt = template.render(&params.query, &context)?;
        let answer = self.generate(prompt).await;

        Ok(QueryAnswer {
            query: params.query.clone(),
            documents,
            answer,
        })
    }

    /// Search the index and resolve hits to document identities, nearest first.
    pub async fn retrieve(&self, params: &QueryParams) -> AppResult<Vec<RetrievedDocument>> {
        let bucket = params.corpus_bucket.as_str();
        let index = FlatL2Index::load(self.store.as_ref(), bucket, &params.index_key).await?;

        let query_embedding = self.embedder.embed(&params.query).await.map_err(|e| {
            tracing::error!("Error embedding query: {}", e);
            e
        })?;

        let hits = index.search(&query_embedding.vector, params.top_k)?;
        tracing::debug!(?hits, "Vector search done");

        let ledger = Ledger::load(self.store.as_ref(), bucket, &params.metadata_key).await?;
        if ledger.embedded_files_sequence.is_empty() {
            return Err(AppError::Ledger(format!(
                "No embedded_files_sequence in {}; cannot map index rows to documents",
                location(bucket, &params.metadata_key)
            )));
        }

        let sequence_len = ledger.embedded_files_sequence.len();
        let documents = hits
            .into_iter()
            .filter_map(|hit| match ledger.resolve(hit.row) {
                Some(key) => Some(RetrievedDocument {
                    key: key.to_string(),
                    row: hit.row,
                    distance: hit.distance,
                }),
                None => {
                    tracing::warn!(
                        "Row {} out of range for embedded_files_sequence (len={})",
                        hit.row,
                        sequence_len
                    );
                    None
                }
            })
            .collect();
        Ok(documents)
    }

    async fn fetch_documents(
        &self,
        bucket: &str,
        documents: &[RetrievedDocument],
    ) -> Vec<ContextDocument> {
        let mut context = Vec::with_capacity(documents.len());
        for doc in documents {
            match self.store.read_text(bucket, &doc.key).await {
                Ok(content) => context.push(ContextDocument {
                    key: doc.key.clone(),
                    content,
                }),
                Err(e) => tracing::error!(key = %doc.key, "Error fetching document: {}", e),
            }
        }
        context
    }

    async fn generate(&self, prompt: String) -> String {
        let mut request = LlmRequest::new(vec![ChatMessage::user(prompt)], &self.generation.model);
        if let Some(max_tokens) = self.generation.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.generation.temperature {
            request = request.with_temperature(temperature);
        }

        match self.llm.complete(&request).await {
            Ok(response) => {
                tracing::info!(
                    provider = self.llm.provider_name(),
                    completion_tokens = response.usage.completion_tokens,
                    "Generated answer"
                );
                response.content
            }
            Err(e) => {
                tracing::error!("Error during text generation: {}", e);
                GENERATION_FAILED_ANSWER.to_string()
            }
        }
    }
}
