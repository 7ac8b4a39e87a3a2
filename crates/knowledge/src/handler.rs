//! Invocation boundary.
//!
//! Each handler runs one sync, query or stats invocation inside its own
//! tracing span, validates the request and turns every failure into a
//! `{statusCode, error}` response. Nothing here panics or returns `Err`.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::query::QueryEngine;
use crate::request::{
    QueryOutcome, QueryRequest, QueryResponse, Response, StatsRequest, SyncOutcome, SyncRequest,
    SyncResponse,
};
use crate::stats::{collect_stats, IndexStats};
use crate::store::{DocumentStore, FsStore};
use crate::sync::IndexSynchronizer;
use ragsync_core::logging::invocation_span;
use ragsync_core::{AppConfig, AppError, AppResult, GenerationSettings};
use ragsync_llm::{create_client, LlmClient};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::Instrument;

pub type StatsResponse = Response<IndexStats>;

/// Everything an invocation needs, built once per process.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmClient>,
    pub generation: GenerationSettings,
    pub concurrency: usize,
}

impl Services {
    /// Wire the filesystem store and the configured providers.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let embedding_key = AppConfig::resolve_api_key(config.embedding.api_key_env.as_deref());
        let embedder = create_provider(&config.embedding, embedding_key.as_deref())?;

        let generation_key = AppConfig::resolve_api_key(config.generation.api_key_env.as_deref());
        let llm = create_client(
            &config.generation.provider,
            config.generation.endpoint.as_deref(),
            generation_key.as_deref(),
        )
        .map_err(|e| AppError::Config(format!("Failed to create generation client: {}", e)))?;

        tracing::debug!(
            store_root = %config.store_root.display(),
            embedding = %config.embedding.provider,
            generation = %config.generation.provider,
            "Services ready"
        );

        Ok(Self {
            store: Arc::new(FsStore::new(config.store_root.clone())),
            embedder,
            llm,
            generation: config.generation.clone(),
            concurrency: config.embedding.concurrency,
        })
    }
}

/// Decode a JSON request body; malformed input is a configuration error.
pub fn parse_request<T: DeserializeOwned>(json: &str) -> AppResult<T> {
    serde_json::from_str(json).map_err(|e| AppError::Config(format!("Invalid request: {}", e)))
}

fn new_invocation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn respond<T>(result: AppResult<T>, span: &tracing::Span) -> Response<T> {
    match result {
        Ok(body) => Response::ok(body),
        Err(e) => {
            span.in_scope(|| tracing::error!(status = e.status_code(), "{}", e));
            Response::from_error(&e)
        }
    }
}

pub async fn handle_sync(services: &Services, request: SyncRequest) -> SyncResponse {
    let span = invocation_span("sync", &new_invocation_id());
    respond(run_sync(services, request).instrument(span.clone()).await, &span)
}

pub async fn handle_query(services: &Services, request: QueryRequest) -> QueryResponse {
    let span = invocation_span("query", &new_invocation_id());
    respond(run_query(services, request).instrument(span.clone()).await, &span)
}

pub async fn handle_stats(services: &Services, request: StatsRequest) -> StatsResponse {
    let span = invocation_span("stats", &new_invocation_id());
    respond(run_stats(services, request).instrument(span.clone()).await, &span)
}

async fn run_sync(services: &Services, request: SyncRequest) -> AppResult<SyncOutcome> {
    let params = request.validate()?;
    IndexSynchronizer::new(services.store.clone(), services.embedder.clone())
        .with_concurrency(services.concurrency)
        .sync(&params)
        .await
}

async fn run_query(services: &Services, request: QueryRequest) -> AppResult<QueryOutcome> {
    let params = request.validate()?;
    let engine = QueryEngine::new(
        services.store.clone(),
        services.embedder.clone(),
        services.llm.clone(),
        services.generation.clone(),
    );
    Ok(engine.query(&params).await?.into_outcome())
}

async fn run_stats(services: &Services, request: StatsRequest) -> AppResult<IndexStats> {
    let params = request.validate()?;
    collect_stats(services.store.as_ref(), &params).await
}
