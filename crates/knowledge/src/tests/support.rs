//! Deterministic stand-ins for the embedding and generation providers.

use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::handler::Services;
use crate::request::{QueryRequest, SyncParams, SyncRequest};
use crate::store::MemoryStore;
use ragsync_core::{AppError, AppResult, GenerationSettings};
use ragsync_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BUCKET: &str = "corpus";
pub const PREFIX: &str = "docs/";
pub const INDEX_KEY: &str = "index/vectors.bin";
pub const METADATA_KEY: &str = "index/ledger.json";

pub const TOKYO: (&str, &str) = ("docs/tokyo.txt", "Tokyo is the capital of Japan.");
pub const PARIS: (&str, &str) = ("docs/paris.txt", "Paris is the capital of France.");
pub const RUST: (&str, &str) = ("docs/rust.txt", "Rust is a systems programming language.");

pub const JAPAN_QUERY: &str = "What is the capital of Japan?";

/// Embedder returning fixed vectors per text.
#[derive(Debug, Default)]
pub struct StubEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embedder knowing the three sample documents and the Japan query.
    pub fn sample() -> Self {
        let embedder = Self::new();
        embedder.set(TOKYO.1, vec![1.0, 0.0, 0.0]);
        embedder.set(PARIS.1, vec![0.0, 1.0, 0.0]);
        embedder.set(RUST.1, vec![0.0, 0.0, 1.0]);
        embedder.set(JAPAN_QUERY, vec![0.9, 0.4, 0.0]);
        embedder
    }

    pub fn set(&self, text: &str, vector: Vec<f32>) {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn recover(&self, text: &str) {
        self.failing.lock().unwrap().remove(text);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model_name(&self) -> &str {
        "stub-v1"
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, text: &str) -> AppResult<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(text) {
            return Err(AppError::Embedding("stub outage".to_string()));
        }
        let vector = self
            .vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| AppError::Embedding(format!("no stub vector for {:?}", text)))?;
        Ok(Embedding::new(vector, text.split_whitespace().count() as u32))
    }
}

/// Generation client that echoes the prompt it was given.
#[derive(Debug, Default)]
pub struct EchoLlm {
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl EchoLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for EchoLlm {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.fail {
            return Err(AppError::Llm("model unavailable".to_string()));
        }
        Ok(LlmResponse {
            content: format!("Answer drawn from:\n{}", prompt),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

/// Store seeded with the three sample documents and a folder marker.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert(BUCKET, PREFIX, Vec::new());
    for (key, text) in [TOKYO, PARIS, RUST] {
        store.insert(BUCKET, key, text);
    }
    store
}

pub fn sync_params() -> SyncParams {
    sync_request().validate().unwrap()
}

pub fn sync_request() -> SyncRequest {
    SyncRequest {
        corpus_bucket: Some(BUCKET.to_string()),
        corpus_prefix: Some(PREFIX.to_string()),
        index_key: Some(INDEX_KEY.to_string()),
        embedding_region: None,
        metadata_key: Some(METADATA_KEY.to_string()),
    }
}

pub fn query_request(query: &str, top_k: i64) -> QueryRequest {
    QueryRequest {
        corpus_bucket: Some(BUCKET.to_string()),
        index_key: Some(INDEX_KEY.to_string()),
        metadata_key: Some(METADATA_KEY.to_string()),
        query: Some(query.to_string()),
        top_k: Some(top_k),
        prompt_template: None,
    }
}

pub fn services(
    store: Arc<MemoryStore>,
    embedder: Arc<StubEmbedder>,
    llm: Arc<EchoLlm>,
) -> Services {
    Services {
        store,
        embedder,
        llm,
        generation: GenerationSettings::default(),
        concurrency: 2,
    }
}
