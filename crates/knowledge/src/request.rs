//! Invocation request and response types.
//!
//! Requests arrive as loosely-filled JSON objects. They deserialize into the
//! `*Request` structs (every field optional) and are then validated into
//! typed parameters; validation names every missing field at once.
//! Responses carry a `statusCode` plus either a success body or `error`.

use ragsync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Region hint used when a sync request does not name one.
pub const DEFAULT_EMBEDDING_REGION: &str = "ap-northeast-1";

/// Number of documents retrieved when a query does not say.
pub const DEFAULT_TOP_K: usize = 3;

/// Raw synchronization request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default, alias = "s3_bucket")]
    pub corpus_bucket: Option<String>,

    #[serde(default, alias = "s3_folder_prefix")]
    pub corpus_prefix: Option<String>,

    #[serde(default, alias = "s3_index_key")]
    pub index_key: Option<String>,

    #[serde(default, alias = "bedrock_region")]
    pub embedding_region: Option<String>,

    #[serde(default)]
    pub metadata_key: Option<String>,
}

/// Validated synchronization parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncParams {
    pub corpus_bucket: String,
    pub corpus_prefix: String,
    pub index_key: String,
    pub embedding_region: String,
    pub metadata_key: String,
}

impl SyncRequest {
    pub fn validate(self) -> AppResult<SyncParams> {
        let mut missing = Vec::new();
        let corpus_bucket = required(self.corpus_bucket, "corpus_bucket", &mut missing);
        let index_key = required(self.index_key, "index_key", &mut missing);
        let metadata_key = required(self.metadata_key, "metadata_key", &mut missing);
        reject_missing(&missing)?;

        if index_key == metadata_key {
            return Err(AppError::Config(
                "index_key and metadata_key must name different objects".to_string(),
            ));
        }

        Ok(SyncParams {
            corpus_bucket,
            corpus_prefix: self.corpus_prefix.unwrap_or_default(),
            index_key,
            embedding_region: self
                .embedding_region
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EMBEDDING_REGION.to_string()),
            metadata_key,
        })
    }
}

/// Raw query request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default, alias = "s3_bucket")]
    pub corpus_bucket: Option<String>,

    #[serde(default, alias = "s3_index_key")]
    pub index_key: Option<String>,

    #[serde(default)]
    pub metadata_key: Option<String>,

    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub top_k: Option<i64>,

    #[serde(default)]
    pub prompt_template: Option<String>,
}

/// Validated query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub corpus_bucket: String,
    pub index_key: String,
    pub metadata_key: String,
    pub query: String,
    pub top_k: usize,
    pub prompt_template: Option<String>,
}

impl QueryRequest {
    pub fn validate(self) -> AppResult<QueryParams> {
        let mut missing = Vec::new();
        let corpus_bucket = required(self.corpus_bucket, "corpus_bucket", &mut missing);
        let index_key = required(self.index_key, "index_key", &mut missing);
        let metadata_key = required(self.metadata_key, "metadata_key", &mut missing);
        let query = required(self.query, "query", &mut missing);
        reject_missing(&missing)?;

        let top_k = match self.top_k {
            None => DEFAULT_TOP_K,
            Some(k) if k >= 1 => k as usize,
            Some(k) => {
                return Err(AppError::Config(format!(
                    "top_k must be at least 1, got {}",
                    k
                )))
            }
        };

        Ok(QueryParams {
            corpus_bucket,
            index_key,
            metadata_key,
            query,
            top_k,
            prompt_template: self.prompt_template,
        })
    }
}

/// Raw stats request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    #[serde(default, alias = "s3_bucket")]
    pub corpus_bucket: Option<String>,

    #[serde(default, alias = "s3_index_key")]
    pub index_key: Option<String>,

    #[serde(default)]
    pub metadata_key: Option<String>,
}

/// Validated stats parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsParams {
    pub corpus_bucket: String,
    pub index_key: String,
    pub metadata_key: String,
}

impl StatsRequest {
    pub fn validate(self) -> AppResult<StatsParams> {
        let mut missing = Vec::new();
        let corpus_bucket = required(self.corpus_bucket, "corpus_bucket", &mut missing);
        let index_key = required(self.index_key, "index_key", &mut missing);
        let metadata_key = required(self.metadata_key, "metadata_key", &mut missing);
        reject_missing(&missing)?;
        Ok(StatsParams {
            corpus_bucket,
            index_key,
            metadata_key,
        })
    }
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn reject_missing(missing: &[&str]) -> AppResult<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Missing required parameter: {}",
            missing.join(", ")
        )))
    }
}

/// Result of a synchronization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_new_embeddings: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_pruned: Option<usize>,
}

impl SyncOutcome {
    /// Run stopped before any write.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            index_key: None,
            metadata_key: None,
            num_new_embeddings: None,
            num_pruned: None,
        }
    }
}

/// Result of a query run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: String,

    /// Document identities, nearest first
    pub retrieved_doc_keys: Vec<String>,

    pub answer: String,
}

/// Response body: the operation's result or an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody<T> {
    Ok(T),
    Error { error: String },
}

/// Structured response returned from an invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    #[serde(flatten)]
    pub body: ResponseBody<T>,
}

impl<T> Response<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody::Ok(body),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self {
            status_code: err.status_code(),
            body: ResponseBody::Error {
                error: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code < 400
    }

    /// The success body, if any.
    pub fn ok_body(&self) -> Option<&T> {
        match &self.body {
            ResponseBody::Ok(body) => Some(body),
            ResponseBody::Error { .. } => None,
        }
    }

    /// The error message, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Ok(_) => None,
            ResponseBody::Error { error } => Some(error),
        }
    }
}

pub type SyncResponse = Response<SyncOutcome>;
pub type QueryResponse = Response<QueryOutcome>;
