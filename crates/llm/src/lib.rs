//! Generation provider crate for ragsync.
//!
//! Provides a provider-agnostic abstraction over text-generation models. The
//! query engine only sees [`LlmClient`]; which model answers is decided by
//! configuration through [`create_client`].
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (`/api/chat`)
//! - **OpenAI**: Any OpenAI-compatible `/chat/completions` endpoint
//!
//! # Example
//! ```no_run
//! use ragsync_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::{ChatMessage, ProviderType, Role};
