//! Command handlers for the ragsync CLI.
//!
//! Every command builds a request, runs it through the matching handler and
//! prints the JSON response on stdout. The returned status code decides the
//! process exit status.

pub mod query;
pub mod stats;
pub mod sync;

pub use query::QueryCommand;
pub use stats::StatsCommand;
pub use sync::SyncCommand;

use anyhow::{Context, Result};
use ragsync_knowledge::{parse_request, Response};
use ragsync_core::AppResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Read a JSON request body from a file, or from stdin when the path is `-`.
///
/// I/O failures are CLI errors; a malformed body becomes a 400 response.
pub fn read_request<T: DeserializeOwned>(path: &Path) -> Result<AppResult<T>> {
    let body = if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request from stdin")?;
        body
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?
    };
    Ok(parse_request(&body))
}

/// Print the response as pretty JSON and return its status code.
pub fn print_response<T: Serialize>(response: &Response<T>) -> Result<u16> {
    let json = serde_json::to_string_pretty(response).context("Failed to encode response")?;
    println!("{}", json);
    Ok(response.status_code)
}
