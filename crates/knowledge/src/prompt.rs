//! Prompt assembly for grounded generation.
//!
//! Templates use Handlebars syntax and must reference both `{{user_query}}`
//! and `{{retrieved_docs}}`. Values are inserted verbatim (no HTML escaping)
//! and are never re-parsed as template syntax.

use handlebars::Handlebars;
use ragsync_core::{AppError, AppResult};
use std::collections::HashMap;

pub const USER_QUERY_VAR: &str = "user_query";
pub const RETRIEVED_DOCS_VAR: &str = "retrieved_docs";

/// Template used when the request does not supply one.
pub const DEFAULT_TEMPLATE: &str = "You are a knowledgeable assistant. \
You have access to the following documents:\n\n\
{{retrieved_docs}}\n\n\
User question: {{user_query}}\n\
Please provide a helpful and concise answer based on the documents.";

/// A retrieved document placed into the prompt context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    pub key: String,
    pub content: String,
}

/// A validated prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Validate a caller-supplied template; `None` or blank selects the default.
    pub fn new(template: Option<&str>) -> AppResult<Self> {
        let source = match template {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Ok(Self::default()),
        };

        let missing: Vec<&str> = [USER_QUERY_VAR, RETRIEVED_DOCS_VAR]
            .into_iter()
            .filter(|var| !references(source, var))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "prompt_template must reference {}",
                missing
                    .iter()
                    .map(|v| format!("{{{{{}}}}}", v))
                    .collect::<Vec<_>>()
                    .join(" and ")
            )));
        }

        // Surface syntax errors at validation time rather than after retrieval.
        compile(source)?;

        Ok(Self {
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the final prompt for a query and its retrieved documents.
    pub fn render(&self, query: &str, documents: &[ContextDocument]) -> AppResult<String> {
        let handlebars = compile(&self.source)?;

        let mut variables = HashMap::new();
        variables.insert(USER_QUERY_VAR, query.to_string());
        variables.insert(RETRIEVED_DOCS_VAR, format_context(documents));

        handlebars
            .render("prompt", &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
    }
}

fn compile(source: &str) -> AppResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string("prompt", source)
        .map_err(|e| AppError::Config(format!("Invalid prompt_template: {}", e)))?;
    Ok(handlebars)
}

/// Whether `template` contains a `{{ var }}` expression.
fn references(template: &str, var: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return false;
        };
        if after[..end].trim().trim_start_matches('{').trim() == var {
            return true;
        }
        rest = &after[end + 2..];
    }
    false
}

/// Concatenate documents, tagging each with its ordinal and identity.
pub fn format_context(documents: &[ContextDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("[Doc{}] Key: {}\n{}\n\n", i, doc.key, doc.content))
        .collect()
}
