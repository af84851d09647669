//! Tools the assistant (and the CLI) can invoke against the catalog.
//!
//! Two built-ins are exposed: `get_summary_by_title`, the verbatim
//! summary lookup, and `search_books`, the retriever's three-tier
//! resolution. Each tool declares an OpenAI function-calling JSON
//! Schema so the assistant layer can offer them to the model; the CLI
//! calls the same [`ToolContext`] methods directly.
//!
//! `get_summary_by_title` is the verbatim-text boundary of the whole
//! system: whatever it returns is a direct copy of the stored summary,
//! never generated, truncated, or paraphrased.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::retriever::{RetrievalResult, Retriever};

/// A resolved title and its verbatim stored summary.
#[derive(Debug, Clone)]
pub struct SummaryHit {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, thiserror::Error)]
#[error("no catalog title matches '{query}'")]
pub struct NoMatch {
    pub query: String,
}

/// Bridge handed to tools at execution time.
///
/// All methods delegate to the shared [`Retriever`], so tools see
/// exactly the same catalog snapshot as the CLI.
pub struct ToolContext {
    retriever: Arc<Retriever>,
}

impl ToolContext {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    /// Resolve a (possibly misspelled) title to its stored summary.
    ///
    /// Tries exact match first, then the best fuzzy candidate at the
    /// configured threshold, so slightly wrong input still lands on the
    /// right record. Fails with [`NoMatch`] only when nothing clears
    /// the threshold.
    pub fn summary_by_title(&self, title: &str) -> Result<SummaryHit, NoMatch> {
        let matcher = self.retriever.matcher();

        if let Some(record) = matcher.exact_match(title) {
            return Ok(SummaryHit {
                title: record.title.clone(),
                summary: record.summary.clone(),
            });
        }

        let threshold = self.retriever.matching().fuzzy_threshold;
        matcher
            .fuzzy_match(title, 1, threshold)
            .first()
            .map(|(record, _)| SummaryHit {
                title: record.title.clone(),
                summary: record.summary.clone(),
            })
            .ok_or_else(|| NoMatch {
                query: title.to_string(),
            })
    }

    /// Run the full three-tier resolution.
    pub async fn search_books(&self, query: &str) -> RetrievalResult {
        self.retriever.resolve(query).await
    }
}

/// A tool the assistant can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to the model (lowercase, underscores).
    fn name(&self) -> &str;

    /// One-line description used for tool selection.
    fn description(&self) -> &str;

    /// OpenAI function-calling JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with validated parameters (always a JSON object).
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Built-in verbatim summary lookup.
pub struct GetSummaryTool;

#[async_trait]
impl Tool for GetSummaryTool {
    fn name(&self) -> &str {
        "get_summary_by_title"
    }

    fn description(&self) -> &str {
        "Return the exact stored summary for a book title from the catalog"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Book title, typos tolerated" }
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let title = params["title"].as_str().unwrap_or("");
        if title.trim().is_empty() {
            anyhow::bail!("title must not be empty");
        }

        match ctx.summary_by_title(title) {
            Ok(hit) => Ok(serde_json::json!({
                "found": true,
                "title": hit.title,
                "summary": hit.summary,
            })),
            Err(e) => Ok(serde_json::json!({
                "found": false,
                "message": e.to_string(),
            })),
        }
    }
}

/// Built-in catalog search over all three retrieval tiers.
pub struct SearchBooksTool;

#[async_trait]
impl Tool for SearchBooksTool {
    fn name(&self) -> &str {
        "search_books"
    }

    fn description(&self) -> &str {
        "Search the catalog by title or theme and return ranked candidate titles"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text request (title or theme)" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            anyhow::bail!("query must not be empty");
        }

        let result = ctx.search_books(query).await;

        Ok(match result {
            RetrievalResult::Exact(record) => serde_json::json!({
                "match_type": "exact",
                "candidates": [{ "title": record.title, "themes": record.themes }],
            }),
            RetrievalResult::Fuzzy(candidates) => serde_json::json!({
                "match_type": "fuzzy",
                "candidates": candidates.iter().map(|c| serde_json::json!({
                    "title": c.record.title,
                    "score": c.score,
                    "themes": c.record.themes,
                })).collect::<Vec<_>>(),
            }),
            RetrievalResult::Semantic(candidates) => serde_json::json!({
                "match_type": "semantic",
                "candidates": candidates.iter().map(|c| serde_json::json!({
                    "title": c.record.title,
                    "distance": c.distance,
                    "themes": c.record.themes,
                })).collect::<Vec<_>>(),
            }),
            RetrievalResult::Empty => serde_json::json!({
                "match_type": "none",
                "candidates": [],
            }),
        })
    }
}

/// Registry of tools offered to the assistant.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the two built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GetSummaryTool));
        registry.register(Box::new(SearchBooksTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Declarations in the shape the chat completions API expects.
    pub fn openai_declarations(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters_schema(),
                    }
                })
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BookRecord, Catalog};
    use crate::config::MatchingConfig;

    fn context() -> ToolContext {
        let catalog = Arc::new(Catalog::from_records(vec![
            BookRecord {
                id: 0,
                title: "Dune".to_string(),
                summary: "A desert planet...".to_string(),
                themes: vec!["politics".to_string()],
            },
            BookRecord {
                id: 1,
                title: "The Hobbit".to_string(),
                summary: "A reluctant burglar far from home.".to_string(),
                themes: vec![],
            },
        ]));
        let retriever = Arc::new(Retriever::new(catalog, MatchingConfig::default(), None));
        ToolContext::new(retriever)
    }

    #[test]
    fn test_summary_by_title_exact_is_verbatim() {
        let ctx = context();
        let hit = ctx.summary_by_title("dune").unwrap();
        assert_eq!(hit.title, "Dune");
        assert_eq!(hit.summary, "A desert planet...");
    }

    #[test]
    fn test_summary_by_title_tolerates_typos() {
        let ctx = context();
        let hit = ctx.summary_by_title("Dyun").unwrap();
        assert_eq!(hit.title, "Dune");
        assert_eq!(hit.summary, "A desert planet...");
    }

    #[test]
    fn test_summary_by_title_no_match() {
        let ctx = context();
        let err = ctx.summary_by_title("a book about sandworms").unwrap_err();
        assert_eq!(err.query, "a book about sandworms");
    }

    #[tokio::test]
    async fn test_get_summary_tool_execute() {
        let ctx = context();
        let tool = GetSummaryTool;

        let out = tool
            .execute(serde_json::json!({"title": "the hobbit"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["found"], true);
        assert_eq!(out["summary"], "A reluctant burglar far from home.");

        let out = tool
            .execute(serde_json::json!({"title": "zzzzzz"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["found"], false);
    }

    #[tokio::test]
    async fn test_get_summary_tool_rejects_empty_title() {
        let ctx = context();
        let tool = GetSummaryTool;
        assert!(tool
            .execute(serde_json::json!({"title": "  "}), &ctx)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_search_tool_reports_match_type() {
        let ctx = context();
        let tool = SearchBooksTool;

        let out = tool
            .execute(serde_json::json!({"query": "Dune"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["match_type"], "exact");
        assert_eq!(out["candidates"][0]["title"], "Dune");

        let out = tool
            .execute(serde_json::json!({"query": "completely unrelated words"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["match_type"], "none");
    }

    #[test]
    fn test_registry_builtins_and_declarations() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.tools().len(), 2);
        assert!(registry.find("get_summary_by_title").is_some());
        assert!(registry.find("search_books").is_some());
        assert!(registry.find("unknown").is_none());

        let decls = registry.openai_declarations();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0]["type"], "function");
        assert!(decls[0]["function"]["parameters"]["properties"].is_object());
    }
}
