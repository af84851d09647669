//! Optional reasoning layer over the retrieval tools.
//!
//! When `assistant.provider = "openai"`, semantic candidates are handed
//! to a chat model together with the tool declarations from the
//! [`ToolRegistry`]. The model may call `search_books` and
//! `get_summary_by_title`; tool results are fed back until it produces
//! a final text reply (bounded by `max_tool_rounds`). The summaries the
//! user sees still come from the verbatim tool path, never from the
//! model.
//!
//! Uses the same retry strategy as the embedding backends: 429/5xx and
//! network errors retry with exponential backoff, other 4xx fail fast.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::AssistantConfig;
use crate::matcher;
use crate::tools::{ToolContext, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are Smart Librarian. Recommend exactly ONE book title from this \
catalog for the user's request. Use the search_books tool to find candidates and never invent \
titles that the tools did not return. Fetch the stored summary with get_summary_by_title and \
quote it verbatim. Reply with the chosen title on the first line, then a short reasoning, then \
the summary.";

/// Run one assisted query: returns the model's final text reply.
pub async fn run_assistant(
    config: &AssistantConfig,
    registry: &ToolRegistry,
    ctx: &ToolContext,
    user_query: &str,
) -> Result<String> {
    let model = config
        .model
        .as_ref()
        .context("assistant.model required for OpenAI provider")?;
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut messages = vec![
        json!({"role": "system", "content": SYSTEM_PROMPT}),
        json!({"role": "user", "content": user_query}),
    ];

    for _ in 0..config.max_tool_rounds {
        let body = json!({
            "model": model,
            "temperature": config.temperature,
            "messages": messages,
            "tools": registry.openai_declarations(),
            "tool_choice": "auto",
        });

        let response = post_chat(&client, &api_key, &body, config.max_retries).await?;

        let message = response["choices"][0]["message"].clone();
        if message.is_null() {
            bail!("invalid chat response: missing message");
        }

        let tool_calls = message["tool_calls"].as_array().cloned().unwrap_or_default();

        if tool_calls.is_empty() {
            let content = message["content"].as_str().unwrap_or("").trim().to_string();
            if content.is_empty() {
                bail!("assistant returned an empty reply");
            }
            return Ok(content);
        }

        messages.push(message);

        for call in &tool_calls {
            let id = call["id"].as_str().unwrap_or_default();
            let name = call["function"]["name"].as_str().unwrap_or_default();
            let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
            let args: Value = serde_json::from_str(raw_args).unwrap_or_else(|_| json!({}));

            tracing::debug!("assistant tool call: {}({})", name, raw_args);

            let result = match registry.find(name) {
                Some(tool) => match tool.execute(args, ctx).await {
                    Ok(value) => value,
                    Err(e) => json!({"error": e.to_string()}),
                },
                None => json!({"error": format!("unknown tool: {}", name)}),
            };

            messages.push(json!({
                "role": "tool",
                "tool_call_id": id,
                "content": result.to_string(),
            }));
        }
    }

    bail!(
        "assistant exceeded {} tool rounds without a final reply",
        config.max_tool_rounds
    )
}

/// Pick which candidate title a reply refers to.
///
/// Returns the index of the first candidate whose normalized title
/// appears in the reply, falling back to the top-ranked candidate.
/// `None` only when there are no candidates at all.
pub fn choose_title(reply: &str, titles: &[String]) -> Option<usize> {
    if titles.is_empty() {
        return None;
    }
    let reply_norm = matcher::normalize(reply);
    titles
        .iter()
        .position(|title| reply_norm.contains(&matcher::normalize(title)))
        .or(Some(0))
}

/// Call the chat completions endpoint with retry/backoff.
async fn post_chat(
    client: &reqwest::Client,
    api_key: &str,
    body: &Value,
    max_retries: u32,
) -> Result<Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "OpenAI API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("chat request failed after retries")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles() -> Vec<String> {
        vec![
            "Dune".to_string(),
            "The Hobbit".to_string(),
            "1984".to_string(),
        ]
    }

    #[test]
    fn test_choose_title_finds_mentioned_candidate() {
        let reply = "I recommend The Hobbit because it is a gentle adventure.";
        assert_eq!(choose_title(reply, &titles()), Some(1));
    }

    #[test]
    fn test_choose_title_is_case_insensitive() {
        let reply = "my pick: DUNE, a spice epic";
        assert_eq!(choose_title(reply, &titles()), Some(0));
    }

    #[test]
    fn test_choose_title_falls_back_to_top_candidate() {
        let reply = "None of these really fit, sorry.";
        assert_eq!(choose_title(reply, &titles()), Some(0));
    }

    #[test]
    fn test_choose_title_empty_candidates() {
        assert_eq!(choose_title("anything", &[]), None);
    }
}
