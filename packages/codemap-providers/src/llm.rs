use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use codemap_config::LlmProviderConfig;

/// Plain text answer of a chat completion.
pub async fn complete(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let json = chat(cfg, messages, false).await?;

	message_content(&json).map(|content| content.trim().to_string())
}

/// Chat completion whose answer must be a JSON document.
pub async fn complete_json(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let json = chat(cfg, messages, true).await?;

	parse_json_content(&json)
}

async fn chat(cfg: &LlmProviderConfig, messages: &[Value], json_mode: bool) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"messages": messages,
	});

	if json_mode {
		body["response_format"] = serde_json::json!({ "type": "json_object" });
	}

	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;

	crate::post_json(&client, &url, headers, &body).await
}

fn message_content(json: &Value) -> Result<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})
}

fn parse_json_content(json: &Value) -> Result<Value> {
	let content = message_content(json)?;
	let parsed: Value = serde_json::from_str(strip_code_fence(content)).map_err(|_| {
		Error::InvalidResponse {
			message: format!(
				"Completion content is not valid JSON: {}",
				crate::truncate_for_log(content)
			),
		}
	})?;

	Ok(parsed)
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner.strip_prefix("json").unwrap_or(inner);

	inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn completion(content: &str) -> Value {
		serde_json::json!({
			"choices": [
				{ "message": { "role": "assistant", "content": content } }
			]
		})
	}

	#[test]
	fn reads_choice_content_text() {
		let json = completion("Complete blood count");

		assert_eq!(message_content(&json).expect("parse failed"), "Complete blood count");
	}

	#[test]
	fn parses_choice_content_json() {
		let json = completion("{\"matches\": []}");
		let parsed = parse_json_content(&json).expect("parse failed");

		assert!(parsed.get("matches").is_some());
	}

	#[test]
	fn parses_fenced_json_content() {
		let json = completion("```json\n{\"matches\": [{\"option\": \"1\", \"reasoning\": \"r\"}]}\n```");
		let parsed = parse_json_content(&json).expect("parse failed");

		assert_eq!(parsed["matches"][0]["option"], "1");
	}

	#[test]
	fn rejects_prose_content() {
		let json = completion("The best match is 8480-6.");
		let err = parse_json_content(&json).expect_err("Expected invalid JSON error.");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn missing_choices_is_invalid() {
		let err = message_content(&serde_json::json!({})).expect_err("Expected missing content.");

		assert!(err.to_string().contains("missing message content"), "Unexpected error: {err}");
	}
}
