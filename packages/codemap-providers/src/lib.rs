pub mod embedding;
pub mod llm;

mod error;

pub use error::{Error, Result};

use reqwest::{
	Client, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

const THROTTLING_MARKER: &str = "ThrottlingException";
const LOG_BODY_CHARS: usize = 300;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Throttling is signalled by HTTP 429 or by a gateway body naming `ThrottlingException`.
pub fn is_throttling(status: StatusCode, body: &str) -> bool {
	status == StatusCode::TOO_MANY_REQUESTS || body.contains(THROTTLING_MARKER)
}

pub fn truncate_for_log(text: &str) -> String {
	let trimmed = text.trim();

	match trimmed.char_indices().nth(LOG_BODY_CHARS) {
		Some((cut, _)) => format!("{}...", &trimmed[..cut]),
		None => trimmed.to_string(),
	}
}

async fn post_json(client: &Client, url: &str, headers: HeaderMap, body: &Value) -> Result<Value> {
	let res = client.post(url).headers(headers).json(body).send().await?;
	let status = res.status();

	if status.is_success() {
		return Ok(res.json().await?);
	}

	let text = res.text().await.unwrap_or_default();

	if is_throttling(status, &text) {
		tracing::debug!(status = status.as_u16(), url, "Provider throttled request.");

		return Err(Error::Throttled { message: truncate_for_log(&text) });
	}

	Err(Error::Status { status: status.as_u16(), body: truncate_for_log(&text) })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_throttling_responses() {
		assert!(is_throttling(StatusCode::TOO_MANY_REQUESTS, ""));
		assert!(is_throttling(
			StatusCode::BAD_REQUEST,
			"{\"__type\":\"ThrottlingException\",\"message\":\"Rate exceeded\"}"
		));
		assert!(!is_throttling(StatusCode::INTERNAL_SERVER_ERROR, "boom"));
	}

	#[test]
	fn truncates_long_bodies_on_char_boundaries() {
		let body = "é".repeat(LOG_BODY_CHARS + 10);
		let truncated = truncate_for_log(&body);

		assert_eq!(truncated.chars().count(), LOG_BODY_CHARS + 3);
		assert!(truncated.ends_with("..."));
		assert_eq!(truncate_for_log("  short  "), "short");
	}
}
