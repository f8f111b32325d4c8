use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub pipeline: Pipeline,
	#[serde(default)]
	pub backoff: Backoff,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub export: Export,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	/// Number of concurrent workers draining the record queue.
	pub workers: usize,
	/// Dequeue poll timeout. Only used to detect an empty queue.
	pub poll_timeout_ms: u64,
	/// Nearest neighbours requested from the vector index per query.
	pub top_k: u32,
	/// Top-hit distance above which a field is re-enhanced and queried once more.
	pub confidence_threshold: f32,
	/// Upper bound on ranked matches kept per field.
	pub max_matches: usize,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			workers: 4,
			poll_timeout_ms: 1_000,
			top_k: 30,
			confidence_threshold: 0.65,
			max_matches: 3,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Backoff {
	pub max_attempts: u32,
	pub base_delay_ms: u64,
}
impl Default for Backoff {
	fn default() -> Self {
		Self { max_attempts: 8, base_delay_ms: 1_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_expander: LlmProviderConfig,
	pub llm_ranker: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Export {
	pub name: String,
	pub title: String,
	pub publisher: String,
	pub source_system: String,
}
impl Default for Export {
	fn default() -> Self {
		Self {
			name: "EHRCodeMappings".to_string(),
			title: "EHR Code Mappings to Standard Terminologies".to_string(),
			publisher: "EHR Code Mapper".to_string(),
			source_system: "Proprietary Code System".to_string(),
		}
	}
}

fn default_max_tokens() -> u32 {
	1_000
}
