//! Deterministic stand-ins for the embedding, completion, ranking and index services.

use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex, PoisonError,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::{Map, Value};

use codemap_config::{
	Backoff, Config, EmbeddingProviderConfig, Export, LlmProviderConfig, Pipeline, Providers,
	Qdrant, Service, Storage,
};
use codemap_domain::CandidateCode;
use codemap_service::{
	BoxFuture, CompletionProvider, EmbeddingProvider, Error, RankingProvider, Result, VectorIndex,
};

pub const TEST_VECTOR_DIM: u32 = 16;

/// Valid configuration with small vectors and a 1 ms backoff base.
pub fn test_config() -> Config {
	Config {
		service: Service { log_level: "debug".to_string() },
		pipeline: Pipeline { workers: 3, poll_timeout_ms: 50, ..Pipeline::default() },
		backoff: Backoff { max_attempts: 8, base_delay_ms: 1 },
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "codemap_test".to_string(),
				vector_dim: TEST_VECTOR_DIM,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "hash".to_string(),
				dimensions: TEST_VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm_expander: llm_config("expander"),
			llm_ranker: llm_config("ranker"),
		},
		export: Export::default(),
	}
}

fn llm_config(model: &str) -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1".to_string(),
		api_key: "test-key".to_string(),
		path: "/chat/completions".to_string(),
		model: model.to_string(),
		temperature: 0.0,
		timeout_ms: 1_000,
		max_tokens: 256,
		default_headers: Map::new(),
	}
}

/// Bag-of-tokens vector: each lowercase token bumps one FNV-1a bucket, then the vector is
/// normalized. Equal texts always produce equal vectors.
pub fn hash_embed(text: &str, dim: usize) -> Vec<f32> {
	let mut vec = vec![0.0_f32; dim.max(1)];
	let buckets = vec.len() as u64;

	for token in text.split_whitespace() {
		let mut hash: u64 = 0xcbf2_9ce4_8422_2325;

		for byte in token.to_lowercase().bytes() {
			hash ^= u64::from(byte);
			hash = hash.wrapping_mul(0x0100_0000_01b3);
		}

		vec[(hash % buckets) as usize] += 1.0;
	}

	let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm > 0.0 {
		vec.iter_mut().for_each(|value| *value /= norm);
	}

	vec
}

pub fn candidate(code: &str, display: &str, system: &str, frequency_rank: i64, distance: f32) -> CandidateCode {
	CandidateCode {
		code: code.to_string(),
		display: display.to_string(),
		system: system.to_string(),
		frequency_rank,
		distance,
	}
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn last_content(messages: &[Value]) -> String {
	messages
		.iter()
		.filter_map(|message| message.get("content").and_then(Value::as_str))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Embeds with [`hash_embed`] and records every text it was asked to embed.
pub struct HashingEmbedder {
	dim: usize,
	texts: Mutex<Vec<String>>,
}
impl HashingEmbedder {
	pub fn new(dim: u32) -> Self {
		Self { dim: dim as usize, texts: Mutex::new(Vec::new()) }
	}

	pub fn texts(&self) -> Vec<String> {
		lock(&self.texts).clone()
	}

	pub fn calls(&self) -> usize {
		lock(&self.texts).len()
	}
}
impl EmbeddingProvider for HashingEmbedder {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		lock(&self.texts).extend(texts.iter().cloned());

		let vectors = texts.iter().map(|text| hash_embed(text, self.dim)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Index that answers by the text a query vector was embedded from, with an optional queue of
/// answers consumed in order for unknown vectors.
pub struct ScriptedIndex {
	dim: usize,
	keyed: Vec<(Vec<f32>, Vec<CandidateCode>)>,
	sequence: Mutex<VecDeque<Vec<CandidateCode>>>,
	queries: AtomicUsize,
}
impl ScriptedIndex {
	pub fn new(dim: u32) -> Self {
		Self {
			dim: dim as usize,
			keyed: Vec::new(),
			sequence: Mutex::new(VecDeque::new()),
			queries: AtomicUsize::new(0),
		}
	}

	/// Answers queries embedded from exactly `text`.
	pub fn respond(mut self, text: &str, candidates: Vec<CandidateCode>) -> Self {
		self.keyed.push((hash_embed(text, self.dim), candidates));

		self
	}

	/// Queues an answer for the next query that matches no keyed text.
	pub fn then(self, candidates: Vec<CandidateCode>) -> Self {
		lock(&self.sequence).push_back(candidates);

		self
	}

	pub fn queries(&self) -> usize {
		self.queries.load(Ordering::SeqCst)
	}
}
impl VectorIndex for ScriptedIndex {
	fn query<'a>(&'a self, vector: Vec<f32>, top_k: u32) -> BoxFuture<'a, Result<Vec<CandidateCode>>> {
		self.queries.fetch_add(1, Ordering::SeqCst);

		let hits = self
			.keyed
			.iter()
			.find(|(key, _)| *key == vector)
			.map(|(_, candidates)| candidates.clone())
			.or_else(|| lock(&self.sequence).pop_front())
			.unwrap_or_default();
		let hits = hits.into_iter().take(top_k as usize).collect();

		Box::pin(async move { Ok(hits) })
	}
}

/// Completion double: the first rule whose needle occurs in the prompt decides the answer.
pub struct ScriptedCompletion {
	rules: Vec<(String, String)>,
	fallback: String,
	prompts: Mutex<Vec<String>>,
}
impl ScriptedCompletion {
	pub fn new(fallback: &str) -> Self {
		Self { rules: Vec::new(), fallback: fallback.to_string(), prompts: Mutex::new(Vec::new()) }
	}

	pub fn when(mut self, needle: &str, answer: &str) -> Self {
		self.rules.push((needle.to_string(), answer.to_string()));

		self
	}

	pub fn prompts(&self) -> Vec<String> {
		lock(&self.prompts).clone()
	}

	pub fn calls(&self) -> usize {
		lock(&self.prompts).len()
	}
}
impl CompletionProvider for ScriptedCompletion {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		let prompt = last_content(messages);
		let answer = self
			.rules
			.iter()
			.find(|(needle, _)| prompt.contains(needle.as_str()))
			.map(|(_, answer)| answer.clone())
			.unwrap_or_else(|| self.fallback.clone());

		lock(&self.prompts).push(prompt);

		Box::pin(async move { Ok(answer) })
	}
}

/// Ranking double: the first rule whose needle occurs in the request decides the answer.
pub struct ScriptedRanking {
	rules: Vec<(String, Value)>,
	fallback: Value,
	requests: Mutex<Vec<String>>,
}
impl ScriptedRanking {
	pub fn new(fallback: Value) -> Self {
		Self { rules: Vec::new(), fallback, requests: Mutex::new(Vec::new()) }
	}

	pub fn when(mut self, needle: &str, answer: Value) -> Self {
		self.rules.push((needle.to_string(), answer));

		self
	}

	pub fn requests(&self) -> Vec<String> {
		lock(&self.requests).clone()
	}

	pub fn calls(&self) -> usize {
		lock(&self.requests).len()
	}
}
impl RankingProvider for ScriptedRanking {
	fn rank<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		let request = last_content(messages);
		let answer = self
			.rules
			.iter()
			.find(|(needle, _)| request.contains(needle.as_str()))
			.map(|(_, answer)| answer.clone())
			.unwrap_or_else(|| self.fallback.clone());

		lock(&self.requests).push(request);

		Box::pin(async move { Ok(answer) })
	}
}

/// Ranking answer selecting `codes` in order.
pub fn ranking_answer(codes: &[&str]) -> Value {
	let matches: Vec<Value> = codes
		.iter()
		.map(|code| serde_json::json!({ "option": code, "reasoning": format!("Picked {code}.") }))
		.collect();

	serde_json::json!({ "matches": matches })
}

/// Fails the first `failures` calls with [`Error::Throttled`] (or forever with `usize::MAX`),
/// then delegates to the wrapped double.
pub struct Throttling<T> {
	inner: T,
	failures: usize,
	calls: Arc<AtomicUsize>,
}
impl<T> Throttling<T> {
	pub fn new(inner: T, failures: usize) -> Self {
		Self { inner, failures, calls: Arc::new(AtomicUsize::new(0)) }
	}

	pub fn always(inner: T) -> Self {
		Self::new(inner, usize::MAX)
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn inner(&self) -> &T {
		&self.inner
	}

	fn throttle(&self) -> bool {
		self.calls.fetch_add(1, Ordering::SeqCst) < self.failures
	}
}

fn throttled<'a, V>() -> BoxFuture<'a, Result<V>>
where
	V: Send + 'a,
{
	Box::pin(async { Err(Error::Throttled { message: "ThrottlingException: Rate exceeded".to_string() }) })
}

impl<T> EmbeddingProvider for Throttling<T>
where
	T: EmbeddingProvider,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		if self.throttle() { throttled() } else { self.inner.embed(cfg, texts) }
	}
}
impl<T> CompletionProvider for Throttling<T>
where
	T: CompletionProvider,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		if self.throttle() { throttled() } else { self.inner.complete(cfg, messages) }
	}
}
impl<T> RankingProvider for Throttling<T>
where
	T: RankingProvider,
{
	fn rank<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		if self.throttle() { throttled() } else { self.inner.rank(cfg, messages) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_embedding_is_deterministic_and_normalized() {
		let first = hash_embed("Complete blood count", 16);
		let second = hash_embed("complete BLOOD count", 16);
		let norm = first.iter().map(|value| value * value).sum::<f32>().sqrt();

		assert_eq!(first, second);
		assert!((norm - 1.0).abs() < 1e-5);
		assert!(hash_embed("", 16).iter().all(|value| *value == 0.0));
	}

	#[test]
	fn test_config_is_valid() {
		assert!(codemap_config::validate(&test_config()).is_ok());
	}
}
