pub mod assemble;
pub mod backoff;
pub mod dispatch;
pub mod enhance;
pub mod rank;
pub mod resolve;

mod error;

pub use assemble::MappingSink;
pub use backoff::BackoffExecutor;
pub use dispatch::{DispatchReport, Dispatcher, FieldOutcome};
pub use enhance::FieldEnhancer;
pub use error::{Error, Result};
pub use rank::RankingInvoker;
pub use resolve::CandidateResolver;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use codemap_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use codemap_domain::CandidateCode;
use codemap_providers::{embedding, llm};
use codemap_storage::qdrant::QdrantIndex;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Free-text completions, used for display expansion.
pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>>;
}

/// Structured ranking judgments. The returned document is validated by the caller.
pub trait RankingProvider
where
	Self: Send + Sync,
{
	fn rank<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>>;
}

/// Nearest-neighbour lookup over the standard-code catalog. Results are ordered closest first.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn query<'a>(&'a self, vector: Vec<f32>, top_k: u32) -> BoxFuture<'a, Result<Vec<CandidateCode>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
	pub ranking: Arc<dyn RankingProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
		ranking: Arc<dyn RankingProvider>,
	) -> Self {
		Self { embedding, completion, ranking }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider.clone(), ranking: provider }
	}
}

/// Read-only state shared by every worker.
pub struct CodemapService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
	pub backoff: BackoffExecutor,
}
impl CodemapService {
	pub fn new(cfg: Config, index: Arc<dyn VectorIndex>) -> Self {
		Self::with_providers(cfg, index, Providers::default())
	}

	pub fn with_providers(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		let backoff = BackoffExecutor::from_config(&cfg.backoff);

		Self { cfg, index, providers, backoff }
	}

	pub fn enhancer(&self) -> FieldEnhancer<'_> {
		FieldEnhancer::new(self)
	}

	pub fn resolver(&self) -> CandidateResolver<'_> {
		CandidateResolver::new(self)
	}

	pub fn invoker(&self) -> RankingInvoker<'_> {
		RankingInvoker::new(self)
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(llm::complete(cfg, messages).await?) })
	}
}
impl RankingProvider for DefaultProviders {
	fn rank<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(llm::complete_json(cfg, messages).await?) })
	}
}

impl VectorIndex for QdrantIndex {
	fn query<'a>(&'a self, vector: Vec<f32>, top_k: u32) -> BoxFuture<'a, Result<Vec<CandidateCode>>> {
		Box::pin(async move { Ok(QdrantIndex::query(self, vector, top_k).await?) })
	}
}
