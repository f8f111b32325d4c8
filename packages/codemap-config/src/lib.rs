mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Backoff, Config, EmbeddingProviderConfig, Export, LlmProviderConfig, Pipeline, Providers,
	Qdrant, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.pipeline.workers == 0 {
		return Err(Error::Validation {
			message: "pipeline.workers must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.poll_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "pipeline.poll_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.top_k == 0 {
		return Err(Error::Validation {
			message: "pipeline.top_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.pipeline.confidence_threshold.is_finite() {
		return Err(Error::Validation {
			message: "pipeline.confidence_threshold must be a finite number.".to_string(),
		});
	}
	if cfg.pipeline.confidence_threshold < 0.0 {
		return Err(Error::Validation {
			message: "pipeline.confidence_threshold must be zero or greater.".to_string(),
		});
	}
	if !(1..=3).contains(&cfg.pipeline.max_matches) {
		return Err(Error::Validation {
			message: "pipeline.max_matches must be in the range 1-3.".to_string(),
		});
	}
	if cfg.backoff.max_attempts == 0 {
		return Err(Error::Validation {
			message: "backoff.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.backoff.max_attempts > 16 {
		return Err(Error::Validation {
			message: "backoff.max_attempts must be 16 or less.".to_string(),
		});
	}

	for (label, value) in [
		("storage.qdrant.url", &cfg.storage.qdrant.url),
		("storage.qdrant.collection", &cfg.storage.qdrant.collection),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("llm_expander", &cfg.providers.llm_expander.api_key),
		("llm_ranker", &cfg.providers.llm_ranker.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	for (label, llm) in
		[("llm_expander", &cfg.providers.llm_expander), ("llm_ranker", &cfg.providers.llm_ranker)]
	{
		if !llm.temperature.is_finite() || llm.temperature < 0.0 {
			return Err(Error::Validation {
				message: format!(
					"providers.{label}.temperature must be a finite number of zero or greater."
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.storage.qdrant.url = cfg.storage.qdrant.url.trim().to_string();
	cfg.storage.qdrant.collection = cfg.storage.qdrant.collection.trim().to_string();

	for api_base in [
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.llm_expander.api_base,
		&mut cfg.providers.llm_ranker.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}
}
