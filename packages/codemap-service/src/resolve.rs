use crate::{CodemapService, Error, Result};
use codemap_domain::{CandidateCode, ProprietaryField};

const EMBED_LABEL: &str = "embedding";

/// Embeds a field, searches the catalog and retries once with a rewritten display when the best
/// hit is too far away.
pub struct CandidateResolver<'a> {
	service: &'a CodemapService,
}
impl<'a> CandidateResolver<'a> {
	pub fn new(service: &'a CodemapService) -> Self {
		Self { service }
	}

	/// Candidates ordered closest first. An empty list means the catalog had nothing to offer.
	pub async fn resolve(&self, field: &ProprietaryField) -> Result<Vec<CandidateCode>> {
		let pipeline = &self.service.cfg.pipeline;
		let enhancer = self.service.enhancer();
		let text = enhancer.enhance(&field.display, field).await?;
		let candidates = self.search(&text).await?;
		let Some(best) = candidates.first().map(|candidate| candidate.distance) else {
			return Ok(candidates);
		};

		if best <= pipeline.confidence_threshold {
			tracing::debug!(
				record_index = field.index,
				count = candidates.len(),
				distance = best,
				"Resolved candidates."
			);

			return Ok(candidates);
		}

		tracing::info!(
			record_index = field.index,
			display = %field.display,
			distance = best,
			"Poor match. Re-enhancing display."
		);

		let text = enhancer.reenhance(&text, field).await?;
		let candidates = self.search(&text).await?;

		tracing::debug!(
			record_index = field.index,
			count = candidates.len(),
			distance = candidates.first().map(|candidate| candidate.distance),
			"Resolved candidates after re-enhancement."
		);

		Ok(candidates)
	}

	async fn search(&self, text: &str) -> Result<Vec<CandidateCode>> {
		let vector = self.embed(text).await?;

		self.service.index.query(vector, self.service.cfg.pipeline.top_k).await
	}

	async fn embed(&self, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.service.cfg.providers.embedding;
		let embedding = &self.service.providers.embedding;
		let texts = [text.to_string()];
		let vectors =
			self.service.backoff.execute(EMBED_LABEL, || embedding.embed(cfg, &texts)).await?;
		let mut vectors = vectors.into_iter();
		let (Some(vector), None) = (vectors.next(), vectors.next()) else {
			return Err(Error::MalformedResponse {
				message: "Expected exactly one embedding vector.".to_string(),
			});
		};
		let expected = self.service.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected {
			return Err(Error::MalformedResponse {
				message: format!(
					"Embedding vector has dimension {}, expected {expected}.",
					vector.len()
				),
			});
		}

		Ok(vector)
	}
}
