use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder, ScoredPoint,
		UpsertPointsBuilder, Value, Vector, VectorParamsBuilder, VectorsConfigBuilder,
		value::Kind,
	},
};

use crate::{Result, catalog::CatalogEntry};
use codemap_domain::{CandidateCode, candidate::UNKNOWN_FREQUENCY_RANK};

pub const DENSE_VECTOR_NAME: &str = "dense";

pub const CODE_KEY: &str = "code";
pub const DISPLAY_KEY: &str = "display";
pub const SYSTEM_KEY: &str = "system";
pub const RANK_KEY: &str = "rank";

pub struct QdrantIndex {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantIndex {
	pub fn new(cfg: &codemap_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Nearest catalog codes, closest first. Cosine similarity is reported as `1 - score`.
	pub async fn query(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<CandidateCode>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(u64::from(top_k));
		let points = self.client.query(search).await?.result;
		let mut candidates: Vec<CandidateCode> =
			points.iter().filter_map(candidate_from_point).collect();

		candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

		Ok(candidates)
	}

	/// Creates the collection when missing. With `recreate`, an existing collection is dropped first.
	pub async fn ensure_collection(&self, recreate: bool) -> Result<()> {
		let exists = self.client.collection_exists(self.collection.clone()).await?;

		if exists && !recreate {
			return Ok(());
		}
		if exists {
			tracing::info!(collection = %self.collection, "Dropping existing collection.");

			self.client.delete_collection(self.collection.clone()).await?;
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		tracing::info!(collection = %self.collection, vector_dim = self.vector_dim, "Created collection.");

		Ok(())
	}

	pub async fn upsert(&self, entries: &[CatalogEntry], vectors: Vec<Vec<f32>>) -> Result<usize> {
		if entries.len() != vectors.len() {
			return Err(crate::Error::InvalidArgument(format!(
				"Expected {} vectors, got {}.",
				entries.len(),
				vectors.len()
			)));
		}

		let mut points = Vec::with_capacity(entries.len());

		for (entry, vec) in entries.iter().zip(vectors) {
			if vec.len() != self.vector_dim as usize {
				return Err(crate::Error::InvalidArgument(format!(
					"Vector for {}:{} has dimension {}, expected {}.",
					entry.system,
					entry.code,
					vec.len(),
					self.vector_dim
				)));
			}

			let mut payload = Payload::new();

			payload.insert(CODE_KEY, entry.code.clone());
			payload.insert(DISPLAY_KEY, entry.display.clone());
			payload.insert(SYSTEM_KEY, entry.system.clone());
			payload.insert(RANK_KEY, serde_json::Value::from(entry.frequency_rank));

			let mut named = HashMap::new();

			named.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vec));

			points.push(PointStruct::new(entry.point_id().to_string(), named, payload));
		}

		let count = points.len();

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(count)
	}
}

fn candidate_from_point(point: &ScoredPoint) -> Option<CandidateCode> {
	let Some(code) = payload_text(&point.payload, CODE_KEY) else {
		tracing::warn!(score = point.score, "Index hit is missing a code payload.");

		return None;
	};

	Some(CandidateCode {
		code,
		display: payload_text(&point.payload, DISPLAY_KEY).unwrap_or_default(),
		system: payload_text(&point.payload, SYSTEM_KEY).unwrap_or_default(),
		frequency_rank: payload_rank(&point.payload).unwrap_or(UNKNOWN_FREQUENCY_RANK),
		distance: 1.0 - point.score,
	})
}

/// Text payload. Numeric codes are rendered without a fractional part.
fn payload_text(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		Some(Kind::IntegerValue(value)) => Some(value.to_string()),
		Some(Kind::DoubleValue(value)) if value.fract() == 0.0 => Some((*value as i64).to_string()),
		_ => None,
	}
}

fn payload_rank(payload: &HashMap<String, Value>) -> Option<i64> {
	let value = payload.get(RANK_KEY)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		Some(Kind::DoubleValue(value)) if value.fract() == 0.0 => Some(*value as i64),
		Some(Kind::StringValue(text)) =>
			Some(codemap_domain::candidate::parse_frequency_rank(Some(text.as_str()))),
		_ => None,
	}
}
