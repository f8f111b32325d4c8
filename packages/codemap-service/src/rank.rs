use serde_json::Value;

use crate::{CodemapService, Error, Result};
use codemap_domain::{
	CandidateCode, ProprietaryField, RankedMatch,
	selection::{self, RankingResponse},
};

const RANK_LABEL: &str = "ranking";

const RANKING_INSTRUCTIONS: &str = "\
You map proprietary EHR fields to standard LOINC and SNOMED CT codes.

You receive a proprietary field name, its average value or category list when known, and a list \
of STANDARD CODE OPTIONS. Choose the 3 options that best represent the same clinical concept.

MATCHING PRINCIPLES:
1. Explicit naming takes precedence. When the field names a specific measurement, method or body \
site, prefer options that name the same thing.
2. Values discriminate. Use the average value to infer units and scale, and use categories to \
tell observable entities from findings or procedures.
3. Match method and specificity. Do not pick a more specific option than the field supports, and \
do not pick a panel when the field is a single measurement.
4. Identify the primary analyte. Decide which term is the actual measurement and which is only \
context.
5. Apply clinical domain knowledge. Functional status scales map to observable entities; when \
options differ only by specimen, choose by the usual testing context.

The Rank shown with each option is its relative usage frequency (1 is most common, -1 unknown). \
Use it only to break ties between equally good options.

Respond with JSON of the form {\"matches\": [{\"option\": \"<code>\", \"reasoning\": \"<one \
sentence>\"}]} holding exactly 3 matches ordered best first. Only use codes from the options. Do \
not invent codes.";

/// Asks the ranking service to pick the best candidates for a field.
pub struct RankingInvoker<'a> {
	service: &'a CodemapService,
}
impl<'a> RankingInvoker<'a> {
	pub fn new(service: &'a CodemapService) -> Self {
		Self { service }
	}

	/// At most `pipeline.max_matches` matches, each naming one of `candidates`, positioned from 1.
	pub async fn rank(
		&self,
		field: &ProprietaryField,
		candidates: &[CandidateCode],
	) -> Result<Vec<RankedMatch>> {
		let messages = ranking_messages(field, candidates);
		let cfg = &self.service.cfg.providers.llm_ranker;
		let ranking = &self.service.providers.ranking;
		let answer =
			self.service.backoff.execute(RANK_LABEL, || ranking.rank(cfg, &messages)).await?;
		let response = parse_ranking(answer)?;
		let outcome = selection::validate_selections(
			response.matches,
			candidates,
			self.service.cfg.pipeline.max_matches,
		);

		for code in &outcome.unknown {
			tracing::warn!(
				record_index = field.index,
				display = %field.display,
				code = %code,
				"Ranking selected a code outside the candidate set. Dropping it."
			);
		}
		if outcome.duplicates > 0 {
			tracing::debug!(
				record_index = field.index,
				duplicates = outcome.duplicates,
				"Ranking repeated codes."
			);
		}

		Ok(outcome.matches)
	}
}

/// System instructions plus the user topic describing the field and its options.
pub fn ranking_messages(field: &ProprietaryField, candidates: &[CandidateCode]) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": RANKING_INSTRUCTIONS }),
		serde_json::json!({ "role": "user", "content": ranking_topic(field, candidates) }),
	]
}

fn ranking_topic(field: &ProprietaryField, candidates: &[CandidateCode]) -> String {
	let mut topic = format!("Proprietary Code: {}\n", field.display.trim());

	if let Some(average) = field.numeric_average() {
		topic.push_str(&format!("Average Value: {average}\n"));
	}
	if let Some(categories) = field.category_list() {
		topic.push_str(&format!("Categories: {categories}\n"));
	}

	topic.push_str("STANDARD CODE OPTIONS:\n");
	topic.push_str(
		&candidates.iter().map(CandidateCode::option_line).collect::<Vec<_>>().join("\n"),
	);

	topic
}

fn parse_ranking(answer: Value) -> Result<RankingResponse> {
	serde_json::from_value(answer).map_err(|err| Error::MalformedResponse {
		message: format!("Ranking answer does not match the expected shape: {err}"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use codemap_domain::FieldType;

	fn candidate(code: &str, display: &str, rank: i64) -> CandidateCode {
		CandidateCode {
			code: code.to_string(),
			display: display.to_string(),
			system: "LOINC".to_string(),
			frequency_rank: rank,
			distance: 0.2,
		}
	}

	#[test]
	fn topic_lists_value_context_and_options() {
		let field = ProprietaryField {
			index: 0,
			code: "BP1".to_string(),
			display: "BP".to_string(),
			field_type: FieldType::Numerical,
			average: Some(118.0),
			categories: None,
		};
		let topic = ranking_topic(
			&field,
			&[candidate("8480-6", "Systolic blood pressure", 2), candidate("8462-4", "Diastolic blood pressure", -1)],
		);

		assert_eq!(
			topic,
			"Proprietary Code: BP\n\
			 Average Value: 118\n\
			 STANDARD CODE OPTIONS:\n\
			 Code: 8480-6, Display: Systolic blood pressure, Rank: 2.\n\
			 Code: 8462-4, Display: Diastolic blood pressure, Rank: -1."
		);
	}

	#[test]
	fn parses_expected_shape() {
		let parsed = parse_ranking(serde_json::json!({
			"matches": [{ "option": "8480-6", "reasoning": "Systolic." }]
		}))
		.expect("Expected valid ranking.");

		assert_eq!(parsed.matches.len(), 1);
	}

	#[test]
	fn rejects_other_shapes() {
		for answer in [
			serde_json::json!({ "options": [] }),
			serde_json::json!({ "matches": [{ "code": "8480-6" }] }),
			serde_json::json!(["8480-6"]),
		] {
			let err = parse_ranking(answer).expect_err("Expected malformed ranking.");

			assert!(matches!(err, Error::MalformedResponse { .. }));
		}
	}
}
