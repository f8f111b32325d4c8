use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::candidate::CandidateCode;

/// Structured answer expected from the ranking service.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RankingResponse {
	pub matches: Vec<RankedSelection>,
}

/// One raw entry of a ranking answer, before validation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RankedSelection {
	pub option: String,
	pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedMatch {
	pub selected_code: String,
	pub reasoning: String,
	/// 1-based, contiguous.
	pub position: usize,
}

#[derive(Debug, Default)]
pub struct SelectionOutcome {
	pub matches: Vec<RankedMatch>,
	/// Codes the service returned that are not in the candidate set.
	pub unknown: Vec<String>,
	pub duplicates: usize,
}

/// Keeps selections that name a candidate, first occurrence wins, capped at `max_matches`.
/// Positions are reassigned from 1 in service order.
pub fn validate_selections(
	selections: Vec<RankedSelection>,
	candidates: &[CandidateCode],
	max_matches: usize,
) -> SelectionOutcome {
	let known: HashSet<&str> = candidates.iter().map(|candidate| candidate.code.as_str()).collect();
	let mut seen = HashSet::new();
	let mut outcome = SelectionOutcome::default();

	for selection in selections {
		let code = selection.option.trim();

		if !known.contains(code) {
			outcome.unknown.push(code.to_string());

			continue;
		}
		if !seen.insert(code.to_string()) {
			outcome.duplicates += 1;

			continue;
		}
		if outcome.matches.len() >= max_matches {
			continue;
		}

		outcome.matches.push(RankedMatch {
			selected_code: code.to_string(),
			reasoning: selection.reasoning,
			position: outcome.matches.len() + 1,
		});
	}

	outcome
}
