use serde::Serialize;

use crate::{
	candidate::{CandidateCode, UNKNOWN_FREQUENCY_RANK, parse_frequency_rank},
	field::ProprietaryField,
	selection::RankedMatch,
};

/// Ranked options written per output row.
pub const MAX_OPTIONS: usize = 3;

const OPTION_FIELDS: [&str; 5] = ["system", "code", "display", "rank", "reasoning"];
const UNRESOLVED: &str = "N/A";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MappingOption {
	pub position: usize,
	pub system: String,
	pub code: String,
	pub display: String,
	pub frequency_rank: i64,
	pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MappingRow {
	pub proprietary_code: String,
	pub proprietary_display: String,
	pub context: String,
	pub options: Vec<MappingOption>,
}
impl MappingRow {
	/// Joins each ranked match with the candidate it names.
	pub fn assemble(
		field: &ProprietaryField,
		candidates: &[CandidateCode],
		matches: &[RankedMatch],
	) -> Self {
		let options = matches
			.iter()
			.take(MAX_OPTIONS)
			.map(|ranked| {
				let candidate =
					candidates.iter().find(|candidate| candidate.code == ranked.selected_code);

				MappingOption {
					position: ranked.position,
					system: candidate
						.map(|candidate| candidate.system.clone())
						.unwrap_or_else(|| UNRESOLVED.to_string()),
					code: ranked.selected_code.clone(),
					display: candidate
						.map(|candidate| candidate.display.clone())
						.unwrap_or_else(|| UNRESOLVED.to_string()),
					frequency_rank: candidate
						.map(|candidate| candidate.frequency_rank)
						.unwrap_or(UNKNOWN_FREQUENCY_RANK),
					reasoning: ranked.reasoning.clone(),
				}
			})
			.collect();

		Self {
			proprietary_code: field.code.clone(),
			proprietary_display: field.display.clone(),
			context: field.context_label(),
			options,
		}
	}

	/// Column names of the mapping CSV.
	pub fn header() -> Vec<String> {
		let mut header =
			vec!["prop_code".to_string(), "prop_display".to_string(), "context".to_string()];

		for position in 1..=MAX_OPTIONS {
			for field in OPTION_FIELDS {
				header.push(format!("option_{position}_{field}"));
			}
		}

		header
	}

	/// One CSV record aligned with [`MappingRow::header`]. Absent options are empty cells.
	pub fn to_record(&self) -> Vec<String> {
		let mut record = vec![
			self.proprietary_code.clone(),
			self.proprietary_display.clone(),
			self.context.clone(),
		];

		for position in 1..=MAX_OPTIONS {
			match self.options.iter().find(|option| option.position == position) {
				Some(option) => record.extend([
					option.system.clone(),
					option.code.clone(),
					option.display.clone(),
					option.frequency_rank.to_string(),
					option.reasoning.clone(),
				]),
				None => record.extend(std::iter::repeat_n(String::new(), OPTION_FIELDS.len())),
			}
		}

		record
	}

	/// Reads a row back through a column lookup. Options missing a system or code are skipped.
	pub fn from_columns<'a, F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<&'a str>,
	{
		let text = |column: &str| lookup(column).map(str::to_string).unwrap_or_default();
		let mut options = Vec::new();

		for position in 1..=MAX_OPTIONS {
			let column = |field: &str| format!("option_{position}_{field}");
			let system = text(&column("system"));
			let code = text(&column("code"));

			if system.trim().is_empty() || code.trim().is_empty() {
				continue;
			}

			options.push(MappingOption {
				position,
				system,
				code,
				display: text(&column("display")),
				frequency_rank: parse_frequency_rank(lookup(&column("rank"))),
				reasoning: text(&column("reasoning")),
			});
		}

		Self {
			proprietary_code: text("prop_code"),
			proprietary_display: text("prop_display"),
			context: text("context"),
			options,
		}
	}

	/// Reads a reviewed row carrying a single `validated_*` option.
	pub fn from_validated_columns<'a, F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<&'a str>,
	{
		let text = |column: &str| lookup(column).map(str::to_string).unwrap_or_default();
		let system = text("validated_system");
		let code = text("validated_code");
		let options = if system.trim().is_empty() || code.trim().is_empty() {
			Vec::new()
		} else {
			vec![MappingOption {
				position: 1,
				system,
				code,
				display: text("validated_display"),
				frequency_rank: parse_frequency_rank(lookup("validated_rank")),
				reasoning: text("validated_reasoning"),
			}]
		};

		Self {
			proprietary_code: text("prop_code"),
			proprietary_display: text("prop_display"),
			context: text("context"),
			options,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::field::FieldType;

	fn field() -> ProprietaryField {
		ProprietaryField {
			index: 4,
			code: "BP1".to_string(),
			display: "BP".to_string(),
			field_type: FieldType::Numerical,
			average: Some(118.0),
			categories: None,
		}
	}

	fn candidate(code: &str, system: &str, rank: i64) -> CandidateCode {
		CandidateCode {
			code: code.to_string(),
			display: format!("Display {code}"),
			system: system.to_string(),
			frequency_rank: rank,
			distance: 0.3,
		}
	}

	#[test]
	fn assembles_options_from_candidates() {
		let candidates =
			vec![candidate("8480-6", "LOINC", 3), candidate("271649006", "SNOMED CT", -1)];
		let matches = vec![
			RankedMatch {
				selected_code: "8480-6".to_string(),
				reasoning: "Systolic.".to_string(),
				position: 1,
			},
			RankedMatch {
				selected_code: "271649006".to_string(),
				reasoning: "Clinical finding.".to_string(),
				position: 2,
			},
		];
		let row = MappingRow::assemble(&field(), &candidates, &matches);

		assert_eq!(row.context, "Type: numerical, Average: 118");
		assert_eq!(row.options.len(), 2);
		assert_eq!(row.options[1].system, "SNOMED CT");
		assert_eq!(row.options[1].frequency_rank, -1);

		let record = row.to_record();

		assert_eq!(record.len(), MappingRow::header().len());
		assert_eq!(record[3..8], ["LOINC", "8480-6", "Display 8480-6", "3", "Systolic."]);
		assert!(record[13..].iter().all(String::is_empty));
	}

	#[test]
	fn header_lists_three_option_blocks() {
		let header = MappingRow::header();

		assert_eq!(header.len(), 18);
		assert_eq!(header[0], "prop_code");
		assert_eq!(header[3], "option_1_system");
		assert_eq!(header[17], "option_3_reasoning");
	}

	#[test]
	fn reads_rows_back_from_columns() {
		let cells: HashMap<&str, &str> = HashMap::from([
			("prop_code", "BP1"),
			("prop_display", "BP"),
			("context", "Type: numerical, Average: 118"),
			("option_1_system", "LOINC"),
			("option_1_code", "8480-6"),
			("option_1_rank", "3.0"),
			("option_2_system", ""),
			("option_2_code", "x"),
		]);
		let row = MappingRow::from_columns(|column| cells.get(column).copied());

		assert_eq!(row.options.len(), 1);
		assert_eq!(row.options[0].frequency_rank, 3);
		assert_eq!(row.options[0].display, "");
	}

	#[test]
	fn reads_validated_rows() {
		let cells: HashMap<&str, &str> = HashMap::from([
			("prop_code", "HR"),
			("validated_system", "SNOMED CT"),
			("validated_code", "364075005"),
			("validated_reasoning", "Reviewed."),
		]);
		let row = MappingRow::from_validated_columns(|column| cells.get(column).copied());

		assert_eq!(row.options.len(), 1);
		assert_eq!(row.options[0].position, 1);
		assert_eq!(row.options[0].frequency_rank, UNKNOWN_FREQUENCY_RANK);
	}
}
