//! FHIR `ConceptMap` rendering of mapping rows.

use serde::{Serialize, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{candidate::UNKNOWN_FREQUENCY_RANK, mapping::MappingRow};

pub const LOINC_SYSTEM: &str = "LOINC";
pub const LOINC_URI: &str = "http://loinc.org";
pub const SNOMED_SYSTEM: &str = "SNOMED CT";
pub const SNOMED_URI: &str = "http://snomed.info/sct";

const PREFERENCE_RANK: &str = "preferenceRank";
const FREQUENCY_RANK: &str = "frequencyRank";
const DATA_TYPE: &str = "proprietaryCodeDataType";

#[derive(Clone, Debug)]
pub struct ConceptMapHeader {
	pub name: String,
	pub title: String,
	pub publisher: String,
	pub source_system: String,
	pub date: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMap {
	pub resource_type: &'static str,
	pub version: &'static str,
	pub name: String,
	pub title: String,
	pub status: &'static str,
	#[serde(serialize_with = "serialize_rfc3339")]
	pub date: OffsetDateTime,
	pub publisher: String,
	pub description: String,
	pub property: Vec<PropertyDeclaration>,
	pub group: Vec<Group>,
}

#[derive(Debug, Serialize)]
pub struct PropertyDeclaration {
	pub code: &'static str,
	pub description: &'static str,
	#[serde(rename = "type")]
	pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Group {
	pub source: String,
	pub target: &'static str,
	pub element: Vec<Element>,
}

#[derive(Debug, Serialize)]
pub struct Element {
	pub code: String,
	pub display: String,
	pub property: Vec<Property>,
	pub target: Vec<Target>,
}

#[derive(Debug, Serialize)]
pub struct Target {
	pub code: String,
	pub display: String,
	pub relationship: &'static str,
	pub comment: String,
	pub property: Vec<Property>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
	pub code: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value_integer: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value_string: Option<String>,
}
impl Property {
	fn integer(code: &'static str, value: i64) -> Self {
		Self { code, value_integer: Some(value), value_string: None }
	}

	fn string(code: &'static str, value: &str) -> Self {
		Self { code, value_integer: None, value_string: Some(value.to_string()) }
	}
}

struct PendingElement {
	code: String,
	display: String,
	data_type: &'static str,
	loinc: Vec<Target>,
	snomed: Vec<Target>,
}

/// Groups targets by standard system. Rows that share a proprietary code merge into one element;
/// elements keep first-seen order and groups without elements are left out.
pub fn build_concept_map(header: &ConceptMapHeader, rows: &[MappingRow]) -> ConceptMap {
	let mut pending: Vec<PendingElement> = Vec::new();

	for row in rows {
		let index = match pending.iter().position(|element| element.code == row.proprietary_code) {
			Some(index) => index,
			None => {
				pending.push(PendingElement {
					code: row.proprietary_code.clone(),
					display: row.proprietary_display.clone(),
					data_type: data_type_of(&row.context),
					loinc: Vec::new(),
					snomed: Vec::new(),
				});

				pending.len() - 1
			},
		};
		let element = &mut pending[index];

		for option in &row.options {
			let mut property = vec![Property::integer(PREFERENCE_RANK, option.position as i64)];

			if option.frequency_rank != UNKNOWN_FREQUENCY_RANK {
				property.push(Property::integer(FREQUENCY_RANK, option.frequency_rank));
			}

			let target = Target {
				code: option.code.clone(),
				display: option.display.clone(),
				relationship: "equivalent",
				comment: option.reasoning.clone(),
				property,
			};

			match option.system.trim() {
				LOINC_SYSTEM => element.loinc.push(target),
				SNOMED_SYSTEM => element.snomed.push(target),
				_ => {},
			}
		}
	}

	let mut loinc = Vec::new();
	let mut snomed = Vec::new();

	for element in pending {
		if !element.loinc.is_empty() {
			loinc.push(Element {
				code: element.code.clone(),
				display: element.display.clone(),
				property: vec![Property::string(DATA_TYPE, element.data_type)],
				target: element.loinc,
			});
		}
		if !element.snomed.is_empty() {
			snomed.push(Element {
				code: element.code,
				display: element.display,
				property: vec![Property::string(DATA_TYPE, element.data_type)],
				target: element.snomed,
			});
		}
	}

	let mut group = Vec::new();

	for (target, element) in [(LOINC_URI, loinc), (SNOMED_URI, snomed)] {
		if !element.is_empty() {
			group.push(Group { source: header.source_system.clone(), target, element });
		}
	}

	ConceptMap {
		resource_type: "ConceptMap",
		version: "1.0.0",
		name: header.name.clone(),
		title: header.title.clone(),
		status: "active",
		date: header.date,
		publisher: header.publisher.clone(),
		description: "AI-generated mappings from proprietary EHR codes to LOINC and SNOMED CT"
			.to_string(),
		property: property_declarations(),
		group,
	}
}

fn data_type_of(context: &str) -> &'static str {
	if context.contains("numerical") { "numerical" } else { "categorical" }
}

fn property_declarations() -> Vec<PropertyDeclaration> {
	vec![
		PropertyDeclaration {
			code: PREFERENCE_RANK,
			description: "Preference rank for this mapping (1=best option, 2=second best, 3=third best)",
			kind: "integer",
		},
		PropertyDeclaration {
			code: FREQUENCY_RANK,
			description: "Relative frequency rank in source system (-1 if unavailable)",
			kind: "integer",
		},
		PropertyDeclaration {
			code: DATA_TYPE,
			description: "Data type of the source (proprietary) element (numerical or categorical)",
			kind: "string",
		},
	]
}

fn serialize_rfc3339<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}
