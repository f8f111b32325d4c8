use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Placeholder used when the input row carries no proprietary code.
pub const MISSING_CODE: &str = "N/A";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
	Numerical,
	Categorical,
	Other(String),
}
impl FieldType {
	pub fn parse(raw: &str) -> Self {
		let trimmed = raw.trim();

		if trimmed.eq_ignore_ascii_case("numerical") {
			Self::Numerical
		} else if trimmed.eq_ignore_ascii_case("categorical") {
			Self::Categorical
		} else {
			Self::Other(trimmed.to_string())
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Self::Numerical => "numerical",
			Self::Categorical => "categorical",
			Self::Other(raw) => raw.as_str(),
		}
	}
}
impl Display for FieldType {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl From<String> for FieldType {
	fn from(value: String) -> Self {
		Self::parse(&value)
	}
}
impl From<FieldType> for String {
	fn from(value: FieldType) -> Self {
		value.as_str().to_string()
	}
}

/// One row of the proprietary field export.
#[derive(Clone, Debug, PartialEq)]
pub struct ProprietaryField {
	/// Zero-based row index in the input file.
	pub index: usize,
	pub code: String,
	pub display: String,
	pub field_type: FieldType,
	pub average: Option<f64>,
	pub categories: Option<String>,
}
impl ProprietaryField {
	pub fn has_display(&self) -> bool {
		!self.display.trim().is_empty()
	}

	/// Average value, only when the field is numerical.
	pub fn numeric_average(&self) -> Option<f64> {
		match self.field_type {
			FieldType::Numerical => self.average,
			_ => None,
		}
	}

	/// Category list, only when the field is categorical.
	pub fn category_list(&self) -> Option<&str> {
		match self.field_type {
			FieldType::Categorical =>
				self.categories.as_deref().map(str::trim).filter(|value| !value.is_empty()),
			_ => None,
		}
	}

	/// Context column of the mapping output, e.g. `Type: numerical, Average: 118`.
	pub fn context_label(&self) -> String {
		let mut out = format!("Type: {}", self.field_type);

		if let Some(average) = self.numeric_average() {
			out.push_str(&format!(", Average: {average}"));
		}
		if let Some(categories) = self.category_list() {
			out.push_str(&format!(", Categories: {categories}"));
		}

		out
	}

	/// Sentence form used in expansion prompts, e.g. `This is a numerical field. Average value: 118.`
	pub fn context_sentence(&self) -> String {
		let mut out = format!("This is a {} field.", self.field_type);

		if let Some(average) = self.numeric_average() {
			out.push_str(&format!(" Average value: {average}."));
		}
		if let Some(categories) = self.category_list() {
			out.push_str(&format!(" Categories: {categories}."));
		}

		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn field(field_type: FieldType, average: Option<f64>, categories: Option<&str>) -> ProprietaryField {
		ProprietaryField {
			index: 0,
			code: "BP1".to_string(),
			display: "BP".to_string(),
			field_type,
			average,
			categories: categories.map(str::to_string),
		}
	}

	#[test]
	fn parses_field_types_case_insensitively() {
		assert_eq!(FieldType::parse(" Numerical "), FieldType::Numerical);
		assert_eq!(FieldType::parse("categorical"), FieldType::Categorical);
		assert_eq!(FieldType::parse("free text"), FieldType::Other("free text".to_string()));
	}

	#[test]
	fn numerical_context_includes_average() {
		let field = field(FieldType::Numerical, Some(118.0), Some("ignored"));

		assert_eq!(field.context_label(), "Type: numerical, Average: 118");
		assert_eq!(field.context_sentence(), "This is a numerical field. Average value: 118.");
	}

	#[test]
	fn categorical_context_includes_categories() {
		let field = field(FieldType::Categorical, Some(3.5), Some("Yes; No"));

		assert_eq!(field.context_label(), "Type: categorical, Categories: Yes; No");
		assert_eq!(field.numeric_average(), None);
	}

	#[test]
	fn other_types_carry_no_values() {
		let field = field(FieldType::Other("text".to_string()), Some(1.0), Some("a"));

		assert_eq!(field.context_label(), "Type: text");
	}
}
