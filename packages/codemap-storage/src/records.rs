//! Reader for the proprietary field export.

use std::path::Path;

use crate::{Error, Result};
use codemap_domain::{FieldType, MISSING_CODE, ProprietaryField};

pub const CODE_COLUMN: &str = "proprietary_code";
pub const DISPLAY_COLUMN: &str = "proprietary_display";
pub const TYPE_COLUMN: &str = "type";
pub const AVERAGE_COLUMN: &str = "average";
pub const CATEGORIES_COLUMN: &str = "categories";

/// Reads every row of the input file. Fails before returning anything when the display or type
/// column is absent; the remaining columns are optional.
pub fn read_fields(path: &Path) -> Result<Vec<ProprietaryField>> {
	let (mut reader, headers) = crate::open_reader(path)?;
	let [display_idx, type_idx] = crate::require_columns(path, &headers, [DISPLAY_COLUMN, TYPE_COLUMN])?;
	let code_idx = crate::column(&headers, CODE_COLUMN);
	let average_idx = crate::column(&headers, AVERAGE_COLUMN);
	let categories_idx = crate::column(&headers, CATEGORIES_COLUMN);
	let mut fields = Vec::new();

	for (index, record) in reader.records().enumerate() {
		let record = record.map_err(|err| Error::Csv { path: path.to_path_buf(), source: err })?;
		let average = crate::cell(&record, average_idx).and_then(|raw| {
			let parsed = raw.parse::<f64>().ok().filter(|value| value.is_finite());

			if parsed.is_none() {
				tracing::warn!(record_index = index, value = raw, "Ignoring unparseable average.");
			}

			parsed
		});

		fields.push(ProprietaryField {
			index,
			code: crate::cell(&record, code_idx).unwrap_or(MISSING_CODE).to_string(),
			display: record.get(display_idx).unwrap_or_default().to_string(),
			field_type: FieldType::parse(record.get(type_idx).unwrap_or_default()),
			average,
			categories: crate::cell(&record, categories_idx).map(str::to_string),
		});
	}

	Ok(fields)
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	fn write_csv(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file.");

		file.write_all(contents.as_bytes()).expect("Failed to write temp file.");

		file
	}

	#[test]
	fn reads_fields_with_optional_columns() {
		let file = write_csv(
			"proprietary_code,proprietary_display,type,average,categories\n\
			 BP1,BP,numerical,118,\n\
			 ,Mobility,categorical,,\"Independent, Assisted\"\n\
			 X9,  ,numerical,abc,\n",
		);
		let fields = read_fields(file.path()).expect("Failed to read fields.");

		assert_eq!(fields.len(), 3);
		assert_eq!(fields[0].code, "BP1");
		assert_eq!(fields[0].average, Some(118.0));
		assert_eq!(fields[1].code, MISSING_CODE);
		assert_eq!(fields[1].field_type, FieldType::Categorical);
		assert_eq!(fields[1].categories.as_deref(), Some("Independent, Assisted"));
		assert_eq!(fields[2].index, 2);
		assert!(!fields[2].has_display());
		assert_eq!(fields[2].average, None);
	}

	#[test]
	fn missing_display_column_is_fatal() {
		let file = write_csv("proprietary_code,type\nBP1,numerical\n");
		let err = read_fields(file.path()).expect_err("Expected missing column error.");

		assert!(
			matches!(&err, Error::MissingColumns { columns, .. } if columns == &vec![DISPLAY_COLUMN.to_string()]),
			"Unexpected error: {err:?}"
		);
	}

	#[test]
	fn only_required_columns_are_needed() {
		let file = write_csv("type,proprietary_display\ncategorical,Pain scale\n");
		let fields = read_fields(file.path()).expect("Failed to read fields.");

		assert_eq!(fields[0].display, "Pain scale");
		assert_eq!(fields[0].code, MISSING_CODE);
	}
}
