//! Mapping output file: three ranked options per proprietary field.

use std::{fs, path::Path};

use csv::Writer;

use crate::{Error, Result};
use codemap_domain::MappingRow;

const VALIDATED_MARKER: &str = "validated_system";

/// Writes rows to a sibling temp file and renames it into place once flushed.
pub fn write_rows(path: &Path, rows: &[MappingRow]) -> Result<()> {
	let file_name = path
		.file_name()
		.and_then(|name| name.to_str())
		.ok_or_else(|| Error::InvalidArgument(format!("Output path {path:?} has no file name.")))?;
	let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
	let csv_err = |err| Error::Csv { path: tmp_path.clone(), source: err };
	let mut writer = Writer::from_path(&tmp_path).map_err(csv_err)?;

	writer.write_record(MappingRow::header()).map_err(csv_err)?;

	for row in rows {
		writer.write_record(row.to_record()).map_err(csv_err)?;
	}

	writer.flush().map_err(|err| Error::Io { path: tmp_path.clone(), source: err })?;

	fs::rename(&tmp_path, path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })
}

/// Reads a mapping file, in either the three-option layout or the reviewed single-option layout.
pub fn read_rows(path: &Path) -> Result<Vec<MappingRow>> {
	let (mut reader, headers) = crate::open_reader(path)?;

	crate::require_columns(path, &headers, ["prop_code", "prop_display", "context"])?;

	let validated = crate::column(&headers, VALIDATED_MARKER).is_some();
	let mut rows = Vec::new();

	for record in reader.records() {
		let record = record.map_err(|err| Error::Csv { path: path.to_path_buf(), source: err })?;
		let lookup = |name: &str| crate::cell(&record, crate::column(&headers, name));
		let row = if validated {
			MappingRow::from_validated_columns(lookup)
		} else {
			MappingRow::from_columns(lookup)
		};

		rows.push(row);
	}

	Ok(rows)
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;
	use codemap_domain::MappingOption;

	fn row(code: &str, options: usize) -> MappingRow {
		MappingRow {
			proprietary_code: code.to_string(),
			proprietary_display: format!("{code} display"),
			context: "Type: numerical, Average: 118".to_string(),
			options: (1..=options)
				.map(|position| MappingOption {
					position,
					system: "LOINC".to_string(),
					code: format!("{code}-{position}"),
					display: "Systolic, sitting".to_string(),
					frequency_rank: position as i64,
					reasoning: "Names the \"systolic\" reading.".to_string(),
				})
				.collect(),
		}
	}

	#[test]
	fn written_rows_read_back() {
		let dir = tempfile::tempdir().expect("Failed to create temp dir.");
		let path = dir.path().join("mappings.csv");
		let rows = vec![row("BP1", 2), row("HR", 3)];

		write_rows(&path, &rows).expect("Failed to write rows.");

		assert!(!dir.path().join("mappings.csv.tmp").exists());

		let read = read_rows(&path).expect("Failed to read rows.");

		assert_eq!(read, rows);
	}

	#[test]
	fn reads_validated_layout() {
		let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file.");

		file.write_all(
			b"prop_code,prop_display,context,validated_system,validated_code,validated_display,validated_rank,validated_reasoning\n\
			  HR,Heart rate,Type: numerical,LOINC,8867-4,Heart rate,5,Reviewed\n",
		)
		.expect("Failed to write temp file.");

		let rows = read_rows(file.path()).expect("Failed to read rows.");

		assert_eq!(rows[0].options.len(), 1);
		assert_eq!(rows[0].options[0].code, "8867-4");
		assert_eq!(rows[0].options[0].frequency_rank, 5);
	}
}
