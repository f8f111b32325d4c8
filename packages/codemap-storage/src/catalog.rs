//! Standard-code catalog loaded into the vector index.

use std::path::Path;

use uuid::Uuid;

use crate::{Error, Result};
use codemap_domain::candidate;

pub const IDENTIFIER_COLUMN: &str = "STANDARD_IDENTIFIER";
pub const DISPLAY_COLUMN: &str = "STANDARD_DISPLAY";
pub const SYSTEM_COLUMN: &str = "SYSTEM";
pub const RANK_COLUMN: &str = "RANK";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
	pub code: String,
	pub display: String,
	pub system: String,
	pub frequency_rank: i64,
}
impl CatalogEntry {
	/// Stable point id, so re-ingesting a catalog overwrites instead of duplicating.
	pub fn point_id(&self) -> Uuid {
		Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}:{}", self.system, self.code).as_bytes())
	}
}

/// Reads catalog rows. Rows without an identifier or display are skipped.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
	let (mut reader, headers) = crate::open_reader(path)?;
	let [code_idx, display_idx, system_idx] = crate::require_columns(
		path,
		&headers,
		[IDENTIFIER_COLUMN, DISPLAY_COLUMN, SYSTEM_COLUMN],
	)?;
	let rank_idx = crate::column(&headers, RANK_COLUMN);
	let mut entries = Vec::new();

	for (index, record) in reader.records().enumerate() {
		let record = record.map_err(|err| Error::Csv { path: path.to_path_buf(), source: err })?;
		let (Some(code), Some(display)) =
			(crate::cell(&record, Some(code_idx)), crate::cell(&record, Some(display_idx)))
		else {
			tracing::warn!(row = index, "Skipping catalog row without identifier or display.");

			continue;
		};

		entries.push(CatalogEntry {
			code: code.to_string(),
			display: display.to_string(),
			system: crate::cell(&record, Some(system_idx)).unwrap_or_default().to_string(),
			frequency_rank: candidate::parse_frequency_rank(crate::cell(&record, rank_idx)),
		});
	}

	Ok(entries)
}
