pub mod catalog;
pub mod mapping_csv;
pub mod qdrant;
pub mod records;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::{fs::File, path::Path};

use csv::{Reader, ReaderBuilder, StringRecord};

fn open_reader(path: &Path) -> Result<(Reader<File>, StringRecord)> {
	let mut reader = ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.from_path(path)
		.map_err(|err| Error::Csv { path: path.to_path_buf(), source: err })?;
	let headers = reader
		.headers()
		.map_err(|err| Error::Csv { path: path.to_path_buf(), source: err })?
		.clone();

	Ok((reader, headers))
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
	headers.iter().position(|header| header.trim() == name)
}

fn require_columns<const N: usize>(
	path: &Path,
	headers: &StringRecord,
	names: [&str; N],
) -> Result<[usize; N]> {
	let missing: Vec<String> = names
		.iter()
		.filter(|name| column(headers, name).is_none())
		.map(|name| name.to_string())
		.collect();

	if !missing.is_empty() {
		return Err(Error::MissingColumns { path: path.to_path_buf(), columns: missing });
	}

	Ok(names.map(|name| column(headers, name).unwrap_or_default()))
}

/// Non-blank cell value, trimmed.
fn cell(record: &StringRecord, index: Option<usize>) -> Option<&str> {
	index.and_then(|index| record.get(index)).map(str::trim).filter(|value| !value.is_empty())
}
