use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to access {path:?}.")]
	Io { path: PathBuf, source: std::io::Error },
	#[error("Failed to read or write CSV at {path:?}.")]
	Csv { path: PathBuf, source: csv::Error },
	#[error("{path:?} is missing required columns: {}.", columns.join(", "))]
	MissingColumns { path: PathBuf, columns: Vec<String> },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
