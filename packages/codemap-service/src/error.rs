pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Service is throttling requests: {message}")]
	Throttled { message: String },
	#[error("{label} still throttled after {attempts} attempts: {last}")]
	RetriesExhausted { label: String, attempts: u32, last: String },
	#[error("Malformed response: {message}")]
	MalformedResponse { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
}

impl From<codemap_providers::Error> for Error {
	fn from(err: codemap_providers::Error) -> Self {
		match err {
			codemap_providers::Error::Throttled { message } => Self::Throttled { message },
			codemap_providers::Error::InvalidResponse { message } =>
				Self::MalformedResponse { message },
			codemap_providers::Error::SerdeJson(inner) =>
				Self::MalformedResponse { message: inner.to_string() },
			other => Self::Provider { message: other.to_string() },
		}
	}
}

impl From<codemap_storage::Error> for Error {
	fn from(err: codemap_storage::Error) -> Self {
		match err {
			codemap_storage::Error::InvalidArgument(message) => Self::InvalidInput { message },
			other => Self::Index { message: other.to_string() },
		}
	}
}
