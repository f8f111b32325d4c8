use serde::{Deserialize, Serialize};

/// Frequency rank reported when the catalog carries none.
pub const UNKNOWN_FREQUENCY_RANK: i64 = -1;

/// A standard code returned by the vector index for one query.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CandidateCode {
	pub code: String,
	pub display: String,
	pub system: String,
	pub frequency_rank: i64,
	/// Lower is closer.
	pub distance: f32,
}
impl CandidateCode {
	/// Option line shown to the ranking service.
	pub fn option_line(&self) -> String {
		format!("Code: {}, Display: {}, Rank: {}.", self.code, self.display, self.frequency_rank)
	}
}

/// Parses a catalog rank cell. Missing or unparseable values become [`UNKNOWN_FREQUENCY_RANK`].
pub fn parse_frequency_rank(raw: Option<&str>) -> i64 {
	let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
		return UNKNOWN_FREQUENCY_RANK;
	};

	if let Ok(value) = raw.parse::<i64>() {
		return value;
	}

	// Integer columns may arrive float-formatted, e.g. `42.0`.
	match raw.parse::<f64>() {
		Ok(value) if value.is_finite() && value.fract() == 0.0 => value as i64,
		_ => UNKNOWN_FREQUENCY_RANK,
	}
}
