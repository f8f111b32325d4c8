use std::sync::{Mutex, PoisonError};

use codemap_domain::{CandidateCode, MappingRow, ProprietaryField, RankedMatch};

/// Append-only row accumulator shared by all workers.
#[derive(Debug, Default)]
pub struct MappingSink {
	rows: Mutex<Vec<MappingRow>>,
}
impl MappingSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the output row for one field. Pure; takes no lock.
	pub fn assemble(
		field: &ProprietaryField,
		candidates: &[CandidateCode],
		matches: &[RankedMatch],
	) -> MappingRow {
		MappingRow::assemble(field, candidates, matches)
	}

	pub fn push(&self, row: MappingRow) {
		// Rows are pushed whole, so a poisoned lock still guards consistent data.
		self.rows.lock().unwrap_or_else(PoisonError::into_inner).push(row);
	}

	/// Copy of the rows appended so far.
	pub fn snapshot(&self) -> Vec<MappingRow> {
		self.rows.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	/// Hands the accumulated rows over in append order.
	pub fn into_rows(self) -> Vec<MappingRow> {
		self.rows.into_inner().unwrap_or_else(PoisonError::into_inner)
	}
}
