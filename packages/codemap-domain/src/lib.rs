pub mod candidate;
pub mod concept_map;
pub mod display;
pub mod field;
pub mod mapping;
pub mod selection;

pub use candidate::{CandidateCode, UNKNOWN_FREQUENCY_RANK};
pub use field::{FieldType, MISSING_CODE, ProprietaryField};
pub use mapping::{MAX_OPTIONS, MappingOption, MappingRow};
pub use selection::RankedMatch;
