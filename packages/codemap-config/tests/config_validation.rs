use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use codemap_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("codemap_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let result = codemap_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Sample config must be valid.");

	assert_eq!(cfg.providers.embedding.api_base, "https://api.example.com/v1");
	assert_eq!(cfg.pipeline.top_k, 30);
	assert_eq!(cfg.providers.llm_expander.max_tokens, 1_000);
	assert_eq!(cfg.providers.llm_ranker.max_tokens, 2_000);
	assert_eq!(cfg.export.name, "EHRCodeMappings");
	assert_eq!(cfg.export.source_system, "Proprietary Code System");
}

#[test]
fn omitted_sections_fall_back_to_defaults() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let table = root.as_table_mut().expect("Sample config must be a table.");

	table.remove("pipeline");
	table.remove("backoff");
	table.remove("export");

	let cfg: Config = toml::from_str(&toml::to_string(&root).expect("Failed to render config."))
		.expect("Failed to parse trimmed config.");

	assert_eq!(cfg.pipeline.workers, 4);
	assert_eq!(cfg.pipeline.max_matches, 3);
	assert!((cfg.pipeline.confidence_threshold - 0.65).abs() < f32::EPSILON);
	assert_eq!(cfg.backoff.max_attempts, 8);
	assert_eq!(cfg.backoff.base_delay_ms, 1_000);
	assert_eq!(cfg.export.publisher, "EHR Code Mapper");
	assert!(codemap_config::validate(&cfg).is_ok());
}

#[test]
fn missing_file_is_a_read_error() {
	let mut path = env::temp_dir();

	path.push("codemap_config_test_missing_file.toml");

	let err = codemap_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn malformed_toml_is_a_parse_error() {
	let path = write_temp_config("[service\nlog_level = ".to_string());
	let result = codemap_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn workers_must_be_positive() {
	let payload = sample_toml_with("pipeline", "workers", Value::Integer(0));
	let path = write_temp_config(payload);
	let result = codemap_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected workers validation error.");

	assert!(
		err.to_string().contains("pipeline.workers must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn max_matches_must_be_within_bounds() {
	let mut cfg = base_config();

	cfg.pipeline.max_matches = 4;

	let err = codemap_config::validate(&cfg).expect_err("Expected max_matches validation error.");

	assert!(
		err.to_string().contains("pipeline.max_matches must be in the range 1-3."),
		"Unexpected error: {err}"
	);

	cfg.pipeline.max_matches = 1;

	assert!(codemap_config::validate(&cfg).is_ok());
}

#[test]
fn confidence_threshold_must_be_finite() {
	let mut cfg = base_config();

	cfg.pipeline.confidence_threshold = f32::NAN;

	let err = codemap_config::validate(&cfg).expect_err("Expected threshold validation error.");

	assert!(
		err.to_string().contains("pipeline.confidence_threshold must be a finite number."),
		"Unexpected error: {err}"
	);
}

#[test]
fn backoff_attempts_are_bounded() {
	let mut cfg = base_config();

	cfg.backoff.max_attempts = 0;

	let err = codemap_config::validate(&cfg).expect_err("Expected max_attempts validation error.");

	assert!(
		err.to_string().contains("backoff.max_attempts must be greater than zero."),
		"Unexpected error: {err}"
	);

	cfg.backoff.max_attempts = 17;

	let err = codemap_config::validate(&cfg).expect_err("Expected max_attempts upper bound.");

	assert!(
		err.to_string().contains("backoff.max_attempts must be 16 or less."),
		"Unexpected error: {err}"
	);
}

#[test]
fn embedding_dimensions_must_match_index() {
	let payload = sample_toml_with("providers.embedding", "dimensions", Value::Integer(768));
	let path = write_temp_config(payload);
	let result = codemap_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected dimension mismatch error.");

	assert!(
		err.to_string()
			.contains("providers.embedding.dimensions must match storage.qdrant.vector_dim."),
		"Unexpected error: {err}"
	);
}

#[test]
fn provider_api_keys_must_be_present() {
	let mut cfg = base_config();

	cfg.providers.llm_ranker.api_key = "  ".to_string();

	let err = codemap_config::validate(&cfg).expect_err("Expected api_key validation error.");

	assert!(
		err.to_string().contains("Provider llm_ranker api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn collection_name_must_be_present() {
	let payload = sample_toml_with("storage.qdrant", "collection", Value::String(" ".to_string()));
	let path = write_temp_config(payload);
	let result = codemap_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected collection validation error.");

	assert!(
		err.to_string().contains("storage.qdrant.collection must be non-empty."),
		"Unexpected error: {err}"
	);
}
