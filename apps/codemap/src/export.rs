use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Args;
use color_eyre::eyre;
use time::OffsetDateTime;

use codemap_config::Config;
use codemap_domain::concept_map::{self, ConceptMapHeader};
use codemap_storage::mapping_csv;

#[derive(Debug, Args)]
pub struct ExportArgs {
	/// Mapping CSV, either the pipeline output or the validated single-option layout.
	#[arg(long, short = 'i', value_name = "FILE")]
	pub input: PathBuf,
	/// Defaults to `<input stem>_fhir.json` next to the input.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
}

pub fn run(config: &Config, args: ExportArgs) -> color_eyre::Result<()> {
	let rows = mapping_csv::read_rows(&args.input)?;
	let header = ConceptMapHeader {
		name: config.export.name.clone(),
		title: config.export.title.clone(),
		publisher: config.export.publisher.clone(),
		source_system: config.export.source_system.clone(),
		date: OffsetDateTime::now_utc(),
	};
	let map = concept_map::build_concept_map(&header, &rows);
	let output = match args.output {
		Some(output) => output,
		None => default_output(&args.input)?,
	};
	let json = serde_json::to_string_pretty(&map)?;

	fs::write(&output, json)?;

	let elements: usize = map.group.iter().map(|group| group.element.len()).sum();

	tracing::info!(
		input = %args.input.display(),
		output = %output.display(),
		rows = rows.len(),
		groups = map.group.len(),
		elements,
		"Wrote FHIR ConceptMap."
	);
	println!("Wrote {elements} element(s) in {} group(s) to {}.", map.group.len(), output.display());

	Ok(())
}

fn default_output(input: &Path) -> color_eyre::Result<PathBuf> {
	let stem = input
		.file_stem()
		.and_then(|stem| stem.to_str())
		.ok_or_else(|| eyre::eyre!("Input path {} has no file name.", input.display()))?;

	Ok(input.with_file_name(format!("{stem}_fhir.json")))
}
