pub mod export;
pub mod ingest;
pub mod mapper;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use codemap_config::Config;

#[derive(Debug, Parser)]
#[command(
	version = codemap_cli::VERSION,
	rename_all = "kebab",
	styles = codemap_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Map proprietary fields to standard terminology codes.
	Map(mapper::MapArgs),
	/// Embed a standard-code catalog into the vector index.
	Ingest(ingest::IngestArgs),
	/// Convert a mapping CSV into a FHIR ConceptMap.
	ExportFhir(export::ExportArgs),
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = codemap_config::load(&args.config)?;

	init_tracing(&config)?;

	match args.command {
		Command::Map(map) => mapper::run(config, map).await,
		Command::Ingest(ingest) => ingest::run(config, ingest).await,
		Command::ExportFhir(export) => export::run(&config, export),
	}
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}

fn progress_bar(total: usize, label: &str) -> ProgressBar {
	let progress = ProgressBar::new(total as u64);

	if let Ok(style) = ProgressStyle::with_template(&format!(
		"{{spinner:.green}} [{label} {{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
	)) {
		progress.set_style(style.progress_chars("=> "));
	}

	progress
}
