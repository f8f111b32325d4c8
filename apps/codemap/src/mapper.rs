use std::{path::PathBuf, sync::Arc, time::Instant};

use clap::Args;

use codemap_config::Config;
use codemap_service::{CodemapService, DispatchReport, Dispatcher, dispatch::ProgressHook};
use codemap_storage::{mapping_csv, qdrant::QdrantIndex, records};

#[derive(Debug, Args)]
pub struct MapArgs {
	/// Proprietary field CSV.
	#[arg(long, short = 'i', value_name = "FILE")]
	pub input: PathBuf,
	/// Mapping CSV to write.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: PathBuf,
	/// Overrides `pipeline.workers`.
	#[arg(long, value_name = "N")]
	pub workers: Option<usize>,
}

pub async fn run(config: Config, args: MapArgs) -> color_eyre::Result<()> {
	let fields = records::read_fields(&args.input)?;
	let index = QdrantIndex::new(&config.storage.qdrant)?;
	let workers = args.workers.unwrap_or(config.pipeline.workers);
	let mappable = fields.iter().filter(|field| field.has_display()).count();

	tracing::info!(
		input = %args.input.display(),
		records = fields.len(),
		mappable,
		workers,
		"Loaded proprietary fields."
	);

	let service = Arc::new(CodemapService::new(config, Arc::new(index)));
	let progress = crate::progress_bar(mappable, "map");
	let hook: ProgressHook = {
		let progress = progress.clone();

		Arc::new(move || progress.inc(1))
	};
	let started = Instant::now();
	let report = Dispatcher::new(service).with_workers(workers).with_progress(hook).run(fields).await;

	progress.finish_and_clear();
	mapping_csv::write_rows(&args.output, &report.rows)?;

	tracing::info!(
		output = %args.output.display(),
		rows = report.rows.len(),
		elapsed_ms = started.elapsed().as_millis() as u64,
		"Wrote mapping CSV."
	);

	print_summary(&report, started.elapsed().as_secs_f64());

	Ok(())
}

fn print_summary(report: &DispatchReport, elapsed_secs: f64) {
	println!("Mapped {} field(s) in {elapsed_secs:.1}s.", report.mapped);
	println!("  skipped (empty display): {}", report.skipped_empty);
	println!("  no candidates:           {}", report.no_candidates);
	println!("  no valid selections:     {}", report.no_matches);
	println!("  failed:                  {}", report.failed);
}
