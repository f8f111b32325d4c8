use std::path::PathBuf;

use clap::Args;

use codemap_config::Config;
use codemap_service::{BackoffExecutor, Providers};
use codemap_storage::{catalog, qdrant::QdrantIndex};

const EMBED_LABEL: &str = "catalog embedding";

#[derive(Debug, Args)]
pub struct IngestArgs {
	/// Catalog CSV with STANDARD_IDENTIFIER, STANDARD_DISPLAY, SYSTEM and RANK columns.
	#[arg(long, value_name = "FILE")]
	pub catalog: PathBuf,
	#[arg(long, value_name = "N", default_value_t = 100)]
	pub batch_size: usize,
	/// Drop and recreate the collection before loading.
	#[arg(long)]
	pub create: bool,
}

pub async fn run(config: Config, args: IngestArgs) -> color_eyre::Result<()> {
	let entries = catalog::read_catalog(&args.catalog)?;
	let index = QdrantIndex::new(&config.storage.qdrant)?;

	index.ensure_collection(args.create).await?;

	tracing::info!(
		catalog = %args.catalog.display(),
		entries = entries.len(),
		collection = %config.storage.qdrant.collection,
		"Loaded catalog."
	);

	let providers = Providers::default();
	let backoff = BackoffExecutor::from_config(&config.backoff);
	let cfg = &config.providers.embedding;
	let progress = crate::progress_bar(entries.len(), "ingest");
	let mut stored = 0;

	for batch in entries.chunks(args.batch_size.max(1)) {
		let texts: Vec<String> = batch.iter().map(|entry| entry.display.clone()).collect();
		let vectors =
			backoff.execute(EMBED_LABEL, || providers.embedding.embed(cfg, &texts)).await?;

		stored += index.upsert(batch, vectors).await?;

		progress.inc(batch.len() as u64);
	}

	progress.finish_and_clear();

	tracing::info!(stored, "Catalog ingested.");
	println!("Stored {stored} catalog point(s) in {}.", config.storage.qdrant.collection);

	Ok(())
}
