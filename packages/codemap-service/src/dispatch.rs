use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use tokio::sync::{Mutex, mpsc};

use crate::{CodemapService, MappingSink, Result};
use codemap_domain::{MappingRow, ProprietaryField};

/// Called once per dequeued record after it has been handled, whatever the outcome.
pub type ProgressHook = Arc<dyn Fn() + Send + Sync>;

type Queue = Arc<Mutex<mpsc::UnboundedReceiver<ProprietaryField>>>;

#[derive(Debug)]
pub enum FieldOutcome {
	Mapped(MappingRow),
	/// The index returned nothing for the field.
	NoCandidates,
	/// Every selection the ranking service made was dropped.
	NoMatches,
}

#[derive(Clone, Debug, Default)]
pub struct DispatchReport {
	pub rows: Vec<MappingRow>,
	pub mapped: usize,
	pub skipped_empty: usize,
	pub no_candidates: usize,
	pub no_matches: usize,
	pub failed: usize,
}

#[derive(Default)]
struct RunState {
	sink: MappingSink,
	mapped: AtomicUsize,
	no_candidates: AtomicUsize,
	no_matches: AtomicUsize,
	failed: AtomicUsize,
}

/// Fixed pool of workers draining a queue that is filled once before they start.
pub struct Dispatcher {
	service: Arc<CodemapService>,
	workers: usize,
	poll_timeout: Duration,
	progress: Option<ProgressHook>,
}
impl Dispatcher {
	pub fn new(service: Arc<CodemapService>) -> Self {
		let workers = service.cfg.pipeline.workers.max(1);
		let poll_timeout = Duration::from_millis(service.cfg.pipeline.poll_timeout_ms);

		Self { service, workers, poll_timeout, progress: None }
	}

	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = workers.max(1);

		self
	}

	pub fn with_progress(mut self, progress: ProgressHook) -> Self {
		self.progress = Some(progress);

		self
	}

	/// Maps every field with a display and reports what happened. Per-record failures, panics
	/// included, are logged and counted as failed; the run itself does not fail.
	pub async fn run(&self, fields: Vec<ProprietaryField>) -> DispatchReport {
		let (tx, rx) = mpsc::unbounded_channel();
		let mut skipped_empty = 0;

		for field in fields {
			if !field.has_display() {
				tracing::debug!(record_index = field.index, "Skipping field without display.");

				skipped_empty += 1;

				continue;
			}

			// The receiver is alive until the workers are spawned below.
			let _ = tx.send(field);
		}

		drop(tx);

		let queue: Queue = Arc::new(Mutex::new(rx));
		let state = Arc::new(RunState::default());
		let mut handles = Vec::with_capacity(self.workers);

		for worker in 0..self.workers {
			handles.push(tokio::spawn(work(
				worker,
				Arc::clone(&self.service),
				Arc::clone(&queue),
				Arc::clone(&state),
				self.poll_timeout,
				self.progress.clone(),
			)));
		}

		for handle in handles {
			if let Err(err) = handle.await {
				tracing::error!(error = %err, "Worker task failed.");
			}
		}

		match Arc::try_unwrap(state) {
			Ok(state) => DispatchReport {
				rows: state.sink.into_rows(),
				mapped: state.mapped.into_inner(),
				skipped_empty,
				no_candidates: state.no_candidates.into_inner(),
				no_matches: state.no_matches.into_inner(),
				failed: state.failed.into_inner(),
			},
			Err(shared) => DispatchReport {
				rows: shared.sink.snapshot(),
				mapped: shared.mapped.load(Ordering::SeqCst),
				skipped_empty,
				no_candidates: shared.no_candidates.load(Ordering::SeqCst),
				no_matches: shared.no_matches.load(Ordering::SeqCst),
				failed: shared.failed.load(Ordering::SeqCst),
			},
		}
	}
}

/// Runs one record through resolution, ranking and assembly.
pub async fn process_field(service: &CodemapService, field: &ProprietaryField) -> Result<FieldOutcome> {
	let candidates = service.resolver().resolve(field).await?;

	if candidates.is_empty() {
		return Ok(FieldOutcome::NoCandidates);
	}

	let matches = service.invoker().rank(field, &candidates).await?;

	if matches.is_empty() {
		return Ok(FieldOutcome::NoMatches);
	}

	Ok(FieldOutcome::Mapped(MappingSink::assemble(field, &candidates, &matches)))
}

async fn work(
	worker: usize,
	service: Arc<CodemapService>,
	queue: Queue,
	state: Arc<RunState>,
	poll_timeout: Duration,
	progress: Option<ProgressHook>,
) {
	loop {
		let next = {
			let mut rx = queue.lock().await;

			tokio::time::timeout(poll_timeout, rx.recv()).await
		};
		let field = match next {
			Ok(Some(field)) => field,
			Ok(None) | Err(_) => break,
		};

		let record_index = field.index;
		let field_display = field.display.clone();
		// Each record runs in its own task so a panic costs only that record.
		let task = {
			let service = Arc::clone(&service);

			tokio::spawn(async move { process_field(&service, &field).await })
		};

		match task.await {
			Ok(Ok(FieldOutcome::Mapped(row))) => {
				state.sink.push(row);
				state.mapped.fetch_add(1, Ordering::SeqCst);
			},
			Ok(Ok(FieldOutcome::NoCandidates)) => {
				tracing::warn!(record_index, display = %field_display, "No candidates found. Skipping field.");

				state.no_candidates.fetch_add(1, Ordering::SeqCst);
			},
			Ok(Ok(FieldOutcome::NoMatches)) => {
				tracing::warn!(
					record_index,
					display = %field_display,
					"Ranking kept no matches. Skipping field."
				);

				state.no_matches.fetch_add(1, Ordering::SeqCst);
			},
			Ok(Err(err)) => {
				tracing::error!(record_index, display = %field_display, error = %err, "Failed to map field.");

				state.failed.fetch_add(1, Ordering::SeqCst);
			},
			Err(err) => {
				tracing::error!(
					record_index,
					display = %field_display,
					error = %err,
					"Field task aborted. Counting field as failed."
				);

				state.failed.fetch_add(1, Ordering::SeqCst);
			},
		}

		if let Some(progress) = &progress {
			progress();
		}
	}

	tracing::debug!(worker, "Queue drained. Worker exiting.");
}
