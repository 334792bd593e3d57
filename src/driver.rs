//! Periodic driver: reconcile, sleep, repeat until told to stop.
//!
//! Each tick runs the (blocking) reconciler on a worker thread so the
//! runtime stays free to notice SIGINT/SIGTERM. A tick is never interrupted;
//! a shutdown request is honoured once the running tick has finished.

use std::sync::Arc;

use crate::config::MirrorJob;
use crate::error::SyncError;
use crate::logging::*;
use crate::reconcile::{Reconciler, SyncReport};

/// Run `job` until shutdown (or a single tick when `job.once` is set).
///
/// The action log is opened before the first tick and flushed on exit.
pub async fn run(job: MirrorJob) -> Result<(), SyncError> {
	let log = Arc::new(ActionLog::open(&job.log_file)?);
	let mut signals = ShutdownSignals::install()?;

	info!(
		"Mirroring {} -> {} every {}s (log: {})",
		job.source.display(),
		job.replica.display(),
		job.interval.as_secs(),
		log.path().display()
	);

	let mut ticks: u64 = 0;
	loop {
		ticks += 1;
		debug!("Tick {}", ticks);
		tick(&job, &log).await;

		if job.once {
			break;
		}

		tokio::select! {
			_ = tokio::time::sleep(job.interval) => {}
			_ = signals.recv() => {
				info!("Shutdown requested, stopping after {} passes", ticks);
				break;
			}
		}
	}

	log.flush()
}

/// One full pass over the tree.
///
/// Errors that escape the reconciler (allow-listed kinds, a crashed worker)
/// are written to the action log; the next tick starts from scratch.
pub async fn tick(job: &MirrorJob, log: &Arc<ActionLog>) -> Option<SyncReport> {
	let source = job.source.clone();
	let replica = job.replica.clone();
	let options = job.options.clone();
	let worker_log = Arc::clone(log);

	let joined = tokio::task::spawn_blocking(move || {
		Reconciler::new(&worker_log, options).reconcile(&source, &replica)
	})
	.await;

	let result = match joined {
		Ok(result) => result,
		Err(e) => Err(SyncError::Worker { message: e.to_string() }),
	};

	match result {
		Ok(report) => {
			if report.changes() > 0 || report.errors > 0 {
				info!(
					"Pass done: {} copied, {} updated, {} removed, {} directories created, {} errors",
					report.copied, report.updated, report.removed, report.dirs_created, report.errors
				);
			} else {
				debug!("Pass done: {} files unchanged", report.unchanged);
			}
			Some(report)
		}
		Err(e) => {
			error!("Pass aborted: {}", e);
			log.record(&Action::Failed { function: "reconcile", details: e.to_string() });
			None
		}
	}
}

/// SIGINT/SIGTERM listeners, registered up front so a signal that arrives
/// during a tick is still seen afterwards
#[cfg(unix)]
struct ShutdownSignals {
	sigterm: tokio::signal::unix::Signal,
	sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
	fn install() -> Result<Self, SyncError> {
		use tokio::signal::unix::{signal, SignalKind};

		let sigterm = signal(SignalKind::terminate())
			.map_err(|e| SyncError::Worker { message: format!("SIGTERM handler: {}", e) })?;
		let sigint = signal(SignalKind::interrupt())
			.map_err(|e| SyncError::Worker { message: format!("SIGINT handler: {}", e) })?;
		Ok(ShutdownSignals { sigterm, sigint })
	}

	async fn recv(&mut self) {
		tokio::select! {
			_ = self.sigterm.recv() => debug!("Received SIGTERM"),
			_ = self.sigint.recv() => debug!("Received SIGINT"),
		}
	}
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
	fn install() -> Result<Self, SyncError> {
		Ok(ShutdownSignals)
	}

	async fn recv(&mut self) {
		if let Err(e) = tokio::signal::ctrl_c().await {
			warn!("Failed to listen for Ctrl-C: {}", e);
			std::future::pending::<()>().await;
		}
	}
}


// vim: ts=4
