//! Logging for replicr.
//!
//! Two channels live here:
//!
//! - Diagnostics go through `tracing`. The macros are re-exported so modules
//!   can `use crate::logging::*;` and the subscriber is installed once by the
//!   binary with [`init_tracing`].
//! - The action log records every mutating action the mirror performs. It is
//!   an explicit value ([`ActionLog`]) that the driver opens before the sync
//!   loop and flushes on shutdown. Each entry is one line,
//!   `[YYYY-MM-DD HH:MM:SS] <message>`, appended to the log file and echoed
//!   to standard output.

pub use tracing::{debug, error, info, warn};

use chrono::Local;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SyncError;

/// Timestamp layout used as the prefix of every action log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Initialize the tracing subscriber with environment filter support.
///
/// `default_level` is used when `RUST_LOG` is not set:
///
/// ```bash
/// RUST_LOG=debug replicr src dst 10 sync.log
/// RUST_LOG=replicr::reconcile=trace replicr src dst 10 sync.log
/// ```
pub fn init_tracing(default_level: &str) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.try_init();
}

/// One entry of the action log
#[derive(Debug, Clone, PartialEq)]
pub enum Action<'a> {
	/// An extra replica entry was deleted
	Removed(&'a Path),

	/// A file new to the replica was copied
	Copied { source: &'a Path, replica: &'a Path },

	/// An existing replica file was overwritten with changed content
	Updated { source: &'a Path, replica: &'a Path },

	/// The source directory of a pass is missing
	SourceMissing(&'a Path),

	/// An operation failed and was abandoned
	Failed { function: &'a str, details: String },
}

impl fmt::Display for Action<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Action::Removed(path) => write!(f, "Removed '{}'", path.display()),
			Action::Copied { source, replica } => {
				write!(f, "Copied '{}' to '{}'", source.display(), replica.display())
			}
			Action::Updated { source, replica } => {
				write!(f, "Updated '{}' to '{}'", source.display(), replica.display())
			}
			Action::SourceMissing(path) => {
				write!(f, "Source directory '{}' does not exist!", path.display())
			}
			Action::Failed { function, details } => {
				write!(f, "An error occurred in function '{}': {}", function, details)
			}
		}
	}
}

/// Append-only action log file, echoed to stdout
#[derive(Debug)]
pub struct ActionLog {
	path: PathBuf,
	file: Mutex<File>,
	echo: bool,
}

impl ActionLog {
	/// Open (or create) the log file for appending
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
		let path = path.into();
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
			}
		}
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.map_err(|e| SyncError::io(&path, e))?;
		Ok(ActionLog { path, file: Mutex::new(file), echo: true })
	}

	/// Disable the stdout echo (the file is still written)
	pub fn quiet(mut self) -> Self {
		self.echo = false;
		self
	}

	/// Path of the underlying log file
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Record an action.
	///
	/// A failure to write the log line is reported through tracing and
	/// otherwise ignored: losing a log line must not stop the mirror.
	pub fn record(&self, action: &Action<'_>) {
		let line = format!("[{}] {}\n", Local::now().format(TIMESTAMP_FORMAT), action);

		if self.echo {
			print!("{}", line);
		}

		// One write_all per line under the lock keeps lines whole
		let mut file = match self.file.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		};
		if let Err(e) = file.write_all(line.as_bytes()) {
			error!("Cannot write to action log {}: {}", self.path.display(), e);
		}
	}

	/// Flush buffered data to disk
	pub fn flush(&self) -> Result<(), SyncError> {
		let mut file = match self.file.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		};
		file.flush().map_err(|e| SyncError::io(&self.path, e))?;
		file.sync_data().map_err(|e| SyncError::io(&self.path, e))
	}
}


// vim: ts=4
