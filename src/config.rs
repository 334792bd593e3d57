//! Configuration for replicr
//!
//! Settings follow a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Config file (TOML, given with `--config`)
//! 3. CLI arguments and flags (highest priority)
//!
//! The merged [`Config`] is then checked by [`Config::into_job`], which
//! produces the validated [`MirrorJob`] the driver runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compare::ComparePolicy;
use crate::error::{ConfigError, ErrorKind};
use crate::exclusion::PatternMatcher;
use crate::reconcile::ReconcileOptions;

/// Mirror configuration as read from file and command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// TREES
	// ========================================================================
	/// Authoritative tree to mirror from
	pub source: Option<PathBuf>,

	/// Tree kept identical to the source
	pub replica: Option<PathBuf>,

	// ========================================================================
	// SCHEDULING
	// ========================================================================
	/// Seconds to sleep between passes (0 runs passes back to back)
	pub interval_secs: Option<u64>,

	/// Run a single pass and exit
	pub once: bool,

	// ========================================================================
	// CHANGE DETECTION
	// ========================================================================
	/// How changed files are detected
	pub compare: ComparePolicy,

	/// Glob patterns to leave alone on both sides (e.g., "*.tmp", "**/.git")
	pub exclude_patterns: Vec<String>,

	/// Glob patterns that override exclusions
	pub include_patterns: Vec<String>,

	// ========================================================================
	// ERRORS & LOGGING
	// ========================================================================
	/// Error kinds that abort a pass instead of being logged and skipped
	pub propagate_errors: Vec<ErrorKind>,

	/// Action log file
	pub log_file: Option<PathBuf>,

	/// Diagnostic log level (trace, debug, info, warn, error)
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			source: None,
			replica: None,
			interval_secs: None,
			once: false,
			compare: ComparePolicy::MetadataFirst,
			exclude_patterns: vec![],
			include_patterns: vec![],
			propagate_errors: vec![],
			log_file: None,
			log_level: "info".to_string(),
		}
	}
}

/// A validated mirror job, ready for the driver
#[derive(Debug, Clone)]
pub struct MirrorJob {
	pub source: PathBuf,
	pub replica: PathBuf,
	pub interval: Duration,
	pub log_file: PathBuf,
	pub once: bool,
	pub options: ReconcileOptions,
}

impl Config {
	/// Load a TOML config file
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = fs::read_to_string(path)
			.map_err(|e| ConfigError::ReadFailed { path: path.to_path_buf(), source: e })?;
		Self::parse(&text, path)
	}

	/// Parse TOML config text; `origin` is only used in error messages
	pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
		toml::from_str(text).map_err(|e| ConfigError::ParseFailed {
			path: origin.to_path_buf(),
			message: e.to_string(),
		})
	}

	/// Check the merged settings and build the job
	pub fn into_job(self) -> Result<MirrorJob, ConfigError> {
		let source = self.source.ok_or(ConfigError::Missing { field: "source" })?;
		let replica = self.replica.ok_or(ConfigError::Missing { field: "replica" })?;
		let interval_secs = self.interval_secs.ok_or(ConfigError::Missing { field: "interval" })?;
		let log_file = self.log_file.ok_or(ConfigError::Missing { field: "log file" })?;

		validate_trees(&source, &replica)?;

		let exclude = PatternMatcher::new(&self.exclude_patterns, &self.include_patterns)
			.map_err(|e| ConfigError::Invalid { message: e.to_string() })?;

		Ok(MirrorJob {
			source,
			replica,
			interval: Duration::from_secs(interval_secs),
			log_file,
			once: self.once,
			options: ReconcileOptions {
				compare: self.compare,
				exclude,
				propagate: self.propagate_errors,
			},
		})
	}
}

/// Source and replica must be distinct and must not contain each other,
/// otherwise the mirror would copy into (or delete from) its own input.
pub fn validate_trees(source: &Path, replica: &Path) -> Result<(), ConfigError> {
	let source_abs = absolute(source);
	let replica_abs = absolute(replica);

	if source_abs == replica_abs {
		return Err(ConfigError::Invalid {
			message: format!("source and replica are the same directory: {}", source.display()),
		});
	}
	if is_path_within_root(&replica_abs, &source_abs) {
		return Err(ConfigError::Invalid {
			message: format!(
				"replica {} is inside source {}",
				replica.display(),
				source.display()
			),
		});
	}
	if is_path_within_root(&source_abs, &replica_abs) {
		return Err(ConfigError::Invalid {
			message: format!(
				"source {} is inside replica {}",
				source.display(),
				replica.display()
			),
		});
	}
	Ok(())
}

/// Check if path is within a root directory
pub fn is_path_within_root(path: &Path, root: &Path) -> bool {
	path.starts_with(root)
}

/// Best-effort absolute form: the deepest existing ancestor is
/// canonicalized and the missing remainder appended to it
fn absolute(path: &Path) -> PathBuf {
	let abs = if path.is_absolute() {
		path.to_path_buf()
	} else {
		match std::env::current_dir() {
			Ok(cwd) => cwd.join(path),
			Err(_) => path.to_path_buf(),
		}
	};

	let mut existing = abs.as_path();
	let mut missing = Vec::new();
	loop {
		if let Ok(mut resolved) = fs::canonicalize(existing) {
			for part in missing.iter().rev() {
				resolved.push(part);
			}
			return resolved;
		}
		match (existing.parent(), existing.file_name()) {
			(Some(parent), Some(name)) => {
				missing.push(name.to_os_string());
				existing = parent;
			}
			_ => return abs.clone(),
		}
	}
}


// vim: ts=4
