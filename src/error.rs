//! Error types for replicr operations

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

/// Main error type for mirror operations
#[derive(Debug)]
pub enum SyncError {
	/// A filesystem operation failed on a path
	Io { path: PathBuf, source: io::Error },

	/// A path that should name a directory entry has no file name
	InvalidEntry { path: PathBuf },

	/// Invalid configuration
	Config(ConfigError),

	/// Invalid exclusion pattern
	Exclusion(ExclusionError),

	/// Blocking worker failed to complete
	Worker { message: String },
}

impl SyncError {
	/// Wrap an I/O error together with the path it happened on
	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		SyncError::Io { path: path.into(), source }
	}

	/// Classify this error for the propagation allow-list
	pub fn kind(&self) -> ErrorKind {
		match self {
			SyncError::Io { source, .. } => match source.kind() {
				io::ErrorKind::NotFound => ErrorKind::NotFound,
				io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
				_ => ErrorKind::Io,
			},
			SyncError::InvalidEntry { .. } | SyncError::Worker { .. } => ErrorKind::Contract,
			SyncError::Config(_) | SyncError::Exclusion(_) => ErrorKind::Config,
		}
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
			SyncError::InvalidEntry { path } => {
				write!(f, "Path has no file name: {}", path.display())
			}
			SyncError::Config(e) => write!(f, "Configuration error: {}", e),
			SyncError::Exclusion(e) => write!(f, "Exclusion error: {}", e),
			SyncError::Worker { message } => write!(f, "Sync worker failed: {}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io { source, .. } => Some(source),
			SyncError::Config(e) => Some(e),
			SyncError::Exclusion(e) => Some(e),
			_ => None,
		}
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

impl From<ExclusionError> for SyncError {
	fn from(e: ExclusionError) -> Self {
		SyncError::Exclusion(e)
	}
}

/// Error categories that can be named on the propagation allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
	/// Any I/O failure not covered by a more specific kind
	Io,

	/// An entry vanished between scan and use
	NotFound,

	/// Permission denied on a path
	PermissionDenied,

	/// Programming or contract violation
	Contract,

	/// Configuration problem
	Config,
}

impl FromStr for ErrorKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"io" => Ok(Self::Io),
			"not-found" | "notfound" => Ok(Self::NotFound),
			"permission-denied" | "permission" => Ok(Self::PermissionDenied),
			"contract" => Ok(Self::Contract),
			"config" => Ok(Self::Config),
			_ => Err(format!(
				"Unknown error kind: {}. Valid options: io, not-found, permission-denied, contract, config",
				s
			)),
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Io => write!(f, "io"),
			Self::NotFound => write!(f, "not-found"),
			Self::PermissionDenied => write!(f, "permission-denied"),
			Self::Contract => write!(f, "contract"),
			Self::Config => write!(f, "config"),
		}
	}
}

/// Configuration loading and validation errors
#[derive(Debug)]
pub enum ConfigError {
	/// Failed to read the config file
	ReadFailed { path: PathBuf, source: io::Error },

	/// Config file is not valid TOML for this schema
	ParseFailed { path: PathBuf, message: String },

	/// A required setting was not given anywhere
	Missing { field: &'static str },

	/// A setting has an unusable value
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ReadFailed { path, source } => {
				write!(f, "Cannot read config file {}: {}", path.display(), source)
			}
			ConfigError::ParseFailed { path, message } => {
				write!(f, "Cannot parse config file {}: {}", path.display(), message)
			}
			ConfigError::Missing { field } => write!(f, "Missing required setting: {}", field),
			ConfigError::Invalid { message } => write!(f, "Invalid setting: {}", message),
		}
	}
}

impl Error for ConfigError {}

/// Errors that can occur while building the exclusion matcher
#[derive(Debug)]
pub enum ExclusionError {
	/// Failed to parse a glob pattern
	InvalidPattern(String),
}

impl fmt::Display for ExclusionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExclusionError::InvalidPattern(msg) => {
				write!(f, "Invalid exclusion pattern: {}", msg)
			}
		}
	}
}

impl Error for ExclusionError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_io_error_kind_classification() {
		let err = SyncError::io("/a", io::Error::new(io::ErrorKind::NotFound, "gone"));
		assert_eq!(err.kind(), ErrorKind::NotFound);

		let err = SyncError::io("/a", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
		assert_eq!(err.kind(), ErrorKind::PermissionDenied);

		let err = SyncError::io("/a", io::Error::new(io::ErrorKind::Other, "disk full"));
		assert_eq!(err.kind(), ErrorKind::Io);
	}

	#[test]
	fn test_invalid_entry_is_contract() {
		let err = SyncError::InvalidEntry { path: PathBuf::from("/") };
		assert_eq!(err.kind(), ErrorKind::Contract);
	}

	#[test]
	fn test_error_kind_from_str() {
		assert_eq!("io".parse::<ErrorKind>().unwrap(), ErrorKind::Io);
		assert_eq!("Permission-Denied".parse::<ErrorKind>().unwrap(), ErrorKind::PermissionDenied);
		assert!("bogus".parse::<ErrorKind>().is_err());
	}

	#[test]
	fn test_io_display_includes_path() {
		let err = SyncError::io("/tmp/x", io::Error::new(io::ErrorKind::Other, "boom"));
		let msg = err.to_string();
		assert!(msg.contains("/tmp/x"));
		assert!(msg.contains("boom"));
	}
}

// vim: ts=4
