//! Content comparison for same-named file pairs.
//!
//! Cheap checks run first and short-circuit: file size, then modification
//! time, and only when both agree a whole-file BLAKE3 digest of each side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use crate::error::SyncError;
use crate::logging::*;

/// Read buffer size used while digesting a file
pub const HASH_BUFFER_SIZE: usize = 4096;

/// Which checks decide that two files differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComparePolicy {
	/// Size, then mtime, then digest. A mismatched mtime is a difference
	/// without reading any content.
	#[default]
	MetadataFirst,

	/// Size, then digest. Modification times are ignored, so a same-size
	/// change with a restored mtime is still caught.
	AlwaysChecksum,
}

impl FromStr for ComparePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"metadata-first" | "metadata" => Ok(Self::MetadataFirst),
			"always-checksum" | "checksum" => Ok(Self::AlwaysChecksum),
			_ => Err(format!(
				"Unknown compare policy: {}. Valid options: metadata-first, always-checksum",
				s
			)),
		}
	}
}

impl fmt::Display for ComparePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MetadataFirst => write!(f, "metadata-first"),
			Self::AlwaysChecksum => write!(f, "always-checksum"),
		}
	}
}

/// Decides whether two files hold the same content
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
	policy: ComparePolicy,
}

impl Comparator {
	pub fn new(policy: ComparePolicy) -> Self {
		Comparator { policy }
	}

	pub fn policy(&self) -> ComparePolicy {
		self.policy
	}

	/// Returns true when every check performed finds the files the same.
	///
	/// Read failures are returned as errors, never folded into `false`.
	pub fn are_identical(&self, a: &Path, b: &Path) -> Result<bool, SyncError> {
		let meta_a = fs::metadata(a).map_err(|e| SyncError::io(a, e))?;
		let meta_b = fs::metadata(b).map_err(|e| SyncError::io(b, e))?;

		if meta_a.len() != meta_b.len() {
			debug!("Size differs: {} ({} != {})", b.display(), meta_a.len(), meta_b.len());
			return Ok(false);
		}

		if self.policy == ComparePolicy::MetadataFirst {
			let mtime_a = meta_a.modified().map_err(|e| SyncError::io(a, e))?;
			let mtime_b = meta_b.modified().map_err(|e| SyncError::io(b, e))?;
			if mtime_a != mtime_b {
				debug!("Modification time differs: {}", b.display());
				return Ok(false);
			}
		}

		let same = fast_hash(a)? == fast_hash(b)?;
		if !same {
			debug!("Content differs: {}", b.display());
		}
		Ok(same)
	}
}

/// Streaming BLAKE3 digest of a whole file
pub fn fast_hash(path: &Path) -> Result<blake3::Hash, SyncError> {
	let mut file = File::open(path).map_err(|e| SyncError::io(path, e))?;
	let mut hasher = blake3::Hasher::new();
	let mut buf = [0u8; HASH_BUFFER_SIZE];

	loop {
		let n = match file.read(&mut buf) {
			Ok(0) => break,
			Ok(n) => n,
			Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
			Err(e) => return Err(SyncError::io(path, e)),
		};
		hasher.update(&buf[..n]);
	}

	Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use filetime::{set_file_mtime, FileTime};
	use tempfile::TempDir;

	fn write_pair(temp: &TempDir, a: &str, b: &str) -> (std::path::PathBuf, std::path::PathBuf) {
		let pa = temp.path().join("a.txt");
		let pb = temp.path().join("b.txt");
		fs::write(&pa, a).unwrap();
		fs::write(&pb, b).unwrap();
		let t = FileTime::from_unix_time(1_600_000_000, 0);
		set_file_mtime(&pa, t).unwrap();
		set_file_mtime(&pb, t).unwrap();
		(pa, pb)
	}

	#[test]
	fn test_fast_hash_matches_blake3() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("file.txt");
		fs::write(&path, "content").unwrap();

		assert_eq!(fast_hash(&path).unwrap(), blake3::hash(b"content"));
	}

	#[test]
	fn test_fast_hash_spans_many_buffers() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("large.txt");
		let data = "Exemplary line.\n".repeat(10000);
		fs::write(&path, &data).unwrap();

		assert_eq!(fast_hash(&path).unwrap(), blake3::hash(data.as_bytes()));
	}

	#[test]
	fn test_fast_hash_missing_file_is_error() {
		let temp = TempDir::new().unwrap();
		assert!(fast_hash(&temp.path().join("nope")).is_err());
	}

	#[test]
	fn test_identical_files() {
		let temp = TempDir::new().unwrap();
		let (a, b) = write_pair(&temp, "content1", "content1");
		assert!(Comparator::default().are_identical(&a, &b).unwrap());
	}

	#[test]
	fn test_size_mismatch() {
		let temp = TempDir::new().unwrap();
		let (a, b) = write_pair(&temp, "content2", "updated_content2");
		assert!(!Comparator::default().are_identical(&a, &b).unwrap());
	}

	#[test]
	fn test_same_size_same_mtime_different_content() {
		let temp = TempDir::new().unwrap();
		let (a, b) = write_pair(&temp, "aaaa", "bbbb");
		assert!(!Comparator::default().are_identical(&a, &b).unwrap());
	}

	#[test]
	fn test_mtime_mismatch_policies() {
		let temp = TempDir::new().unwrap();
		let (a, b) = write_pair(&temp, "same", "same");
		set_file_mtime(&b, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

		assert!(!Comparator::new(ComparePolicy::MetadataFirst).are_identical(&a, &b).unwrap());
		assert!(Comparator::new(ComparePolicy::AlwaysChecksum).are_identical(&a, &b).unwrap());
	}

	#[test]
	fn test_missing_side_is_error() {
		let temp = TempDir::new().unwrap();
		let (a, _) = write_pair(&temp, "x", "x");
		let result = Comparator::default().are_identical(&a, &temp.path().join("gone"));
		assert!(result.is_err());
	}

	#[test]
	fn test_policy_from_str() {
		assert_eq!("checksum".parse::<ComparePolicy>().unwrap(), ComparePolicy::AlwaysChecksum);
		assert_eq!(
			"metadata-first".parse::<ComparePolicy>().unwrap(),
			ComparePolicy::MetadataFirst
		);
		assert!("fuzzy".parse::<ComparePolicy>().is_err());
	}
}

// vim: ts=4
