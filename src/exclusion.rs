//! Pattern-based exclusion using glob patterns
//!
//! Patterns are matched against the path of an entry relative to the tree
//! root (`docs/draft.txt`, not `/home/me/src/docs/draft.txt`). An excluded
//! entry is invisible on both sides: it is not copied, not removed from the
//! replica, and a directory is not descended into. To exclude a directory,
//! match the directory itself (`node_modules`, `**/node_modules`).

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::error::ExclusionError;

/// Pattern matcher using globset for efficient matching
#[derive(Debug, Clone)]
pub struct PatternMatcher {
	/// Compiled exclusion patterns
	exclude_set: GlobSet,

	/// Compiled inclusion patterns (higher priority)
	include_set: Option<GlobSet>,

	/// No patterns at all, skip matching entirely
	empty: bool,
}

impl PatternMatcher {
	/// Create a new pattern matcher
	pub fn new(
		exclude_patterns: &[String],
		include_patterns: &[String],
	) -> Result<Self, ExclusionError> {
		let exclude_set = Self::build_glob_set(exclude_patterns)?;

		let include_set = if !include_patterns.is_empty() {
			Some(Self::build_glob_set(include_patterns)?)
		} else {
			None
		};

		Ok(Self { exclude_set, include_set, empty: exclude_patterns.is_empty() })
	}

	/// A matcher that excludes nothing
	pub fn nothing() -> Self {
		Self { exclude_set: GlobSet::empty(), include_set: None, empty: true }
	}

	/// Build a GlobSet from patterns
	fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ExclusionError> {
		let mut builder = GlobSetBuilder::new();

		for pattern in patterns {
			let glob = Glob::new(pattern)
				.map_err(|e| ExclusionError::InvalidPattern(format!("{}: {}", pattern, e)))?;
			builder.add(glob);
		}

		builder.build().map_err(|e| {
			ExclusionError::InvalidPattern(format!("Failed to build pattern set: {}", e))
		})
	}

	/// Check if a root-relative path is excluded
	pub fn is_excluded(&self, path: &Path) -> bool {
		if self.empty {
			return false;
		}

		// If path matches an include pattern, it's NOT excluded
		if let Some(ref include_set) = self.include_set {
			if include_set.is_match(path) {
				return false;
			}
		}

		self.exclude_set.is_match(path)
	}
}

impl Default for PatternMatcher {
	fn default() -> Self {
		Self::nothing()
	}
}


// vim: ts=4
