//! One-way reconciliation of a replica tree against its source tree.
//!
//! The tree is walked depth-first with an explicit worklist of
//! (source, replica) directory pairs. Each level is handled in two passes:
//!
//! 1. Deletion: replica entries with no source counterpart, or whose kind
//!    differs from the source entry of the same name, are removed.
//! 2. Copy/recurse: new files are copied, changed files are overwritten,
//!    directories are created as needed and pushed onto the worklist.
//!
//! Deletion always completes before any copy in the same level, so an entry
//! that changed kind (file to directory or back) is gone before its
//! replacement is created. A source entry that could not be classified is
//! reported as an error and its replica counterpart is kept as is.

use filetime::{set_file_times, FileTime};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compare::{ComparePolicy, Comparator};
use crate::error::{ErrorKind, SyncError};
use crate::exclusion::PatternMatcher;
use crate::guard::OperationGuard;
use crate::logging::*;
use crate::snapshot::{DirectoryEntry, DirectorySnapshot, EntryKind, LinkMode};

/// Knobs for a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
	/// How changed files are detected
	pub compare: ComparePolicy,

	/// Entries left alone on both sides
	pub exclude: PatternMatcher,

	/// Error kinds that abort the pass instead of being logged and skipped
	pub propagate: Vec<ErrorKind>,
}

/// What one pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
	/// Files new to the replica
	pub copied: usize,

	/// Replica files overwritten with changed content
	pub updated: usize,

	/// Replica entries (files or whole subtrees) deleted
	pub removed: usize,

	/// Replica directories created
	pub dirs_created: usize,

	/// Files found identical
	pub unchanged: usize,

	/// Directory levels reconciled
	pub directories: usize,

	/// Operations that failed and were skipped
	pub errors: usize,

	/// The source root did not exist, nothing was touched
	pub source_missing: bool,
}

impl SyncReport {
	/// Number of mutating actions performed
	pub fn changes(&self) -> usize {
		self.copied + self.updated + self.removed + self.dirs_created
	}
}

/// Per-name outcome within one directory level
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDecision<'a> {
	/// Replica entry has no matching source entry
	Delete(&'a DirectoryEntry),

	/// Source file is new to the replica
	Create(&'a DirectoryEntry),

	/// Directory present on both sides (or about to be)
	Recurse(&'a DirectoryEntry),

	/// File present on both sides and identical
	Skip(&'a DirectoryEntry),

	/// File present on both sides with different content
	Overwrite(&'a DirectoryEntry),
}

/// Replica entries to remove before anything is copied into this level.
///
/// Covers names missing from the source and names whose kind differs.
/// A name the source could not classify is never deleted.
pub fn plan_deletions<'a>(
	source: &DirectorySnapshot,
	replica: &'a DirectorySnapshot,
) -> Vec<SyncDecision<'a>> {
	replica
		.iter()
		.filter(|entry| match source.get(&entry.name) {
			None => true,
			Some(src) if src.kind == EntryKind::Unknown => false,
			Some(src) => src.kind != entry.kind,
		})
		.map(SyncDecision::Delete)
		.collect()
}

/// Work item: one directory level to reconcile
struct Level {
	source: PathBuf,
	replica: PathBuf,
	/// Path relative to the tree roots, used for exclusion matching
	relative: PathBuf,
	/// Canonical source path, used to detect symlink cycles
	canonical: PathBuf,
}

/// Mirrors a source tree onto a replica tree
pub struct Reconciler<'a> {
	log: &'a ActionLog,
	comparator: Comparator,
	options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
	pub fn new(log: &'a ActionLog, options: ReconcileOptions) -> Self {
		Reconciler { log, comparator: Comparator::new(options.compare), options }
	}

	/// Make `replica` an exact copy of `source`.
	///
	/// A missing source is logged and leaves the replica untouched. Failed
	/// operations are logged and skipped; only error kinds on the
	/// propagation list end the pass early with `Err`.
	pub fn reconcile(&self, source: &Path, replica: &Path) -> Result<SyncReport, SyncError> {
		let guard = OperationGuard::new(self.log, &self.options.propagate);
		let mut report = SyncReport::default();

		if !source.exists() {
			self.log.record(&Action::SourceMissing(source));
			report.source_missing = true;
			return Ok(report);
		}

		let canonical = match guard.run("canonicalize_source", || {
			fs::canonicalize(source).map_err(|e| SyncError::io(source, e))
		})? {
			Some(path) => path,
			None => {
				report.errors = guard.swallowed();
				return Ok(report);
			}
		};

		debug!("Comparing files with the {} policy", self.comparator.policy());
		let mut worklist = vec![Level {
			source: source.to_path_buf(),
			replica: replica.to_path_buf(),
			relative: PathBuf::new(),
			canonical,
		}];

		while let Some(level) = worklist.pop() {
			self.reconcile_level(level, &guard, &mut report, &mut worklist)?;
		}

		report.errors = guard.swallowed();
		debug!(
			"Reconciled {} directories: {} copied, {} updated, {} removed, {} errors",
			report.directories, report.copied, report.updated, report.removed, report.errors
		);
		Ok(report)
	}

	fn reconcile_level(
		&self,
		level: Level,
		guard: &OperationGuard<'_>,
		report: &mut SyncReport,
		worklist: &mut Vec<Level>,
	) -> Result<(), SyncError> {
		debug!("Reconciling {} -> {}", level.source.display(), level.replica.display());

		// The source may vanish between the parent scan and now
		if !level.source.exists() {
			self.log.record(&Action::SourceMissing(&level.source));
			return Ok(());
		}

		let created = guard.run("create_replica_dir", || ensure_dir(&level.replica))?;
		match created {
			Some(true) => report.dirs_created += 1,
			Some(false) => {}
			None => return Ok(()),
		}

		let mut source_snap = match guard
			.run("scan_directory", || DirectorySnapshot::read(&level.source, LinkMode::Follow))?
		{
			Some(snap) => self.without_excluded(snap, &level.relative),
			None => return Ok(()),
		};
		for failure in source_snap.take_failures() {
			guard.run("scan_directory", || Err::<(), _>(failure))?;
		}
		let replica_snap = match guard
			.run("scan_directory", || DirectorySnapshot::read(&level.replica, LinkMode::NoFollow))?
		{
			Some(snap) => self.without_excluded(snap, &level.relative),
			None => return Ok(()),
		};
		report.directories += 1;

		// Deletion pass
		for decision in plan_deletions(&source_snap, &replica_snap) {
			if let SyncDecision::Delete(entry) = decision {
				if guard.run("remove_entry", || remove_entry(entry))?.is_some() {
					self.log.record(&Action::Removed(&entry.path));
					report.removed += 1;
				}
			}
		}

		// Copy/recurse pass
		let mut subdirs = Vec::new();
		for src in source_snap.iter() {
			if src.kind == EntryKind::Unknown {
				continue;
			}
			let target = level.replica.join(&src.name);

			match self.decide(src, &replica_snap, &target) {
				SyncDecision::Recurse(dir) => {
					let canonical = match guard.run("canonicalize_source", || {
						fs::canonicalize(&dir.path).map_err(|e| SyncError::io(&dir.path, e))
					})? {
						Some(path) => path,
						None => continue,
					};
					if level.canonical.starts_with(&canonical) {
						warn!("Skipping symlink cycle at {}", dir.path.display());
						continue;
					}

					let created = guard.run("create_replica_dir", || ensure_dir(&target))?;
					match created {
						Some(true) => report.dirs_created += 1,
						Some(false) => {}
						None => continue,
					}

					subdirs.push(Level {
						source: dir.path.clone(),
						replica: target,
						relative: level.relative.join(&dir.name),
						canonical,
					});
				}
				SyncDecision::Create(file) => {
					if guard.run("copy_file", || copy_file(&file.path, &target))?.is_some() {
						self.log.record(&Action::Copied { source: &file.path, replica: &target });
						report.copied += 1;
					}
				}
				SyncDecision::Overwrite(file) => {
					if guard.run("copy_file", || copy_file(&file.path, &target))?.is_some() {
						self.log.record(&Action::Updated { source: &file.path, replica: &target });
						report.updated += 1;
					}
				}
				SyncDecision::Skip(_) => report.unchanged += 1,
				SyncDecision::Delete(_) => {}
			}
		}

		// Reversed so levels are popped in name order
		worklist.extend(subdirs.into_iter().rev());
		Ok(())
	}

	/// Decide what to do with one source entry.
	///
	/// A replica entry of a different kind has already been removed by the
	/// deletion pass, so it counts as absent here.
	fn decide<'s>(
		&self,
		src: &'s DirectoryEntry,
		replica: &DirectorySnapshot,
		target: &Path,
	) -> SyncDecision<'s> {
		if src.is_dir() {
			return SyncDecision::Recurse(src);
		}

		match replica.get(&src.name) {
			Some(existing) if existing.kind == EntryKind::File => {
				match self.comparator.are_identical(&src.path, target) {
					Ok(true) => SyncDecision::Skip(src),
					Ok(false) => SyncDecision::Overwrite(src),
					Err(e) => {
						warn!("Cannot compare {}: {} (copying)", src.path.display(), e);
						SyncDecision::Overwrite(src)
					}
				}
			}
			_ => SyncDecision::Create(src),
		}
	}

	fn without_excluded(&self, mut snap: DirectorySnapshot, relative: &Path) -> DirectorySnapshot {
		let exclude = &self.options.exclude;
		snap.retain(|entry| {
			let rel = relative.join(&entry.name);
			if exclude.is_excluded(&rel) {
				debug!("Excluded {}", rel.display());
				false
			} else {
				true
			}
		});
		snap
	}
}

/// Reconcile with default options
pub fn reconcile(source: &Path, replica: &Path, log: &ActionLog) -> Result<SyncReport, SyncError> {
	Reconciler::new(log, ReconcileOptions::default()).reconcile(source, replica)
}

/// Create `dir` and missing parents. Returns whether anything was created.
fn ensure_dir(dir: &Path) -> Result<bool, SyncError> {
	if dir.is_dir() {
		return Ok(false);
	}
	fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
	Ok(true)
}

/// Remove a replica entry: a whole subtree for a directory, the entry itself
/// otherwise (a symlink is removed, never followed)
fn remove_entry(entry: &DirectoryEntry) -> Result<(), SyncError> {
	if entry.path.file_name().is_none() {
		return Err(SyncError::InvalidEntry { path: entry.path.clone() });
	}
	let result = match entry.kind {
		EntryKind::Directory => fs::remove_dir_all(&entry.path),
		EntryKind::File | EntryKind::Symlink | EntryKind::Unknown => fs::remove_file(&entry.path),
	};
	result.map_err(|e| SyncError::io(&entry.path, e))
}

/// Copy file content and permissions, then carry over access and
/// modification times so the next comparison sees matching metadata
fn copy_file(source: &Path, target: &Path) -> Result<(), SyncError> {
	fs::copy(source, target).map_err(|e| SyncError::io(source, e))?;

	let meta = fs::metadata(source).map_err(|e| SyncError::io(source, e))?;
	set_file_times(
		target,
		FileTime::from_last_access_time(&meta),
		FileTime::from_last_modification_time(&meta),
	)
	.map_err(|e| SyncError::io(target, e))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::ffi::OsStr;
	use tempfile::TempDir;

	fn snapshots(temp: &TempDir) -> (DirectorySnapshot, DirectorySnapshot) {
		let src = DirectorySnapshot::read(&temp.path().join("src"), LinkMode::Follow).unwrap();
		let dst = DirectorySnapshot::read(&temp.path().join("dst"), LinkMode::NoFollow).unwrap();
		(src, dst)
	}

	#[test]
	fn test_plan_deletions_extra_and_kind_changed() {
		let temp = TempDir::new().unwrap();
		let src = temp.path().join("src");
		let dst = temp.path().join("dst");
		fs::create_dir_all(src.join("became_dir")).unwrap();
		fs::write(src.join("kept.txt"), "k").unwrap();
		fs::write(src.join("became_file"), "f").unwrap();
		fs::create_dir_all(&dst).unwrap();
		fs::write(dst.join("kept.txt"), "k").unwrap();
		fs::write(dst.join("extra.txt"), "x").unwrap();
		fs::write(dst.join("became_dir"), "was a file").unwrap();
		fs::create_dir(dst.join("became_file")).unwrap();

		let (s, r) = snapshots(&temp);
		let mut deleted: Vec<&OsStr> = plan_deletions(&s, &r)
			.into_iter()
			.map(|d| match d {
				SyncDecision::Delete(e) => e.name.as_os_str(),
				other => panic!("unexpected decision {:?}", other),
			})
			.collect();
		deleted.sort();
		assert_eq!(
			deleted,
			vec![OsStr::new("became_dir"), OsStr::new("became_file"), OsStr::new("extra.txt")]
		);
	}

	#[cfg(unix)]
	#[test]
	fn test_plan_deletions_keeps_unclassified_names() {
		let temp = TempDir::new().unwrap();
		let src = temp.path().join("src");
		let dst = temp.path().join("dst");
		fs::create_dir_all(&src).unwrap();
		fs::create_dir_all(&dst).unwrap();
		std::os::unix::fs::symlink("loop.txt", src.join("loop.txt")).unwrap();
		fs::write(dst.join("loop.txt"), "last good copy").unwrap();

		let (s, r) = snapshots(&temp);
		assert_eq!(s.get(OsStr::new("loop.txt")).unwrap().kind, EntryKind::Unknown);
		assert!(plan_deletions(&s, &r).is_empty());
	}

	#[test]
	fn test_ensure_dir_reports_creation() {
		let temp = TempDir::new().unwrap();
		let dir = temp.path().join("a").join("b");
		assert!(ensure_dir(&dir).unwrap());
		assert!(!ensure_dir(&dir).unwrap());
		assert!(dir.is_dir());
	}

	#[test]
	fn test_copy_file_preserves_mtime() {
		let temp = TempDir::new().unwrap();
		let src = temp.path().join("a.txt");
		let dst = temp.path().join("b.txt");
		fs::write(&src, "payload").unwrap();
		let mtime = FileTime::from_unix_time(1_500_000_000, 123_000_000);
		filetime::set_file_mtime(&src, mtime).unwrap();

		copy_file(&src, &dst).unwrap();

		assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
		let copied = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
		assert_eq!(copied, mtime);
		assert!(Comparator::default().are_identical(&src, &dst).unwrap());
	}

	#[test]
	fn test_remove_entry_refuses_nameless_path() {
		let entry = DirectoryEntry {
			name: OsStr::new("..").to_os_string(),
			kind: EntryKind::Directory,
			path: PathBuf::from("/tmp/.."),
		};
		let err = remove_entry(&entry).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Contract);
	}

	#[test]
	fn test_report_changes() {
		let report = SyncReport { copied: 2, updated: 1, removed: 1, unchanged: 5, ..Default::default() };
		assert_eq!(report.changes(), 4);
	}
}

// vim: ts=4
