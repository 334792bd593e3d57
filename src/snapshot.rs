//! Flat, fresh listings of a single directory level

use std::collections::btree_map::{self, BTreeMap};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::logging::*;

/// Kind of a directory entry as far as mirroring is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	File,
	Directory,

	/// Only reported when links are not followed
	Symlink,

	/// Exists but could not be classified (stat failed). Left alone on
	/// both sides until a later pass can read it.
	Unknown,
}

/// How symlinks are classified while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
	/// Classify by the link target (source side: a link to a directory is
	/// mirrored as a directory, a link to a file as a file)
	Follow,

	/// Classify the link itself (replica side: a link is never written
	/// through or descended into, only removed)
	NoFollow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
	pub name: OsString,
	pub kind: EntryKind,
	pub path: PathBuf,
}

impl DirectoryEntry {
	pub fn is_dir(&self) -> bool {
		self.kind == EntryKind::Directory
	}
}

/// Every entry of one directory level, keyed by name
#[derive(Debug)]
pub struct DirectorySnapshot {
	entries: BTreeMap<OsString, DirectoryEntry>,

	/// Why each `Unknown` entry could not be classified
	failures: BTreeMap<OsString, io::Error>,
}

impl DirectorySnapshot {
	/// Scan `dir` (non-recursive).
	///
	/// Special files (sockets, FIFOs, devices) are left out with a warning
	/// when following links. An entry whose target cannot be stat'ed
	/// (dangling or looping link, no search permission) is kept as
	/// [`EntryKind::Unknown`] and its error is held for [`Self::take_failures`].
	pub fn read(dir: &Path, links: LinkMode) -> Result<Self, SyncError> {
		let mut entries = BTreeMap::new();
		let mut failures = BTreeMap::new();

		for entry_result in fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
			let entry = entry_result.map_err(|e| SyncError::io(dir, e))?;
			let path = entry.path();

			let kind = match links {
				LinkMode::Follow => match fs::metadata(&path) {
					Ok(meta) if meta.is_dir() => EntryKind::Directory,
					Ok(meta) if meta.is_file() => EntryKind::File,
					Ok(_) => {
						warn!("Skipping special file {}", path.display());
						continue;
					}
					Err(e) => {
						debug!("Cannot classify {}: {}", path.display(), e);
						failures.insert(entry.file_name(), e);
						EntryKind::Unknown
					}
				},
				LinkMode::NoFollow => {
					let file_type = entry.file_type().map_err(|e| SyncError::io(&path, e))?;
					if file_type.is_symlink() {
						EntryKind::Symlink
					} else if file_type.is_dir() {
						EntryKind::Directory
					} else {
						EntryKind::File
					}
				}
			};

			let name = entry.file_name();
			entries.insert(name.clone(), DirectoryEntry { name, kind, path });
		}

		Ok(DirectorySnapshot { entries, failures })
	}

	pub fn get(&self, name: &OsStr) -> Option<&DirectoryEntry> {
		self.entries.get(name)
	}

	pub fn contains(&self, name: &OsStr) -> bool {
		self.entries.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries in name order
	pub fn iter(&self) -> btree_map::Values<'_, OsString, DirectoryEntry> {
		self.entries.values()
	}

	/// Drop every entry for which `keep` returns false
	pub fn retain<F>(&mut self, mut keep: F)
	where
		F: FnMut(&DirectoryEntry) -> bool,
	{
		self.entries.retain(|_, entry| keep(entry));
		let entries = &self.entries;
		self.failures.retain(|name, _| entries.contains_key(name));
	}

	/// Hand over the classification errors, one per `Unknown` entry.
	///
	/// The entries themselves stay in the snapshot.
	pub fn take_failures(&mut self) -> Vec<SyncError> {
		let entries = &self.entries;
		mem::take(&mut self.failures)
			.into_iter()
			.filter_map(|(name, e)| entries.get(&name).map(|entry| SyncError::io(&entry.path, e)))
			.collect()
	}
}


// vim: ts=4
