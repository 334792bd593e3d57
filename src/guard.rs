//! Error boundary applied around every filesystem operation.
//!
//! An operation that fails is reported to the action log as
//! `An error occurred in function '<name>': <details>` and abandoned, so the
//! rest of the pass keeps going. Error kinds named on the propagation
//! allow-list are not swallowed: they are returned to the caller and abort
//! the pass.

use std::cell::Cell;

use crate::error::{ErrorKind, SyncError};
use crate::logging::*;

/// Run `op` behind the error boundary.
///
/// Returns `Ok(Some(value))` on success, `Ok(None)` when the error was logged
/// and swallowed, and `Err` when its kind is on the `propagate` list.
pub fn guarded<T, F>(
	function: &str,
	log: &ActionLog,
	propagate: &[ErrorKind],
	op: F,
) -> Result<Option<T>, SyncError>
where
	F: FnOnce() -> Result<T, SyncError>,
{
	match op() {
		Ok(value) => Ok(Some(value)),
		Err(e) if propagate.contains(&e.kind()) => {
			debug!("Propagating {} error from {}: {}", e.kind(), function, e);
			Err(e)
		}
		Err(e) => {
			warn!("{} failed: {}", function, e);
			log.record(&Action::Failed { function, details: e.to_string() });
			Ok(None)
		}
	}
}

/// A reusable boundary bound to one log and one allow-list.
///
/// Counts the errors it swallowed so a pass can report them.
pub struct OperationGuard<'a> {
	log: &'a ActionLog,
	propagate: &'a [ErrorKind],
	swallowed: Cell<usize>,
}

impl<'a> OperationGuard<'a> {
	pub fn new(log: &'a ActionLog, propagate: &'a [ErrorKind]) -> Self {
		OperationGuard { log, propagate, swallowed: Cell::new(0) }
	}

	/// Run `op` behind the boundary, see [`guarded`]
	pub fn run<T, F>(&self, function: &str, op: F) -> Result<Option<T>, SyncError>
	where
		F: FnOnce() -> Result<T, SyncError>,
	{
		let result = guarded(function, self.log, self.propagate, op)?;
		if result.is_none() {
			self.swallowed.set(self.swallowed.get() + 1);
		}
		Ok(result)
	}

	/// Number of errors logged and swallowed so far
	pub fn swallowed(&self) -> usize {
		self.swallowed.get()
	}
}


// vim: ts=4
