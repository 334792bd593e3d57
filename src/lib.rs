//! # replicr - one-way periodic directory mirror
//!
//! replicr keeps a replica directory tree identical to a source tree. Every
//! pass re-reads both trees from scratch, removes what the source no longer
//! has, copies what is new or changed, and records each action in an
//! append-only log.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use replicr::logging::ActionLog;
//! use replicr::reconcile::reconcile;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let log = ActionLog::open("sync.log")?;
//!     let report = reconcile(Path::new("./source"), Path::new("./replica"), &log)?;
//!     println!("{} copied, {} updated, {} removed", report.copied, report.updated, report.removed);
//!     Ok(())
//! }
//! ```
//!
//! ## Running periodically
//!
//! ```rust,ignore
//! use replicr::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = Config {
//!         source: Some("./source".into()),
//!         replica: Some("./replica".into()),
//!         interval_secs: Some(10),
//!         log_file: Some("sync.log".into()),
//!         ..Default::default()
//!     }
//!     .into_job()?;
//!     replicr::driver::run(job).await?;
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod config;
pub mod driver;
pub mod error;
pub mod exclusion;
pub mod guard;
pub mod logging;
pub mod reconcile;
pub mod snapshot;

// Re-export commonly used types and functions
pub use config::{Config, MirrorJob};
pub use error::{ConfigError, ErrorKind, ExclusionError, SyncError};
pub use logging::ActionLog;
pub use reconcile::{reconcile, ReconcileOptions, Reconciler, SyncReport};

// vim: ts=4
