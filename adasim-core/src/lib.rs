//! Domain logic for the adasim platform: run storage, detector
//! integration, alert correlation, ingestion orchestration, and
//! real-time notification fan-out.
#![allow(missing_docs)]

pub mod correlate;
pub mod detector;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod store;

pub use error::{CoreError, Result};
pub use ingest::IngestOrchestrator;
pub use notify::Notifier;
pub use store::{BulkOutcome, RejectedRecord, RunResultUpdate, RunStore};

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
