//! Export calendar and contact collections from a calendar server's store.
//!
//! The pipeline is:
//! - `selector` resolves export specs to collections
//! - `merge` combines their objects into calendars or card lists
//! - `writer` puts the result on a stream or in an output directory
//!
//! [`run_export`] drives all three inside one store transaction.

pub mod config;
pub mod directory;
pub mod error;
pub mod export;
pub mod exporter;
pub mod ics;
pub mod merge;
pub mod selector;
pub mod store;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::ExportConfig;
pub use directory::{DirectoryRecord, DirectoryService, FileDirectory, RecordType};
pub use error::{ExportError, ExportResult};
pub use export::{Destination, ExportRequest, ExportSummary, check_specs, run_export};
pub use exporter::{ExportSpec, ExportType, HomeSource};
pub use store::{FileStore, FileTransaction, Transaction};
