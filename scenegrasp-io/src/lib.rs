//! scenegrasp-io: Frame ingestion and file I/O for scenegrasp.
//!
//! This crate decodes raw sensor frames into point sets, reads and writes
//! PCD files using memory-mapped files via memmap2, and provides the
//! file-backed frame source and the logging and recording scene sinks.
//!

mod error;
pub mod ingest;
pub mod pcd;
pub mod sink;
pub mod source;

pub use error::{Error, Result};
pub use ingest::{ingest_frame, CloudIngestor, IngestStats, IngestedCloud};
pub use pcd::{
    describe_fields, read_pcd, write_pcd, DataFormat, MappedFileReader, PcdHeader, PcdReader,
    PcdWriter,
};
pub use sink::{DirectorySink, FrameSummary, LogSink, ObjectSummary};
pub use source::{list_pcd_files, DirectorySource};
