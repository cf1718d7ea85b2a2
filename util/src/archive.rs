//! CSV archiving functionality
//!
//! An `Archiver` appends flat serde records to a CSV file in the session's
//! archive directory, writing a header row the first time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot open the archive file: {0}")]
    FileOpenError(std::io::Error),

    #[error("Cannot serialise the archive record: {0}")]
    SerialiseError(csv::Error),

    #[error("Cannot flush the archive file: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        Self::from_file_path(session.arch_root.join(path))
    }

    /// Create a new archiver writing to an absolute file path. Any existing
    /// file at that path is truncated.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(ArchiveError::FileOpenError)?;

        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self { writer })
    }

    /// Serialise a record into the archive.
    ///
    /// Records must be flat structs, `csv` cannot write nested data.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(ArchiveError::SerialiseError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}
