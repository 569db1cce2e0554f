//! Append-only CSV ledger of uploaded sound effects.
//!
//! The file has a two-column header, `Prompt` and `S3 URL`, followed by one
//! row per uploaded clip in processing order. Rows are appended in place; the
//! existing contents are only read to check the header and the final newline.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilesystemError;

/// Default ledger location, relative to the working directory.
pub const DEFAULT_LEDGER_PATH: &str = "sound_effects.csv";

/// Column names, in order.
pub const HEADER: [&str; 2] = ["Prompt", "S3 URL"];

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Prompt the clip was generated from.
    #[serde(rename = "Prompt")]
    pub prompt: String,
    /// Public URL of the uploaded clip.
    #[serde(rename = "S3 URL")]
    pub url: String,
}

/// How an existing file ends, as far as the next append cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    /// Absent or without records; the header goes first.
    Empty,
    /// Last line ends in a newline.
    Terminated,
    /// Last line was left open; a newline goes first.
    Unterminated,
}

/// A CSV ledger at a fixed path.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_PATH)
    }
}

impl Ledger {
    /// Ledger at `path`. The file is not touched until the first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file with its header if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError::Corrupt`] if the file starts with a different
    /// header, and [`FilesystemError::Io`] if it cannot be read or written.
    pub fn append(&self, prompt: &str, url: &str) -> Result<(), FilesystemError> {
        let tail = self.inspect()?;

        let mut buffer = Vec::new();
        if tail == Tail::Unterminated {
            buffer.push(b'\n');
        }
        let mut writer = csv::Writer::from_writer(buffer);
        if tail == Tail::Empty {
            writer.write_record(HEADER).map_err(|e| self.csv_error(e))?;
        }
        writer
            .write_record([prompt, url])
            .map_err(|e| self.csv_error(e))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| FilesystemError::io(&self.path, e.into_error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FilesystemError::io(&self.path, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| FilesystemError::io(&self.path, e))?;

        debug!(path = %self.path.display(), ?tail, "ledger row appended");
        Ok(())
    }

    /// Read every row back, in file order. A missing file has no rows.
    pub fn records(&self) -> Result<Vec<LedgerRecord>, FilesystemError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FilesystemError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(file);
        let mut rows = reader.records();

        let header = match rows.next() {
            None => return Ok(Vec::new()),
            Some(header) => header.map_err(|e| self.corrupt(&e))?,
        };
        self.check_header(&header)?;

        rows.map(|row| {
            let row = row.map_err(|e| self.corrupt(&e))?;
            row.deserialize::<LedgerRecord>(Some(&header))
                .map_err(|e| self.corrupt(&e))
        })
        .collect()
    }

    /// Classify the existing file. Fails if it holds a foreign header.
    fn inspect(&self) -> Result<Tail, FilesystemError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Tail::Empty),
            Err(e) => return Err(FilesystemError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(&mut file);
        match reader.records().next() {
            None => return Ok(Tail::Empty),
            Some(Err(e)) => return Err(self.corrupt(&e)),
            Some(Ok(header)) => self.check_header(&header)?,
        }
        drop(reader);

        let mut last = [0_u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|e| FilesystemError::io(&self.path, e))?;

        Ok(if last[0] == b'\n' {
            Tail::Terminated
        } else {
            Tail::Unterminated
        })
    }

    fn check_header(&self, header: &csv::StringRecord) -> Result<(), FilesystemError> {
        if header.iter().eq(HEADER) {
            Ok(())
        } else {
            Err(FilesystemError::corrupt(
                &self.path,
                format!(
                    "unexpected header {:?}, expected {HEADER:?}",
                    header.iter().collect::<Vec<_>>()
                ),
            ))
        }
    }

    fn corrupt(&self, err: &csv::Error) -> FilesystemError {
        FilesystemError::corrupt(&self.path, err.to_string())
    }

    fn csv_error(&self, err: csv::Error) -> FilesystemError {
        FilesystemError::io(&self.path, io::Error::other(err))
    }
}
