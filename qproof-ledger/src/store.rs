//! Append-only JSON-lines persistence
//!
//! Each line is one [`LogRecord`]. Records are only ever appended; replaying
//! the file from the top reconstructs the ledger, including seals and side
//! index links.

use crate::digest::Hash32;
use crate::{EvidenceEntry, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// One mutation of the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogRecord {
    /// Entry appended at its chain index
    Created { entry: EvidenceEntry },
    /// `CLASS_B` entry promoted to `CLASS_A`
    Sealed {
        entry_id: String,
        result_digest: Hash32,
        sealed_at: u64,
    },
    /// Side index link from an experiment or job id to an entry
    Linked { key: String, entry_id: String },
}

/// Handle to the on-disk log
#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    file: File,
}

impl LedgerStore {
    /// Open (creating if needed) the log at `path` and read back every record
    ///
    /// # Errors
    /// Returns `LedgerError::Storage` on I/O failure and
    /// `LedgerError::CorruptLog` for a line that does not parse.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<(Self, Vec<LogRecord>)> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut records = Vec::new();
        let reader = BufReader::new(File::open(&path)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| LedgerError::CorruptLog {
                line: line_no + 1,
                reason: e.to_string(),
            })?;
            records.push(record);
        }
        Ok((Self { path, file }, records))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it
    ///
    /// A failed write is cut back off the log, so a torn line never survives
    /// to fail the next replay.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let len = self.file.metadata()?.len();
        if let Err(err) = self.file.write_all(&line).and_then(|()| self.file.flush()) {
            if let Err(rewind_err) = self.rewind(len) {
                error!(path = %self.path.display(), error = %rewind_err, "torn ledger record left in log");
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Truncate the log back to `len` bytes
    fn rewind(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        warn!(path = %self.path.display(), len, "ledger log rewound after failed append");
        Ok(())
    }
}
