//! Journal writer
//!
//! Append-only. Every append is followed by `sync_all`; the sequence
//! number advances only after the sync succeeds.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::entry::{EntryKind, JournalEntry};
use super::errors::{JournalError, JournalResult};
use super::reader::JournalReader;

/// Appends entries to one journal file
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
}

impl JournalWriter {
    /// Open or create the journal at `path`, creating parent directories.
    ///
    /// The existing file is scanned to continue its sequence; a corrupt
    /// journal cannot be opened for writing.
    pub fn open(path: &Path) -> JournalResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| JournalError::open(path, e))?;
        }

        let next_sequence = {
            let mut reader = JournalReader::open(path)?;
            while reader.read_next()?.is_some() {}
            reader.last_sequence() + 1
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| JournalError::open(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number the next append will use
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Append one entry and sync it; returns its sequence number
    pub fn append(&mut self, kind: EntryKind, body: &[u8]) -> JournalResult<u64> {
        let sequence = self.next_sequence;
        let bytes = JournalEntry::new(kind, sequence, body.to_vec()).serialize();

        self.file
            .write_all(&bytes)
            .map_err(|e| JournalError::append(&self.path, e))?;
        self.file
            .sync_all()
            .map_err(|e| JournalError::append(&self.path, format!("sync failed: {}", e)))?;

        self.next_sequence += 1;
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("a.journal");
        let mut writer = JournalWriter::open(&path).unwrap();
        assert_eq!(writer.append(EntryKind::Put, b"{}").unwrap(), 1);
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.journal");

        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append(EntryKind::Put, b"{}").unwrap();
        writer.append(EntryKind::Put, b"{}").unwrap();
        drop(writer);

        let mut writer = JournalWriter::open(&path).unwrap();
        assert_eq!(writer.next_sequence(), 3);
        assert_eq!(writer.append(EntryKind::Remove, b"{}").unwrap(), 3);

        let entries = JournalReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_refuses_corrupt_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.journal");
        fs::write(&path, [1u8; 40]).unwrap();
        assert!(JournalWriter::open(&path).unwrap_err().is_corruption());
    }
}
