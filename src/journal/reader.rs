//! Journal reader
//!
//! Reads entries in file order and rejects anything that does not frame,
//! checksum or sequence cleanly:
//! - no skipping past a bad entry
//! - sequence numbers start at 1 and increase by exactly 1
//!
//! A journal file that does not exist reads as empty.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use super::entry::{JournalEntry, MIN_ENTRY_SIZE};
use super::errors::{JournalError, JournalResult};

/// Sequential journal reader
pub struct JournalReader {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    offset: u64,
    file_size: u64,
    last_sequence: u64,
}

impl JournalReader {
    /// Open `path` for reading. A missing file yields an empty reader.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    path: path.to_path_buf(),
                    reader: None,
                    offset: 0,
                    file_size: 0,
                    last_sequence: 0,
                })
            }
            Err(e) => return Err(JournalError::open(path, e)),
        };

        let file_size = file
            .metadata()
            .map_err(|e| JournalError::open(path, e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(BufReader::new(file)),
            offset: 0,
            file_size,
            last_sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the file existed when opened
    pub fn exists(&self) -> bool {
        self.reader.is_some()
    }

    /// Byte offset of the next entry
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Sequence number of the last entry read, 0 before the first
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Next entry, `None` at a clean end of file
    pub fn read_next(&mut self) -> JournalResult<Option<JournalEntry>> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        if self.offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        if remaining < MIN_ENTRY_SIZE as u64 {
            return Err(JournalError::corruption(
                &self.path,
                self.offset,
                format!("truncated journal: {} trailing bytes", remaining),
            ));
        }

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).map_err(|e| {
            JournalError::corruption(&self.path, self.offset, format!("cannot read length: {}", e))
        })?;
        let length = u32::from_le_bytes(len_buf) as u64;

        if length < MIN_ENTRY_SIZE as u64 || length > remaining {
            return Err(JournalError::corruption(
                &self.path,
                self.offset,
                format!("invalid entry length {} with {} bytes remaining", length, remaining),
            ));
        }

        let mut buf = vec![0u8; length as usize];
        buf[..4].copy_from_slice(&len_buf);
        reader.read_exact(&mut buf[4..]).map_err(|e| {
            JournalError::corruption(&self.path, self.offset, format!("cannot read entry: {}", e))
        })?;

        let (entry, consumed) = JournalEntry::deserialize(&buf)
            .map_err(|reason| JournalError::corruption(&self.path, self.offset, reason))?;

        if entry.sequence != self.last_sequence + 1 {
            return Err(JournalError::corruption(
                &self.path,
                self.offset,
                format!(
                    "non-sequential entry: expected {}, got {}",
                    self.last_sequence + 1,
                    entry.sequence
                ),
            ));
        }

        self.offset += consumed as u64;
        self.last_sequence = entry.sequence;
        Ok(Some(entry))
    }

    /// Every remaining entry; fails on the first bad one
    pub fn read_all(&mut self) -> JournalResult<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.read_next()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::entry::EntryKind;
    use crate::journal::writer::JournalWriter;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut reader = JournalReader::open(&dir.path().join("absent.journal")).unwrap();
        assert!(!reader.exists());
        assert_eq!(reader.read_next().unwrap(), None);
    }

    #[test]
    fn test_reads_back_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.journal");
        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append(EntryKind::Put, b"{\"id\":\"1\"}").unwrap();
        writer.append(EntryKind::Remove, b"{\"id\":\"1\"}").unwrap();

        let entries = JournalReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[1].kind, EntryKind::Remove);
    }

    #[test]
    fn test_trailing_garbage_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.journal");
        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append(EntryKind::Put, b"{}").unwrap();
        drop(writer);

        let mut bytes = fs::read(&path).unwrap();
        let good_len = bytes.len() as u64;
        bytes.extend_from_slice(&[0xAB; 5]);
        fs::write(&path, bytes).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_some());
        match reader.read_next().unwrap_err() {
            JournalError::Corruption { offset, .. } => assert_eq!(offset, good_len),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sequence_gap_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gap.journal");
        let mut bytes = JournalEntry::new(EntryKind::Put, 1, b"{}".to_vec()).serialize();
        bytes.extend(JournalEntry::new(EntryKind::Put, 3, b"{}".to_vec()).serialize());
        fs::write(&path, bytes).unwrap();

        let err = JournalReader::open(&path).unwrap().read_all().unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("expected 2, got 3"));
    }
}
