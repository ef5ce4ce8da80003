//! Journal entry framing
//!
//! Each entry on disk:
//! - Entry Length (u32 LE), counting every byte of the entry
//! - Entry Kind (u8): PUT / REMOVE
//! - Sequence Number (u64 LE), strictly increasing from 1
//! - Body (variable): the record's document as JSON
//! - Checksum (u32 LE) over everything before it

use super::checksum::compute_checksum;

/// Length + kind + sequence
pub const HEADER_SIZE: usize = 4 + 1 + 8;

/// Header + checksum, empty body
pub const MIN_ENTRY_SIZE: usize = HEADER_SIZE + 4;

/// Write operation recorded by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    Put = 0,
    Remove = 1,
}

impl EntryKind {
    /// Convert from u8, returns None for unknown kinds
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(EntryKind::Put),
            1 => Some(EntryKind::Remove),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Put => "put",
            EntryKind::Remove => "remove",
        }
    }
}

/// One framed journal entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub kind: EntryKind,
    pub sequence: u64,
    pub body: Vec<u8>,
}

impl JournalEntry {
    pub fn new(kind: EntryKind, sequence: u64, body: Vec<u8>) -> Self {
        Self {
            kind,
            sequence,
            body,
        }
    }

    /// Frame the entry for appending
    pub fn serialize(&self) -> Vec<u8> {
        let length = (MIN_ENTRY_SIZE + self.body.len()) as u32;

        let mut out = Vec::with_capacity(length as usize);
        out.extend_from_slice(&length.to_le_bytes());
        out.push(self.kind.as_u8());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.body);

        let checksum = compute_checksum(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }

    /// Parse one entry from the front of `data`, verifying its checksum.
    ///
    /// Returns the entry and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> Result<(Self, usize), String> {
        if data.len() < MIN_ENTRY_SIZE {
            return Err(format!(
                "entry too short: {} bytes, minimum is {}",
                data.len(),
                MIN_ENTRY_SIZE
            ));
        }

        let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if length < MIN_ENTRY_SIZE {
            return Err(format!("invalid entry length: {}", length));
        }
        if data.len() < length {
            return Err(format!(
                "entry truncated: expected {} bytes, got {}",
                length,
                data.len()
            ));
        }

        let checksum_offset = length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = compute_checksum(&data[..checksum_offset]);
        if computed != stored {
            return Err(format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            ));
        }

        let kind = EntryKind::from_u8(data[4])
            .ok_or_else(|| format!("invalid entry kind: {}", data[4]))?;

        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&data[5..HEADER_SIZE]);

        Ok((
            Self {
                kind,
                sequence: u64::from_le_bytes(sequence),
                body: data[HEADER_SIZE..checksum_offset].to_vec(),
            },
            length,
        ))
    }
}
