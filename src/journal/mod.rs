//! Journal subsystem
//!
//! An append-only file of framed, checksummed record entries, and the
//! `JournaledDao` decorator that replays it into a DAO on open.
//!
//! Entry layout (little-endian):
//!
//! ```text
//! [length u32][kind u8][sequence u64][body][crc32 u32]
//! ```
//!
//! `length` counts the whole entry. The checksum covers every byte before
//! it. Sequences start at 1 and increase by exactly 1; any gap, checksum
//! mismatch or short read is corruption.

mod checksum;
mod entry;
mod errors;
mod journaled;
mod reader;
mod writer;

pub use entry::{EntryKind, JournalEntry, HEADER_SIZE, MIN_ENTRY_SIZE};
pub use errors::{JournalError, JournalResult};
pub use journaled::{JournalOptions, JournaledDao, ReplayStats};
pub use reader::JournalReader;
pub use writer::JournalWriter;
