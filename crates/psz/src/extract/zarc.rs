//! Extracts ZARC archives, a flat container used for player models and texture sets.
//!
//! The header gives the position of a table of fixed-size records, the record count and the record size. Each record
//! holds an absolute offset and size into the archive itself, 8 unknown bytes, and a null-terminated name in a
//! `0x30`-byte field.

use extract::{sz_to_string, ByteCursor};
use log::{debug, trace, warn};

use super::{check_magic, ExtractedFile, UnpackError};


pub const ZARC_MAGIC: [u8; 4] = *b"ZARC";

/// The header runs up to and including the record size at `0x14`.
const ZARC_MIN_LEN: usize = 20;
const NAME_LEN: usize = 0x30;


/// One record of the ZARC table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ZarcEntry {
    pub data_offset: u32,
    pub data_size: u32,
    pub name: String,
}


/// Extracts every file from a ZARC. It has to be decompressed already, if it was ZPR-wrapped.
///
/// An entry whose data lies outside the archive becomes an empty `<name>.error` placeholder rather than failing the
/// archive, so the output always has as many entries as the header declares.
pub fn extract_zarc(data: &[u8]) -> Result<Vec<ExtractedFile>, UnpackError> {
    check_magic(data, ZARC_MAGIC, "ZARC")?;
    if data.len() < ZARC_MIN_LEN {
        return Err(UnpackError::TruncatedHeaderError { format: "ZARC", needed: ZARC_MIN_LEN, found: data.len() });
    }

    let mut cur = ByteCursor::new(data);
    cur.seek(0x0C)?;
    let table_start = cur.read_u32()? as usize;
    let count = cur.read_u32()? as usize;
    let stride = cur.read_u32()? as usize;

    debug!("ZARC: table at {table_start:#x}, {count} file(s), {stride:#x} bytes each");

    let mut files = Vec::with_capacity(table_capacity(data.len(), table_start, stride, count));
    for index in 0..count {
        let entry = read_entry(&mut cur, table_start, stride, index)?;
        files.push(finish_entry(&cur, index, entry));
    }

    Ok(files)
}


/// How many records `count` can actually amount to: no more than fit between the table start and the end of the buffer.
fn table_capacity(len: usize, table_start: usize, stride: usize, count: usize) -> usize {
    count.min(len.saturating_sub(table_start) / stride.max(1))
}


fn read_entry(cur: &mut ByteCursor, table_start: usize, stride: usize, index: usize) -> Result<ZarcEntry, UnpackError> {
    let pos = index
        .checked_mul(stride)
        .and_then(|rel| rel.checked_add(table_start))
        .unwrap_or(usize::MAX);
    cur.seek(pos)?;

    let data_offset = cur.read_u32()?;
    let data_size = cur.read_u32()?;
    cur.skip(8)?;

    let name = match sz_to_string(cur.read(NAME_LEN)?) {
        name if name.is_empty() => format!("file_{index:03}.bin"),
        name => name,
    };

    Ok(ZarcEntry { data_offset, data_size, name })
}


fn finish_entry(cur: &ByteCursor, index: usize, entry: ZarcEntry) -> ExtractedFile {
    let start = entry.data_offset as usize;
    let end = start.saturating_add(entry.data_size as usize);

    if end > cur.len() && start <= cur.len() {
        warn!("ZARC: {} ends at {end:#x}, past the end of the archive, it will be cut short", entry.name);
    }

    match cur.slice(start, end) {
        Ok(data) => {
            trace!("ZARC: {} ({} bytes at {start:#x})", entry.name, data.len());
            ExtractedFile::new(entry.name, data)
        },
        Err(err) => {
            warn!("ZARC: failed to extract file {index} ({}): {err}", entry.name);
            ExtractedFile::placeholder(format!("{}.error", entry.name), err)
        },
    }
}
