//! Extracts [NARC archives](https://docs.dashgl.com/format/phantasy-star-zero/narc-archive), the Nitro archive format.
//!
//! A NARC is four sections back to back:
//!
//! 1. `NARC` root header: byte order, version, total length, header length, section count.
//! 2. `BTAF` file allocation table: one `(start, end)` pair per file, relative to the start of the data section.
//! 3. `BTNF` name table: a directory table followed by a byte-coded stream of file and sub-directory names. Archives
//!    with no names store a root offset of 4 and nothing else.
//! 4. `GMIF` data section: every file's bytes. Its position is found by scanning for the magic rather than trusting the
//!    section lengths, which do not always add up in the game's files.

use extract::{ByteCursor, ParseError};
use log::{debug, trace, warn};

use super::{check_magic, expect_magic, sniff_extension, ExtractedFile, UnpackError};


pub const NARC_MAGIC: [u8; 4] = *b"NARC";
const BTAF_MAGIC: [u8; 4] = *b"BTAF";
const BTNF_MAGIC: [u8; 4] = *b"BTNF";

/// The data section magic as it is stored (a little-endian `FIMG`). The other byte order is accepted too.
const GMIF_MAGIC: [u8; 4] = *b"GMIF";
const FIMG_MAGIC: [u8; 4] = *b"FIMG";

/// The smallest buffer that can hold a root header.
const NARC_MIN_LEN: usize = 16;

/// How far past the end of the name table [`extract_narc`] looks for the data section by default.
pub const DEFAULT_SCAN_WINDOW: usize = 1024;


/// Settings for [`extract_narc_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarcOptions {
    /// Number of byte positions, starting right after the name table, that are searched for the data section magic.
    pub scan_window: usize,
}


impl Default for NarcOptions {
    fn default() -> Self {
        Self { scan_window: DEFAULT_SCAN_WINDOW }
    }
}


/// One row of the `BTAF` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AllocationEntry {
    /// Filled in by the name table walk; stays empty if the archive has no names.
    pub name: String,
    pub start_offset: u32,
    pub end_offset: u32,
}


/// One row of the `BTNF` directory table. Directories refer to each other by index into the same list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directory {
    /// `None` for the root.
    pub parent: Option<u16>,
    /// Starts out as the parent's index (`"000"`, `"001"`, ...) until a sub-directory entry in the parent names it. The
    /// root's name is always empty.
    pub name: String,
    pub first_file_index: u16,
    pub child_count: u16,
}


/// Extracts every file from a decompressed NARC, in allocation table order.
///
/// See [`extract_narc_with`].
pub fn extract_narc(data: &[u8]) -> Result<Vec<ExtractedFile>, UnpackError> {
    extract_narc_with(data, &NarcOptions::default())
}


/// Extracts every file from a decompressed NARC, in allocation table order.
///
/// Bad magic numbers and a missing data section fail the whole archive. A file whose offsets fall outside the buffer
/// does not: it comes back as an empty placeholder named `NN.error`, so the result always has exactly as many entries
/// as the allocation table declares.
pub fn extract_narc_with(data: &[u8], options: &NarcOptions) -> Result<Vec<ExtractedFile>, UnpackError> {
    if data.len() < NARC_MIN_LEN {
        check_magic(data, NARC_MAGIC, "NARC")?;
        return Err(UnpackError::TruncatedHeaderError { format: "NARC", needed: NARC_MIN_LEN, found: data.len() });
    }

    let mut cur = ByteCursor::new(data);

    read_root_header(&mut cur)?;
    let mut entries = read_allocation_table(&mut cur)?;
    read_name_table(&mut cur, &mut entries)?;
    let base = find_data_section(&mut cur, options.scan_window)?;

    let files = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| finish_entry(&cur, base, index, entry))
        .collect::<Vec<_>>();

    debug!("NARC: extracted {} file(s)", files.len());
    Ok(files)
}


fn read_root_header(cur: &mut ByteCursor) -> Result<(), UnpackError> {
    expect_magic(cur, NARC_MAGIC, "NARC")?;

    let byte_order = cur.read_u16()?;
    let version = cur.read_u16()?;
    let archive_len = cur.read_u32()?;
    let header_len = cur.read_u16()?;
    let section_count = cur.read_u16()?;

    debug!(
        "NARC: byte order {byte_order:#06x}, version {version:#06x}, length {archive_len}, header {header_len}, \
         {section_count} section(s)"
    );

    // Common in the wild, and the data section is found by scanning anyway
    if archive_len as usize != cur.len() {
        warn!("NARC: header says the archive is {archive_len} bytes, but it is {} bytes", cur.len());
    }

    Ok(())
}


fn read_allocation_table(cur: &mut ByteCursor) -> Result<Vec<AllocationEntry>, UnpackError> {
    expect_magic(cur, BTAF_MAGIC, "BTAF")?;

    let _section_len = cur.read_u32()?;
    let count = cur.read_u32()? as usize;
    trace!("BTAF: {count} file(s)");

    // Each entry takes 8 bytes, don't trust `count` any further than the buffer can back it up
    let mut entries = Vec::with_capacity(count.min(cur.remaining() / 8));
    for _ in 0..count {
        let start_offset = cur.read_u32()?;
        let end_offset = cur.read_u32()?;
        entries.push(AllocationEntry { name: String::new(), start_offset, end_offset });
    }

    Ok(entries)
}


fn read_name_table(cur: &mut ByteCursor, files: &mut [AllocationEntry]) -> Result<(), UnpackError> {
    let magic = cur.read_array::<4>()?;
    if magic != BTNF_MAGIC {
        warn!("BTNF: unexpected magic {magic:02X?}, reading it as a name table anyway");
    }

    let section_len = cur.read_u32()?;
    let root_offset = cur.read_u32()?;

    if section_len < 16 || root_offset == 4 {
        trace!("BTNF: no file names");
        return Ok(());
    }

    // The root's entry has the directory count where the others have their parent
    let root_first_file = cur.read_u16()?;
    let dir_count = cur.read_u16()?;

    let mut dirs = Vec::with_capacity(dir_count.max(1) as usize);
    dirs.push(Directory { parent: None, name: String::new(), first_file_index: root_first_file, child_count: 0 });

    for _ in 1..dir_count {
        let _name_offset = cur.read_u32()?;
        let first_file_index = cur.read_u16()?;
        let parent = cur.read_u16()? & 0xFFF;
        dirs.push(Directory { parent: Some(parent), name: format!("{parent:03}"), first_file_index, child_count: 0 });
    }

    trace!("BTNF: {dir_count} director(y/ies)");

    let mut walker = NameWalker { dirs, current_dir: 0, next_file: 0 };
    walker.walk(cur, dir_count as usize, files)?;
    Ok(())
}


/// State for walking the name stream: which directory's listing is being read, and which file gets the next name.
struct NameWalker {
    dirs: Vec<Directory>,
    current_dir: usize,
    next_file: usize,
}


impl NameWalker {
    /// Each directory's listing is a run of entries ended by a `0` byte. An entry's first byte holds the name length in
    /// its low 7 bits; with the high bit set it is a sub-directory and the name is followed by that directory's index.
    fn walk(
        &mut self,
        cur: &mut ByteCursor,
        dir_count: usize,
        files: &mut [AllocationEntry],
    ) -> Result<(), ParseError> {
        while self.current_dir < dir_count {
            let op = cur.read_u8()?;
            if op == 0 {
                let dir = &self.dirs[self.current_dir];
                trace!(
                    "BTNF: directory {} ({:?}, parent {:?}) has {} entries, first file {}",
                    self.current_dir,
                    dir.name,
                    dir.parent,
                    dir.child_count,
                    dir.first_file_index
                );
                self.current_dir += 1;
                continue;
            }

            let dir = &mut self.dirs[self.current_dir];
            dir.child_count = dir.child_count.saturating_add(1);

            let name = cur.read_fixed_string((op & 0x7F) as usize)?;

            if op & 0x80 != 0 {
                let id = (cur.read_u16()? & 0xFFF) as usize;
                match self.dirs.get_mut(id) {
                    Some(dir) => dir.name = name,
                    None => warn!("BTNF: sub-directory {name:?} points at directory {id}, which does not exist"),
                }
            } else {
                // Names are prefixed with the directory's own name only, not its full path
                let path = format!("{}{name}", self.dirs[self.current_dir].name);
                match files.get_mut(self.next_file) {
                    Some(file) => file.name = path,
                    None => {
                        warn!("BTNF: name {path:?} is for file {}, but there are only {}", self.next_file, files.len())
                    },
                }
                self.next_file += 1;
            }
        }

        if self.next_file < files.len() {
            debug!("BTNF: only {} of {} file(s) were named", self.next_file, files.len());
        }

        Ok(())
    }
}


/// Scans forward from the cursor for the data section magic and returns the offset its payload starts at.
fn find_data_section(cur: &mut ByteCursor, window: usize) -> Result<usize, UnpackError> {
    let start = cur.tell();
    let data = cur.data();

    // The magic and the section length have to fit
    let last = data.len().saturating_sub(8);
    let end = start.saturating_add(window).min(last + 1);

    let pos = (start..end)
        .find(|&pos| matches!(data.get(pos..pos + 4), Some(m) if m == GMIF_MAGIC || m == FIMG_MAGIC))
        .ok_or(UnpackError::NoDataSectionError { start, window })?;

    if pos != start {
        trace!("GMIF: skipped {} byte(s) to reach the data section", pos - start);
    }

    cur.seek(pos)?;
    let _magic = cur.read_array::<4>()?;
    let section_len = cur.read_u32()?;
    let base = cur.tell();

    debug!("GMIF: data section at {base:#x}, {section_len} bytes declared");
    Ok(base)
}


fn finish_entry(cur: &ByteCursor, base: usize, index: usize, entry: AllocationEntry) -> ExtractedFile {
    let slice = absolute(base, entry.start_offset, entry.end_offset, cur.len()).and_then(|(start, end)| {
        if end > cur.len() {
            warn!("NARC: file {index} ends at {end:#x}, past the end of the archive, it will be cut short");
        }
        cur.sub_slice(start, end)
    });

    let data = match slice {
        Ok(data) => data,
        Err(err) => {
            warn!("NARC: failed to extract file {index}: {err}");
            return ExtractedFile::placeholder(format!("{index:02}.error"), err);
        },
    };

    let ext = sniff_extension(data);
    let name = if entry.name.trim().is_empty() {
        format!("{index:02}.{}", ext.unwrap_or("bin"))
    } else {
        match ext {
            Some(ext) if !has_extension(&entry.name) => format!("{}.{ext}", entry.name),
            _ => entry.name,
        }
    };

    trace!("NARC: {name} ({} bytes)", data.len());
    ExtractedFile::new(name, data.to_vec())
}


/// Turns data-section-relative offsets into buffer offsets.
fn absolute(base: usize, start: u32, end: u32, size: usize) -> Result<(usize, usize), ParseError> {
    match (base.checked_add(start as usize), base.checked_add(end as usize)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ParseError::InvalidRangeError { start: start as usize, end: end as usize, size }),
    }
}


fn has_extension(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|name| name.contains('.'))
}
