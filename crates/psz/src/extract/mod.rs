//! Extraction of compressed/archival formats: [ZPR][zpr] wrapping a [PRS][prs] stream, and the [NARC][narc] and
//! [ZARC][zarc] containers.
//!
//! Most models come as a ZPR-compressed NARC; some texture sets come as a ZARC, which may or may not be wrapped in ZPR.
//! [`unpack`] handles all of these.

use std::fmt::Debug;

use extract::{ByteCursor, ParseError};
use thiserror::Error;


mod narc;
mod prs;
mod zarc;
mod zpr;

#[cfg(test)]
pub(crate) mod testing;

pub use narc::*;
pub use prs::*;
pub use zarc::*;
pub use zpr::*;


#[derive(Error, Debug)]
pub enum UnpackError {
    #[error("bad {format} magic: expected {}, found {}", hex(.expected), hex(.found))]
    BadMagicError { format: &'static str, expected: [u8; 4], found: Vec<u8> },

    #[error("{format} header is truncated: need at least {needed} bytes, found {found}")]
    TruncatedHeaderError { format: &'static str, needed: usize, found: usize },

    #[error("no GMIF data section within {window} bytes of offset {start:#x}")]
    NoDataSectionError { start: usize, window: usize },

    #[error("not a known archive format (starts with {})", hex(.found))]
    UnknownFormatError { found: Vec<u8> },

    #[error(transparent)]
    CursorError(#[from] ParseError),
}


fn hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "nothing".to_owned();
    }

    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}


/// Checks that a whole buffer starts with `expected`.
pub(crate) fn check_magic(data: &[u8], expected: [u8; 4], format: &'static str) -> Result<(), UnpackError> {
    if !data.starts_with(&expected) {
        return Err(UnpackError::BadMagicError { format, expected, found: data.iter().take(4).copied().collect() });
    }

    Ok(())
}


/// Reads four bytes at the cursor and checks them against `expected`.
pub(crate) fn expect_magic(cur: &mut ByteCursor, expected: [u8; 4], format: &'static str) -> Result<(), UnpackError> {
    let found = cur.read_array::<4>()?;
    if found != expected {
        return Err(UnpackError::BadMagicError { format, expected, found: found.to_vec() });
    }

    Ok(())
}


/// One file pulled out of an archive.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Either the name stored in the archive or one synthesised from the entry's index.
    pub name: String,

    /// An owned copy of the file's bytes. Empty for placeholders.
    pub data: Vec<u8>,

    /// Set when the entry could not be sliced out of the archive. The entry is still emitted, with no data and an
    /// `.error` name, so that indices line up with any metadata kept alongside the archive.
    pub error: Option<ParseError>,
}


impl ExtractedFile {
    pub(crate) fn new(name: String, data: Vec<u8>) -> Self {
        Self { name, data, error: None }
    }

    pub(crate) fn placeholder(name: String, error: ParseError) -> Self {
        Self { name, data: Vec::new(), error: Some(error) }
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }

    /// The part of the name after its last `.`, if the final path component has one.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.name.rsplit('/').next().unwrap_or(&self.name);
        file_name.rsplit_once('.').map(|(_, ext)| ext)
    }
}


impl Debug for ExtractedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Payloads can be huge, only show their length
        f.debug_struct("ExtractedFile")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .field("error", &self.error)
            .finish()
    }
}


/// The formats that can be recognised from their first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zpr,
    Narc,
    Zarc,
}


impl ArchiveKind {
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data.get(0..4)? {
            m if m == ZPR_MAGIC => Some(Self::Zpr),
            m if m == NARC_MAGIC => Some(Self::Narc),
            m if m == ZARC_MAGIC => Some(Self::Zarc),
            _ => None,
        }
    }
}


/// Sub-formats commonly found inside archives, keyed by their first four bytes.
const KNOWN_MAGICS: [([u8; 4], &str); 6] = [
    (*b"BMD0", "nsbmd"),
    (*b"BTX0", "nsbtx"),
    (*b"BCA0", "nsbca"),
    (*b"BTP0", "nsbtp"),
    (*b"BTA0", "nsbta"),
    (*b"NARC", "narc"),
];


/// Guesses a file extension from the first four bytes of a file. `None` means "generic binary".
pub fn sniff_extension(data: &[u8]) -> Option<&'static str> {
    let magic = data.get(0..4)?;
    KNOWN_MAGICS.iter().find(|(m, _)| m == magic).map(|&(_, ext)| ext)
}


/// Extracts every file from an already-decompressed NARC or ZARC, picking the reader by the magic at offset 0.
pub fn extract_archive(data: &[u8]) -> Result<Vec<ExtractedFile>, UnpackError> {
    match ArchiveKind::detect(data) {
        Some(ArchiveKind::Narc) => extract_narc(data),
        Some(ArchiveKind::Zarc) => extract_zarc(data),
        _ => Err(UnpackError::UnknownFormatError { found: data.iter().take(4).copied().collect() }),
    }
}


/// Decompresses `data` first if it is ZPR-wrapped, then extracts it with [`extract_archive`].
pub fn unpack(data: &[u8]) -> Result<Vec<ExtractedFile>, UnpackError> {
    if is_zpr(data) {
        extract_archive(&decompress_zpr(data)?)
    } else {
        extract_archive(data)
    }
}


/// Alias of [`decompress_zpr`], by the name the rest of the asset pipeline uses for it.
pub fn decompress_wrapper(data: &[u8]) -> Result<Vec<u8>, UnpackError> {
    decompress_zpr(data)
}
