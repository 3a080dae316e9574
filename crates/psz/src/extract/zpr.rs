//! Unwraps ZPR files: a 16-byte header in front of a [PRS](super::prs) stream that has been XOR'd with a single byte.
//!
//! | Offset | Width | Meaning |
//! |---|---|---|
//! | `0x00` | 4 | `ZPR\0` |
//! | `0x04` | 4 | unknown |
//! | `0x08` | `u32` | decompressed size |
//! | `0x0C` | 4 | unknown |
//! | `0x10` | .. | PRS stream, every byte XOR `0x95` |

use extract::ByteCursor;
use log::{debug, warn};

use super::prs::{decompress_prs_with_status, Termination};
use super::{check_magic, UnpackError};


pub const ZPR_MAGIC: [u8; 4] = *b"ZPR\0";
pub const ZPR_HEADER_LEN: usize = 0x10;
pub const ZPR_XOR_KEY: u8 = 0x95;


/// Checks whether `data` starts with the ZPR magic.
pub fn is_zpr(data: &[u8]) -> bool {
    data.starts_with(&ZPR_MAGIC)
}


/// Strips the ZPR header, removes the XOR mask and decompresses the payload.
///
/// The output is never longer than the size declared in the header. It can be shorter if the stream ends early, which
/// is logged but not treated as an error; the output is not otherwise validated.
pub fn decompress_zpr(data: &[u8]) -> Result<Vec<u8>, UnpackError> {
    check_magic(data, ZPR_MAGIC, "ZPR")?;
    if data.len() < ZPR_HEADER_LEN {
        return Err(UnpackError::TruncatedHeaderError { format: "ZPR", needed: ZPR_HEADER_LEN, found: data.len() });
    }

    let mut cur = ByteCursor::new(data);
    cur.seek(0x08)?;
    let decompressed_size = cur.read_u32()? as usize;
    cur.seek(ZPR_HEADER_LEN)?;

    let stream: Vec<u8> = cur.read(cur.remaining())?.iter().map(|b| b ^ ZPR_XOR_KEY).collect();
    debug!("ZPR: {} compressed bytes, {decompressed_size} declared", stream.len());

    let (output, status) = decompress_prs_with_status(&stream, Some(decompressed_size));
    if status != Termination::OutputFull && output.len() < decompressed_size {
        warn!("ZPR: stream ended early ({status:?}), got {} of {decompressed_size} bytes", output.len());
    }

    Ok(output)
}
