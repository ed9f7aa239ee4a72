//! Error types shared by the compression core and the archive framer.
//!
//! Follows the same hand-rolled-enum-plus-manual-`Display` pattern used
//! elsewhere in this workspace (see `stats::BuilderError`): a small `enum`
//! per failure domain, a `Display` impl for user-facing messages, and an
//! empty `std::error::Error::source` unless the variant wraps another error.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

/// Failures that can occur inside the bit I/O, Huffman, LZ77, or per-blob
/// codec layers.
#[derive(Debug)]
pub enum CoreError {
    /// The bit reader ran past the end of its input mid-read.
    Truncated,
    /// The per-blob version byte did not match the codec version this
    /// build understands.
    BadVersion(u8),
    /// No Huffman code matched within the 25-bit probe window.
    InvalidCode,
    /// An LZ77 match referenced a distance of zero, or one exceeding the
    /// bytes decoded so far.
    InvalidDistance { distance: u32, output_len: usize },
}

impl Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Truncated => write!(f, "bit stream ended before the read could complete"),
            CoreError::BadVersion(v) => write!(f, "unsupported blob version: {}", v),
            CoreError::InvalidCode => {
                write!(f, "no Huffman code matched within the 25-bit probe window")
            }
            CoreError::InvalidDistance {
                distance,
                output_len,
            } => write!(
                f,
                "invalid LZ77 distance {} at output position {}",
                distance, output_len
            ),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// Failures that can occur while building or extracting an archive
/// container, on top of whatever the codec itself can fail with.
#[derive(Debug)]
pub enum ArchiveError {
    /// The container's leading 4 bytes were not `"ARH1"`.
    BadMagic,
    /// The container version byte was neither `1` nor `2`.
    BadVersion(u8),
    /// An archive-stored path resolved outside the destination root.
    UnsafePath(String),
    /// An input target named on the command line does not exist.
    NotFound(PathBuf),
    /// A lower-level I/O failure (reading/writing files, the archive itself).
    Io(io::Error),
    /// A compressed blob failed to decode.
    Codec(CoreError),
}

impl Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::BadMagic => write!(f, "invalid archive format (bad magic)"),
            ArchiveError::BadVersion(v) => write!(f, "unsupported archive version: {}", v),
            ArchiveError::UnsafePath(p) => write!(f, "unsafe path in archive: {}", p),
            ArchiveError::NotFound(p) => write!(f, "target not found: {}", p.display()),
            ArchiveError::Io(e) => write!(f, "I/O error: {}", e),
            ArchiveError::Codec(e) => write!(f, "codec error: {}", e),
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArchiveError::Io(e) => Some(e),
            ArchiveError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        ArchiveError::Io(e)
    }
}

impl From<CoreError> for ArchiveError {
    fn from(e: CoreError) -> Self {
        ArchiveError::Codec(e)
    }
}
