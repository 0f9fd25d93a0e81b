//! Error types for the squeeze codecs.
//!
//! All operations return structured errors rather than panicking.
//! I/O failures are kept apart from format and state failures so callers
//! can tell a missing file from a corrupted artifact.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all codec operations.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: misuse of the bit stream (e.g. more than 64 bits at once)
/// - Huffman: frequency header or payload problems
/// - LZW: code width or code stream problems
/// - NotEncoded: decode requested before an artifact exists
/// - I/O: file system operations
///
/// Driver configuration problems are reported by the driver itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Huffman codec error (e.g. truncated header, frequency overflow)
    #[error("huffman codec error: {0}")]
    Huffman(#[from] HuffmanError),

    /// LZW codec error (e.g. unresolvable code, bad code width)
    #[error("lzw codec error: {0}")]
    Lzw(#[from] LzwError),

    /// Decode was requested but no compressed artifact exists yet
    #[error("no compressed artifact at {}: encode first", path.display())]
    NotEncoded { path: PathBuf },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bit-level I/O errors.
///
/// Running out of input is not an error here; readers report it as
/// `Ok(None)` so codecs can detect the end of a stream.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// Invalid bit count (more than 64 bits in a single call)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Huffman codec errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// A symbol occurs more often than the header counter width can hold
    #[error("symbol {symbol:#04x} occurs {count} times, header holds at most {max}")]
    FrequencyOverflow { symbol: u8, count: u64, max: u64 },

    /// Compressed stream ended inside the frequency header
    #[error("frequency header truncated after {counters} of 256 counters")]
    TruncatedHeader { counters: usize },

    /// Compressed stream ended before every symbol was decoded
    #[error("payload truncated: expected {expected} symbols, decoded {decoded}")]
    TruncatedPayload { expected: u64, decoded: u64 },

    /// Code length exceeds what fits in a single 64-bit write
    #[error("code length {length} exceeds maximum 64")]
    CodeLengthTooLong { length: usize },

    /// Source byte has no code in the table (source changed between passes)
    #[error("symbol {symbol:#04x} has no code: source changed between passes")]
    UnknownSymbol { symbol: u8 },
}

/// LZW codec errors.
#[derive(Debug, Error)]
pub enum LzwError {
    /// Code width outside the supported range
    #[error("invalid code width {bits}: must be in range [{min}, {max}]")]
    InvalidCodeWidth { bits: u32, min: u32, max: u32 },

    /// Code is neither in the dictionary nor the next code to be assigned
    #[error("invalid code {code}: next assignable code is {next_code}")]
    InvalidCode { code: u32, next_code: u32 },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
