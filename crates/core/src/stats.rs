//! Statistics reported by a single encode or decode call.
//!
//! Every codec entry point returns a `CodecStats` describing what it did:
//! byte counts on both sides, the time taken and, for LZW, how the
//! dictionary behaved.
//!
//! # Thread Safety
//!
//! Plain data; each call produces its own value.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecStats {
    // === Sizes ===
    /// Uncompressed bytes consumed (encode) or produced (decode)
    pub original_bytes: u64,

    /// Compressed bytes produced (encode) or consumed (decode), padding included
    pub compressed_bytes: u64,

    /// Bits of code payload, header and padding excluded
    pub payload_bits: u64,

    // === LZW ===
    /// Codes written or read
    pub codes: u64,

    /// Times the dictionary hit its ceiling and was reseeded
    pub dictionary_resets: u64,

    /// Dictionary entries at the end of the call, seeds included
    pub dictionary_size: usize,

    // === Timing ===
    pub duration: Duration,
}

impl CodecStats {
    /// Space saved relative to the original: `1 - compressed / original`.
    ///
    /// Returns 0.0 for an empty original. Negative when the artifact is
    /// larger than its source.
    pub fn compression_ratio(&self) -> f64 {
        compression_ratio(self.original_bytes, self.compressed_bytes)
    }

    /// Mean number of input symbols covered by one LZW code.
    ///
    /// Returns 0.0 if no codes were emitted.
    pub fn mean_code_length(&self) -> f64 {
        if self.codes == 0 {
            0.0
        } else {
            self.original_bytes as f64 / self.codes as f64
        }
    }

    /// Mean payload bits spent per input symbol.
    pub fn bits_per_symbol(&self) -> f64 {
        if self.original_bytes == 0 {
            0.0
        } else {
            self.payload_bits as f64 / self.original_bytes as f64
        }
    }

    /// Uncompressed bytes processed per second.
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.original_bytes as f64 / secs
        }
    }

    /// Export as `key=value` lines (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "original_bytes={}\n\
             compressed_bytes={}\n\
             compression_ratio={:.4}\n\
             payload_bits={}\n\
             bits_per_symbol={:.4}\n\
             codes={}\n\
             mean_code_length={:.4}\n\
             dictionary_resets={}\n\
             dictionary_size={}\n\
             duration_us={}\n",
            self.original_bytes,
            self.compressed_bytes,
            self.compression_ratio(),
            self.payload_bits,
            self.bits_per_symbol(),
            self.codes,
            self.mean_code_length(),
            self.dictionary_resets,
            self.dictionary_size,
            self.duration.as_micros(),
        )
    }
}

/// `1 - compressed / original`, or 0.0 when `original` is zero.
pub fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        1.0 - compressed as f64 / original as f64
    }
}
