//! Bit-level I/O over byte streams.
//!
//! This module provides `BitWriter` and `BitReader`, thin adapters that sit
//! between a byte-oriented `std::io::Write`/`Read` and the bit-granular
//! Huffman and LZW codecs. Both operate MSB-first.
//!
//! # Padding Rules
//! - `BitWriter`: `align`/`finish` pad an incomplete byte with trailing zeros
//! - `BitReader`: running out of bytes mid-value yields `Ok(None)`, which
//!   codecs treat as the end of the stream
//!
//! # Example
//! ```
//! use squeeze_core::bitio::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_bits(0b101, 3).unwrap(); // 1, 0, 1
//! writer.write_bits(0b11, 2).unwrap(); // 1, 1
//! let bytes = writer.finish().unwrap(); // 10111 -> padded to 10111000
//! assert_eq!(bytes, vec![0b1011_1000]);
//!
//! let mut reader = BitReader::new(&bytes[..]);
//! assert_eq!(reader.read_bits(3).unwrap(), Some(0b101));
//! assert_eq!(reader.read_bits(2).unwrap(), Some(0b11));
//! assert_eq!(reader.read_bits(8).unwrap(), None);
//! ```

use std::io::{self, Read, Write};

use crate::error::{BitIoError, Result};

/// Largest bit count accepted by a single read or write.
pub const MAX_BITS: usize = 64;

/// Writes bits MSB-first into a byte sink.
///
/// Accumulates bits in a one-byte buffer and writes every completed byte to
/// the inner writer. Wrap files in a `BufWriter`; this type issues one-byte
/// writes.
///
/// # Invariants
/// - `bit_count` is always < 8
/// - bits above `bit_count` in `bit_buffer` are zero
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    inner: W,
    /// Accumulator for the current partial byte (MSB-aligned)
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
    /// Total bits accepted, padding excluded
    bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bit_buffer: 0,
            bit_count: 0,
            bits_written: 0,
        }
    }

    /// Write the low `count` bits of `value`, most significant first.
    ///
    /// For example, writing value=0b101 with count=3 writes bits 1, 0, 1.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `Error::Io` if the inner writer fails
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        if count > MAX_BITS {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut remaining = count;
        let mut val = value;

        while remaining > 0 {
            let bits_to_write = remaining.min(8 - self.bit_count as usize);

            // Top bits_to_write bits of the part not yet written
            let shift = remaining - bits_to_write;
            let bits = ((val >> shift) & ((1 << bits_to_write) - 1)) as u8;

            self.bit_buffer |= bits << (8 - self.bit_count as usize - bits_to_write);
            self.bit_count += bits_to_write as u8;

            if self.bit_count == 8 {
                self.flush_byte()?;
            }

            val &= (1 << shift) - 1;
            remaining -= bits_to_write;
        }

        self.bits_written += count as u64;
        Ok(())
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u64, 1)
    }

    /// Pad the current byte with zeros so the next write starts on a byte
    /// boundary. Returns the number of padding bits; 0 when already aligned.
    pub fn align(&mut self) -> Result<u8> {
        if self.bit_count == 0 {
            return Ok(0);
        }
        let padding = 8 - self.bit_count;
        self.flush_byte()?;
        Ok(padding)
    }

    /// Align, flush the inner writer and return it.
    pub fn finish(mut self) -> Result<W> {
        self.align()?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Total number of data bits written, padding excluded.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Whether the next write starts on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit_count == 0
    }

    fn flush_byte(&mut self) -> io::Result<()> {
        self.inner.write_all(&[self.bit_buffer])?;
        self.bit_buffer = 0;
        self.bit_count = 0;
        Ok(())
    }
}

/// Reads bits MSB-first from a byte source.
///
/// Padding bits at the end of a stream are indistinguishable from data; the
/// codecs know how many values to expect (Huffman) or rely on padding being
/// shorter than one value (LZW).
///
/// # Invariants
/// - `bits_left` is always <= 8
#[derive(Debug)]
pub struct BitReader<R: Read> {
    inner: R,
    /// Byte currently being consumed
    current: u8,
    /// Unread bits remaining in `current` (0 = fetch next byte)
    bits_left: u8,
    /// Total bits returned to callers
    bits_read: u64,
}

impl<R: Read> BitReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            bits_left: 0,
            bits_read: 0,
        }
    }

    /// Read `count` bits, most significant first.
    ///
    /// Returns `Ok(None)` when the source runs dry before `count` bits were
    /// assembled. Bits consumed by such a partial read are lost.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `Error::Io` if the inner reader fails
    pub fn read_bits(&mut self, count: usize) -> Result<Option<u64>> {
        if count > MAX_BITS {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut result = 0u64;
        let mut remaining = count;

        while remaining > 0 {
            if self.bits_left == 0 {
                match self.next_byte()? {
                    Some(byte) => {
                        self.current = byte;
                        self.bits_left = 8;
                    }
                    None => return Ok(None),
                }
            }

            let bits_to_read = remaining.min(self.bits_left as usize);
            let mask = ((1u16 << bits_to_read) - 1) as u8;
            let bits = (self.current >> (self.bits_left as usize - bits_to_read)) & mask;

            result = (result << bits_to_read) | bits as u64;

            self.bits_left -= bits_to_read as u8;
            self.bits_read += bits_to_read as u64;
            remaining -= bits_to_read;
        }

        Ok(Some(result))
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<Option<bool>> {
        Ok(self.read_bits(1)?.map(|bit| bit == 1))
    }

    /// Total number of bits consumed so far.
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Read `reader` to the end in fixed-size chunks, handing each to `f`.
///
/// Returns the number of bytes read.
pub(crate) fn for_each_chunk<R: Read>(
    mut reader: R,
    mut f: impl FnMut(&[u8]) -> Result<()>,
) -> Result<u64> {
    let mut buffer = [0u8; CHUNK_BYTES];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        f(&buffer[..n])?;
        total += n as u64;
    }
}

const CHUNK_BYTES: usize = 8 * 1024;
