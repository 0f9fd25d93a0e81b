//! Adaptive LZW codec with fixed-width codes.
//!
//! The dictionary starts with one entry per byte value (codes 0..=255) and
//! grows by one entry per emitted code. Codes are written with a fixed
//! width chosen by the caller; the artifact has no header, so the same
//! width must be passed to `decode`.
//!
//! # Dictionary Ceiling
//!
//! With width `w` the largest code is `2^w - 1`. Right after the entry with
//! that code is inserted, the dictionary is reseeded and numbering restarts
//! at 256. Encoder and decoder insert in lock-step (the decoder one code
//! behind), so both reseed at the same logical point of the stream.
//!
//! # Artifact Format
//!
//! ```text
//! +------------------+------------------+-----+---------------+
//! | code (w bits)    | code (w bits)    | ... | zero padding  |
//! +------------------+------------------+-----+---------------+
//! ```
//!
//! Padding is shorter than 8 bits and `w >= 8`, so an incomplete trailing
//! code always marks the end of the stream.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Instant;

use tracing::{debug, trace};

use crate::bitio::{self, BitReader, BitWriter};
use crate::error::{LzwError, Result};
use crate::stats::CodecStats;

/// Number of single-byte seed entries.
pub const SEED_CODES: u32 = 256;

/// Smallest code width that can address every seed entry.
pub const MIN_CODE_BITS: u32 = 8;

pub const MAX_CODE_BITS: u32 = 32;

/// Validated LZW code width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeWidth(u32);

impl CodeWidth {
    /// # Errors
    /// `LzwError::InvalidCodeWidth` unless `8 <= bits <= 32`.
    pub fn new(bits: u32) -> Result<Self> {
        if !(MIN_CODE_BITS..=MAX_CODE_BITS).contains(&bits) {
            return Err(LzwError::InvalidCodeWidth {
                bits,
                min: MIN_CODE_BITS,
                max: MAX_CODE_BITS,
            }
            .into());
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Largest code representable in this width.
    pub fn max_code(self) -> u64 {
        (1u64 << self.0) - 1
    }
}

/// One dictionary entry: its prefix entry plus one trailing symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    prefix: Option<u32>,
    last: u8,
    first: u8,
    len: u32,
}

impl Entry {
    fn seed(symbol: u8) -> Self {
        Self {
            prefix: None,
            last: symbol,
            first: symbol,
            len: 1,
        }
    }
}

/// Outcome of `Dictionary::insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Code assigned to the new entry; `None` when the width leaves no room
    pub code: Option<u32>,
    /// Whether the dictionary was reseeded after this insertion
    pub reset: bool,
}

/// Trie of symbol sequences keyed by `(prefix code, next symbol)`.
///
/// Each code's sequence is stored implicitly as its prefix code plus one
/// symbol, so reconstructing a sequence walks the prefix chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    width: CodeWidth,
    children: HashMap<(u32, u8), u32>,
    entries: Vec<Entry>,
    resets: u64,
}

impl Dictionary {
    /// Create a dictionary holding the 256 seed entries.
    pub fn new(width: CodeWidth) -> Self {
        let mut dictionary = Self {
            width,
            children: HashMap::new(),
            entries: Vec::with_capacity(SEED_CODES as usize),
            resets: 0,
        };
        dictionary.seed();
        dictionary
    }

    fn seed(&mut self) {
        self.children.clear();
        self.entries.clear();
        self.entries.extend((0..=u8::MAX).map(Entry::seed));
    }

    pub fn width(&self) -> CodeWidth {
        self.width
    }

    /// Number of entries, seeds included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the seed entries are never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Code the next insertion will receive.
    pub fn next_code(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Code of `sequence(prefix) + symbol`, if present.
    pub fn lookup(&self, prefix: u32, symbol: u8) -> Option<u32> {
        self.children.get(&(prefix, symbol)).copied()
    }

    /// Length of the sequence behind `code`.
    pub fn sequence_len(&self, code: u32) -> Option<u32> {
        self.entries.get(code as usize).map(|e| e.len)
    }

    pub fn first_symbol(&self, code: u32) -> Option<u8> {
        self.entries.get(code as usize).map(|e| e.first)
    }

    /// Append the sequence behind `code` to `out`.
    ///
    /// Returns false (leaving `out` untouched) if `code` is unknown.
    pub fn append_sequence(&self, code: u32, out: &mut Vec<u8>) -> bool {
        let Some(entry) = self.entries.get(code as usize) else {
            return false;
        };
        let start = out.len();
        out.resize(start + entry.len as usize, 0);

        let mut index = out.len();
        let mut cursor = Some(code);
        while let Some(c) = cursor {
            let entry = self.entries[c as usize];
            index -= 1;
            out[index] = entry.last;
            cursor = entry.prefix;
        }
        true
    }

    pub fn sequence(&self, code: u32) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        self.append_sequence(code, &mut out).then_some(out)
    }

    /// Add `sequence(prefix) + symbol` under the next code.
    ///
    /// When the assigned code is the largest the width allows, the
    /// dictionary is reseeded immediately afterwards. With an 8-bit width
    /// there is never room for a new entry and nothing changes.
    ///
    /// # Errors
    /// `LzwError::InvalidCode` if `prefix` is not in the dictionary.
    pub fn insert(&mut self, prefix: u32, symbol: u8) -> Result<Insertion> {
        let Some(&parent) = self.entries.get(prefix as usize) else {
            return Err(LzwError::InvalidCode {
                code: prefix,
                next_code: self.next_code(),
            }
            .into());
        };

        let max_code = self.width.max_code();
        let next = self.entries.len() as u64;
        if next > max_code {
            return Ok(Insertion {
                code: None,
                reset: false,
            });
        }

        let code = next as u32;
        self.entries.push(Entry {
            prefix: Some(prefix),
            last: symbol,
            first: parent.first,
            len: parent.len + 1,
        });
        self.children.insert((prefix, symbol), code);

        let reset = code as u64 == max_code;
        if reset {
            self.seed();
            self.resets += 1;
            trace!(resets = self.resets, max_code, "lzw dictionary reseeded");
        }
        Ok(Insertion {
            code: Some(code),
            reset,
        })
    }
}

/// Streaming LZW encoder.
///
/// Feed bytes with `push`/`push_all`, then call `finish` to flush the
/// pending prefix and pad the final byte.
#[derive(Debug)]
pub struct LzwEncoder<W: Write> {
    writer: BitWriter<W>,
    dictionary: Dictionary,
    /// Code of the current prefix; `None` before the first symbol
    prefix: Option<u32>,
    codes: u64,
    symbols: u64,
}

impl<W: Write> LzwEncoder<W> {
    pub fn new(output: W, width: CodeWidth) -> Self {
        Self {
            writer: BitWriter::new(output),
            dictionary: Dictionary::new(width),
            prefix: None,
            codes: 0,
            symbols: 0,
        }
    }

    pub fn push(&mut self, symbol: u8) -> Result<()> {
        self.symbols += 1;
        let Some(prefix) = self.prefix else {
            self.prefix = Some(symbol as u32);
            return Ok(());
        };

        match self.dictionary.lookup(prefix, symbol) {
            Some(extended) => self.prefix = Some(extended),
            None => {
                self.emit(prefix)?;
                let insertion = self.dictionary.insert(prefix, symbol)?;
                trace!(
                    code = prefix,
                    symbol,
                    inserted = ?insertion.code,
                    "lzw code emitted"
                );
                self.prefix = Some(symbol as u32);
            }
        }
        Ok(())
    }

    pub fn push_all(&mut self, data: &[u8]) -> Result<()> {
        for &symbol in data {
            self.push(symbol)?;
        }
        Ok(())
    }

    fn emit(&mut self, code: u32) -> Result<()> {
        self.writer
            .write_bits(code as u64, self.dictionary.width().bits() as usize)?;
        self.codes += 1;
        Ok(())
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Flush the pending prefix, pad to a byte boundary and return the
    /// output along with the final dictionary.
    pub fn finish(mut self) -> Result<(W, Dictionary, CodecStats)> {
        if let Some(prefix) = self.prefix.take() {
            self.emit(prefix)?;
        }
        let payload_bits = self.writer.bits_written();
        let output = self.writer.finish()?;

        let stats = CodecStats {
            original_bytes: self.symbols,
            compressed_bytes: payload_bits.div_ceil(8),
            payload_bits,
            codes: self.codes,
            dictionary_resets: self.dictionary.resets(),
            dictionary_size: self.dictionary.len(),
            ..CodecStats::default()
        };
        Ok((output, self.dictionary, stats))
    }
}

/// Streaming LZW decoder.
#[derive(Debug)]
pub struct LzwDecoder<R: Read> {
    reader: BitReader<R>,
    dictionary: Dictionary,
    /// Code of the previously decoded sequence; `None` before the first code
    previous: Option<u32>,
    codes: u64,
    symbols: u64,
}

impl<R: Read> LzwDecoder<R> {
    pub fn new(input: R, width: CodeWidth) -> Self {
        Self {
            reader: BitReader::new(input),
            dictionary: Dictionary::new(width),
            previous: None,
            codes: 0,
            symbols: 0,
        }
    }

    /// Decode one code and append its sequence to `out`.
    ///
    /// Returns `Ok(false)` at the end of the stream.
    ///
    /// # Errors
    /// `LzwError::InvalidCode` if the code is neither in the dictionary nor
    /// the code the encoder defined one step ahead.
    pub fn decode_next(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        let width = self.dictionary.width().bits() as usize;
        let Some(raw) = self.reader.read_bits(width)? else {
            return Ok(false);
        };
        let code = raw as u32;
        let next_code = self.dictionary.next_code();
        let invalid = LzwError::InvalidCode { code, next_code };
        let start = out.len();

        let Some(previous) = self.previous else {
            if !self.dictionary.append_sequence(code, out) {
                return Err(invalid.into());
            }
            self.previous = Some(code);
            self.codes += 1;
            self.symbols += (out.len() - start) as u64;
            return Ok(true);
        };

        let first = if self.dictionary.append_sequence(code, out) {
            out[start]
        } else if code == next_code && self.dictionary.append_sequence(previous, out) {
            // Defined by the encoder one step ahead: previous + previous[0]
            let first = out[start];
            out.push(first);
            first
        } else {
            return Err(invalid.into());
        };

        let insertion = self.dictionary.insert(previous, first)?;
        trace!(
            code,
            previous,
            inserted = ?insertion.code,
            "lzw code decoded"
        );
        if insertion.reset && code >= SEED_CODES {
            // An encoder only emits single-symbol codes right after a reseed
            return Err(LzwError::InvalidCode {
                code,
                next_code: SEED_CODES,
            }
            .into());
        }

        self.previous = Some(code);
        self.codes += 1;
        self.symbols += (out.len() - start) as u64;
        Ok(true)
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Stats for everything decoded so far.
    pub fn stats(&self) -> CodecStats {
        let payload_bits = self.codes * self.dictionary.width().bits() as u64;
        CodecStats {
            original_bytes: self.symbols,
            compressed_bytes: self.reader.bits_read().div_ceil(8),
            payload_bits,
            codes: self.codes,
            dictionary_resets: self.dictionary.resets(),
            dictionary_size: self.dictionary.len(),
            ..CodecStats::default()
        }
    }
}

/// Compress `input` into `output` with the given code width.
pub fn encode<R: Read, W: Write>(input: R, output: W, width: CodeWidth) -> Result<CodecStats> {
    let started = Instant::now();
    let mut encoder = LzwEncoder::new(output, width);
    bitio::for_each_chunk(input, |chunk| encoder.push_all(chunk))?;
    let (_, _, mut stats) = encoder.finish()?;
    stats.duration = started.elapsed();
    debug!(
        bits = width.bits(),
        codes = stats.codes,
        resets = stats.dictionary_resets,
        "lzw encode finished"
    );
    Ok(stats)
}

/// Decompress an LZW artifact written with the same code width.
pub fn decode<R: Read, W: Write>(input: R, mut output: W, width: CodeWidth) -> Result<CodecStats> {
    let started = Instant::now();
    let mut decoder = LzwDecoder::new(input, width);
    let mut buffer = Vec::with_capacity(FLUSH_BYTES);

    while decoder.decode_next(&mut buffer)? {
        if buffer.len() >= FLUSH_BYTES {
            output.write_all(&buffer)?;
            buffer.clear();
        }
    }
    output.write_all(&buffer)?;
    output.flush()?;

    let mut stats = decoder.stats();
    stats.duration = started.elapsed();
    debug!(
        bits = width.bits(),
        codes = stats.codes,
        resets = stats.dictionary_resets,
        "lzw decode finished"
    );
    Ok(stats)
}

const FLUSH_BYTES: usize = 8 * 1024;

/// Compress an in-memory buffer.
pub fn compress(data: &[u8], width: CodeWidth) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode(data, &mut out, width)?;
    Ok(out)
}

/// Decompress an in-memory artifact.
pub fn decompress(data: &[u8], width: CodeWidth) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decode(data, &mut out, width)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn width(bits: u32) -> CodeWidth {
        CodeWidth::new(bits).unwrap()
    }

    fn codes_of(bytes: &[u8], bits: u32) -> Vec<u64> {
        let mut reader = BitReader::new(bytes);
        let mut codes = Vec::new();
        while let Some(code) = reader.read_bits(bits as usize).unwrap() {
            codes.push(code);
        }
        codes
    }

    fn encode_with_dictionary(data: &[u8], bits: u32) -> (Vec<u8>, Dictionary) {
        let mut encoder = LzwEncoder::new(Vec::new(), width(bits));
        encoder.push_all(data).unwrap();
        let (out, dictionary, _) = encoder.finish().unwrap();
        (out, dictionary)
    }

    fn decode_with_dictionary(data: &[u8], bits: u32) -> (Vec<u8>, Dictionary) {
        let mut decoder = LzwDecoder::new(data, width(bits));
        let mut out = Vec::new();
        while decoder.decode_next(&mut out).unwrap() {}
        (out, decoder.dictionary().clone())
    }

    #[test]
    fn test_code_width_bounds() {
        assert!(CodeWidth::new(8).is_ok());
        assert!(CodeWidth::new(32).is_ok());
        assert!(matches!(
            CodeWidth::new(7),
            Err(Error::Lzw(LzwError::InvalidCodeWidth { bits: 7, .. }))
        ));
        assert!(CodeWidth::new(33).is_err());
        assert_eq!(width(9).max_code(), 511);
    }

    #[test]
    fn test_seeded_dictionary() {
        let dictionary = Dictionary::new(width(12));
        assert_eq!(dictionary.len(), 256);
        assert_eq!(dictionary.next_code(), 256);
        assert_eq!(dictionary.sequence(65), Some(b"A".to_vec()));
        assert_eq!(dictionary.sequence(256), None);
    }

    #[test]
    fn test_sequences_follow_prefix_chain() {
        let mut dictionary = Dictionary::new(width(12));
        let ab = dictionary.insert(b'a' as u32, b'b').unwrap().code.unwrap();
        let abc = dictionary.insert(ab, b'c').unwrap().code.unwrap();
        assert_eq!((ab, abc), (256, 257));
        assert_eq!(dictionary.sequence(abc), Some(b"abc".to_vec()));
        assert_eq!(dictionary.first_symbol(abc), Some(b'a'));
        assert_eq!(dictionary.sequence_len(abc), Some(3));
        assert_eq!(dictionary.lookup(ab, b'c'), Some(abc));
        assert_eq!(dictionary.lookup(ab, b'd'), None);
    }

    #[test]
    fn test_scenario_codes() {
        let input = b"AAAABBBCCD";
        let (compressed, dictionary) = encode_with_dictionary(input, 9);

        assert_eq!(
            codes_of(&compressed, 9),
            vec![65, 256, 65, 66, 259, 67, 67, 68]
        );
        // One extension event per emitted code except the final flush
        assert_eq!(dictionary.len(), 256 + 7);
        assert_eq!(decompress(&compressed, width(9)).unwrap(), input);
    }

    #[test]
    fn test_kwk_case() {
        // "aaa..." makes the encoder emit codes the decoder has not seen yet
        let input = vec![b'a'; 100];
        let compressed = compress(&input, width(12)).unwrap();
        let codes = codes_of(&compressed, 12);
        assert_eq!(&codes[..3], &[97, 256, 257]);
        assert_eq!(decompress(&compressed, width(12)).unwrap(), input);
    }

    #[test]
    fn test_dictionaries_match_after_round_trip() {
        let input = b"TOBEORNOTTOBEORTOBEORNOT#TOBEORNOTTOBEORTOBEORNOT".repeat(20);
        for bits in [9, 10, 12, 16] {
            let (compressed, encoder_dict) = encode_with_dictionary(&input, bits);
            let (decoded, decoder_dict) = decode_with_dictionary(&compressed, bits);
            assert_eq!(decoded, input);
            assert_eq!(encoder_dict, decoder_dict, "width {bits}");
        }
    }

    #[test]
    fn test_overflow_reset_in_lock_step() {
        let input: Vec<u8> = (0..20_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let (compressed, encoder_dict) = encode_with_dictionary(&input, 9);
        assert!(encoder_dict.resets() > 0);
        assert!(codes_of(&compressed, 9).iter().all(|&c| c < 511));

        let (decoded, decoder_dict) = decode_with_dictionary(&compressed, 9);
        assert_eq!(decoded, input);
        assert_eq!(encoder_dict.resets(), decoder_dict.resets());
        assert_eq!(encoder_dict, decoder_dict);
    }

    #[test]
    fn test_insert_at_ceiling_reseeds() {
        let mut dictionary = Dictionary::new(width(9));
        let mut last = None;
        for i in 0..256u32 {
            last = Some(dictionary.insert(i, 0).unwrap());
        }
        assert_eq!(
            last,
            Some(Insertion {
                code: Some(511),
                reset: true
            })
        );
        assert_eq!(dictionary.len(), 256);
        assert_eq!(dictionary.next_code(), 256);
        assert_eq!(dictionary.resets(), 1);
    }

    #[test]
    fn test_eight_bit_width_never_grows() {
        let input = b"abababababab";
        let (compressed, dictionary) = encode_with_dictionary(input, 8);
        assert_eq!(compressed, input.to_vec());
        assert_eq!(dictionary.len(), 256);
        assert_eq!(dictionary.resets(), 0);
        assert_eq!(decompress(&compressed, width(8)).unwrap(), input);
    }

    #[test]
    fn test_empty_input() {
        let compressed = compress(b"", width(12)).unwrap();
        assert!(compressed.is_empty());
        assert!(decompress(&compressed, width(12)).unwrap().is_empty());
    }

    #[test]
    fn test_single_byte() {
        let compressed = compress(b"Z", width(12)).unwrap();
        assert_eq!(compressed.len(), 2);
        assert_eq!(decompress(&compressed, width(12)).unwrap(), b"Z");
    }

    #[test]
    fn test_all_symbols_round_trip() {
        let input: Vec<u8> = (0..=255).cycle().take(10_000).collect();
        for bits in [8, 9, 11, 13] {
            let compressed = compress(&input, width(bits)).unwrap();
            assert_eq!(decompress(&compressed, width(bits)).unwrap(), input);
        }
    }

    #[test]
    fn test_unknown_first_code_is_fatal() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(300, 9).unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            decompress(&bytes, width(9)),
            Err(Error::Lzw(LzwError::InvalidCode {
                code: 300,
                next_code: 256
            }))
        ));
    }

    #[test]
    fn test_code_beyond_next_is_fatal() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(65, 9).unwrap();
        writer.write_bits(400, 9).unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(
            decompress(&bytes, width(9)),
            Err(Error::Lzw(LzwError::InvalidCode { code: 400, .. }))
        ));
    }

    #[test]
    fn test_encode_stats() {
        let mut out = Vec::new();
        let stats = encode(&b"AAAABBBCCD"[..], &mut out, width(9)).unwrap();
        assert_eq!(stats.original_bytes, 10);
        assert_eq!(stats.codes, 8);
        assert_eq!(stats.payload_bits, 72);
        assert_eq!(stats.compressed_bytes, 9);
        assert_eq!(stats.dictionary_size, 263);
        assert_eq!(stats.mean_code_length(), 1.25);
    }

    #[test]
    fn test_decode_stats_mirror_encode() {
        let input = b"she sells sea shells by the sea shore".repeat(8);
        let mut compressed = Vec::new();
        let enc = encode(&input[..], &mut compressed, width(10)).unwrap();

        let mut out = Vec::new();
        let dec = decode(&compressed[..], &mut out, width(10)).unwrap();
        assert_eq!(out, input);
        assert_eq!(dec.codes, enc.codes);
        assert_eq!(dec.original_bytes, enc.original_bytes);
        assert_eq!(dec.dictionary_size, enc.dictionary_size);
    }

    #[test]
    fn test_insert_with_unknown_prefix_is_rejected() {
        let mut dictionary = Dictionary::new(width(12));
        assert!(matches!(
            dictionary.insert(9999, b'a'),
            Err(Error::Lzw(LzwError::InvalidCode {
                code: 9999,
                next_code: 256
            }))
        ));
        assert_eq!(dictionary.len(), 256);
    }

    /// Shared buffer the test subscriber writes into.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut inner) = self.0.lock() {
                inner.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_codes_and_insertions_are_traced() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let compressed = compress(b"AAAABBBCCD", width(9)).unwrap();
            decompress(&compressed, width(9)).unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("lzw code emitted").count(), 7);
        assert_eq!(output.matches("lzw code decoded").count(), 7);
        assert!(output.contains("inserted=Some(256)"));
    }
}
