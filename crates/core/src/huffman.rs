//! Static Huffman codec.
//!
//! Encoding makes two passes over a seekable source: the first counts byte
//! frequencies, the second emits one prefix code per byte. The frequency
//! table is persisted verbatim as the header, so the decoder rebuilds the
//! identical tree (and therefore the identical code table) from the
//! artifact alone.
//!
//! # Artifact Format
//!
//! ```text
//! +---------------------------+
//! | 256 x 31-bit counters     |  frequency of byte 0..=255, MSB-first
//! +---------------------------+
//! | payload                   |  code of every input byte, in order
//! +---------------------------+
//! | zero padding              |  up to the next byte boundary
//! +---------------------------+
//! ```
//!
//! The header is exactly 992 bytes. The number of symbols to decode is the
//! sum of the counters; there is no separate length field.
//!
//! # Tree Construction
//!
//! Nodes live in an arena and are identified by their index, which is also
//! their creation order. The min-heap orders by `(frequency, index)`:
//! leaves are created in ascending symbol order, internal nodes are created
//! as they are merged, and the first node popped becomes the left child.
//! Ties therefore resolve deterministically on both sides.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::time::Instant;

use tracing::{debug, warn};

use crate::bitio::{self, BitReader, BitWriter};
use crate::error::{HuffmanError, Result};
use crate::stats::CodecStats;

/// Number of distinct byte symbols.
pub const SYMBOLS: usize = 256;

/// Width of each frequency counter in the header.
pub const FREQUENCY_BITS: usize = 31;

/// Largest count a header counter can hold.
pub const MAX_FREQUENCY: u64 = (1 << FREQUENCY_BITS) - 1;

/// Size of the frequency header in bytes.
pub const HEADER_BYTES: u64 = (SYMBOLS * FREQUENCY_BITS / 8) as u64;

/// Occurrence count per byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; SYMBOLS],
}

impl FrequencyTable {
    /// Create a table with all counters at zero.
    pub fn new() -> Self {
        Self {
            counts: [0; SYMBOLS],
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::new();
        table.add(data);
        table
    }

    /// Count every byte of `reader` until end of stream.
    pub fn count<R: Read>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        bitio::for_each_chunk(reader, |chunk| {
            table.add(chunk);
            Ok(())
        })?;
        Ok(table)
    }

    fn add(&mut self, data: &[u8]) {
        for &byte in data {
            self.counts[byte as usize] += 1;
        }
    }

    pub fn get(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    /// Total number of symbols counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of symbols with a non-zero count.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Iterate `(symbol, count)` over symbols with a non-zero count, in
    /// ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
    }

    /// Write all 256 counters as `FREQUENCY_BITS`-wide integers.
    ///
    /// Validates every counter before writing anything.
    pub fn write_header<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        if let Some((symbol, count)) = self.iter().find(|&(_, count)| count > MAX_FREQUENCY) {
            return Err(HuffmanError::FrequencyOverflow {
                symbol,
                count,
                max: MAX_FREQUENCY,
            }
            .into());
        }
        for &count in &self.counts {
            writer.write_bits(count, FREQUENCY_BITS)?;
        }
        Ok(())
    }

    pub fn read_header<R: Read>(reader: &mut BitReader<R>) -> Result<Self> {
        let mut table = Self::new();
        for (counters, slot) in table.counts.iter_mut().enumerate() {
            *slot = reader
                .read_bits(FREQUENCY_BITS)?
                .ok_or(HuffmanError::TruncatedHeader { counters })?;
        }
        Ok(table)
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of a node in the tree arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Leaf { symbol: u8, freq: u64 },
    Internal { freq: u64, left: NodeId, right: NodeId },
}

impl Node {
    pub fn freq(&self) -> u64 {
        match *self {
            Node::Leaf { freq, .. } | Node::Internal { freq, .. } => freq,
        }
    }
}

/// Huffman prefix tree stored as an arena of nodes.
///
/// An empty frequency table produces a tree without a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl HuffmanTree {
    /// Build the tree with the greedy two-smallest merge.
    pub fn from_frequencies(freqs: &FrequencyTable) -> Self {
        let mut nodes = Vec::with_capacity(2 * SYMBOLS);
        let mut heap = BinaryHeap::with_capacity(SYMBOLS);

        for (symbol, freq) in freqs.iter() {
            heap.push(Reverse((freq, nodes.len())));
            nodes.push(Node::Leaf { symbol, freq });
        }

        while heap.len() > 1 {
            let (Some(Reverse((left_freq, left))), Some(Reverse((right_freq, right)))) =
                (heap.pop(), heap.pop())
            else {
                break;
            };
            let freq = left_freq + right_freq;
            heap.push(Reverse((freq, nodes.len())));
            nodes.push(Node::Internal { freq, left, right });
        }

        let root = heap.pop().map(|Reverse((_, id))| id);
        Self { nodes, root }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of nodes, leaves and internal.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Number of symbols the tree encodes (the root frequency).
    pub fn total(&self) -> u64 {
        self.root
            .and_then(|id| self.nodes.get(id))
            .map_or(0, Node::freq)
    }

    /// Derive the code of every leaf by depth-first traversal.
    ///
    /// Left edges contribute a 0 bit, right edges a 1 bit. A tree with a
    /// single leaf assigns that symbol the one-bit code `0`.
    pub fn code_table(&self) -> Result<CodeTable> {
        let mut table = CodeTable::new();
        let Some(root) = self.root else {
            return Ok(table);
        };

        if let Node::Leaf { symbol, .. } = self.nodes[root] {
            table.codes[symbol as usize] = Some(Code { bits: 0, len: 1 });
            return Ok(table);
        }

        let mut stack: Vec<(NodeId, Code)> = vec![(root, Code { bits: 0, len: 0 })];
        while let Some((id, code)) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf { symbol, .. } => table.codes[symbol as usize] = Some(code),
                Node::Internal { left, right, .. } => {
                    let len = code.len as usize + 1;
                    if len > bitio::MAX_BITS {
                        return Err(HuffmanError::CodeLengthTooLong { length: len }.into());
                    }
                    stack.push((right, code.child(true)));
                    stack.push((left, code.child(false)));
                }
            }
        }
        Ok(table)
    }

    /// Decode one symbol by walking from the root, one bit per edge.
    ///
    /// Returns `Ok(None)` if the stream ends before a leaf is reached or the
    /// tree is empty.
    pub fn decode_symbol<R: Read>(&self, reader: &mut BitReader<R>) -> Result<Option<u8>> {
        let Some(mut id) = self.root else {
            return Ok(None);
        };

        if let Node::Leaf { symbol, .. } = self.nodes[id] {
            // Single-symbol tree: every symbol occupies one bit
            return Ok(reader.read_bit()?.map(|_| symbol));
        }

        loop {
            match self.nodes[id] {
                Node::Leaf { symbol, .. } => return Ok(Some(symbol)),
                Node::Internal { left, right, .. } => match reader.read_bit()? {
                    Some(false) => id = left,
                    Some(true) => id = right,
                    None => return Ok(None),
                },
            }
        }
    }
}

/// A single prefix code: the low `len` bits of `bits`, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub bits: u64,
    pub len: u8,
}

impl Code {
    fn child(self, bit: bool) -> Self {
        Self {
            bits: (self.bits << 1) | bit as u64,
            len: self.len + 1,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.len).rev() {
            let bit = (self.bits >> i) & 1;
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Symbol to code mapping derived from a `HuffmanTree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: [Option<Code>; SYMBOLS],
}

impl CodeTable {
    fn new() -> Self {
        Self {
            codes: [None; SYMBOLS],
        }
    }

    pub fn get(&self, symbol: u8) -> Option<Code> {
        self.codes[symbol as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(symbol, code)| code.map(|c| (symbol as u8, c)))
    }

    /// Payload size in bits for the given frequencies (weighted path length).
    pub fn encoded_bits(&self, freqs: &FrequencyTable) -> u64 {
        self.iter()
            .map(|(symbol, code)| freqs.get(symbol) * code.len as u64)
            .sum()
    }
}

/// Compress a seekable source into `output`.
///
/// The source is read from its current position to the end twice: once to
/// count frequencies and once to emit codes.
pub fn encode<R: Read + Seek, W: Write>(mut input: R, output: W) -> Result<CodecStats> {
    let started = Instant::now();
    let origin = input.stream_position()?;

    let freqs = FrequencyTable::count(&mut input)?;
    let tree = HuffmanTree::from_frequencies(&freqs);
    let table = tree.code_table()?;
    debug!(
        symbols = freqs.total(),
        distinct = freqs.distinct(),
        nodes = tree.len(),
        "huffman tree built"
    );

    let mut writer = BitWriter::new(output);
    freqs.write_header(&mut writer)?;
    let header_bits = writer.bits_written();

    input.seek(SeekFrom::Start(origin))?;
    bitio::for_each_chunk(&mut input, |chunk| {
        for &symbol in chunk {
            let code = table
                .get(symbol)
                .ok_or(HuffmanError::UnknownSymbol { symbol })?;
            writer.write_bits(code.bits, code.len as usize)?;
        }
        Ok(())
    })?;

    let payload_bits = writer.bits_written() - header_bits;
    let total_bits = writer.bits_written();
    writer.finish()?;

    Ok(CodecStats {
        original_bytes: freqs.total(),
        compressed_bytes: total_bits.div_ceil(8),
        payload_bits,
        duration: started.elapsed(),
        ..CodecStats::default()
    })
}

/// Decompress a Huffman artifact into `output`.
///
/// If the payload ends early, the symbols decoded so far are written and
/// flushed before `HuffmanError::TruncatedPayload` is returned.
pub fn decode<R: Read, W: Write>(input: R, mut output: W) -> Result<CodecStats> {
    let started = Instant::now();
    let mut reader = BitReader::new(input);

    let freqs = FrequencyTable::read_header(&mut reader)?;
    let tree = HuffmanTree::from_frequencies(&freqs);
    let expected = tree.total();
    let header_bits = reader.bits_read();
    debug!(symbols = expected, distinct = freqs.distinct(), "huffman header read");

    let mut decoded = 0u64;
    while decoded < expected {
        match tree.decode_symbol(&mut reader)? {
            Some(symbol) => output.write_all(&[symbol])?,
            None => {
                output.flush()?;
                warn!(expected, decoded, "huffman payload ended early");
                return Err(HuffmanError::TruncatedPayload { expected, decoded }.into());
            }
        }
        decoded += 1;
    }
    output.flush()?;

    let total_bits = reader.bits_read();
    Ok(CodecStats {
        original_bytes: decoded,
        compressed_bytes: total_bits.div_ceil(8),
        payload_bits: total_bits - header_bits,
        duration: started.elapsed(),
        ..CodecStats::default()
    })
}

/// Compress an in-memory buffer.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode(Cursor::new(data), &mut out)?;
    Ok(out)
}

/// Decompress an in-memory artifact.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decode(data, &mut out)?;
    Ok(out)
}
