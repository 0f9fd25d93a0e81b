//! squeeze-core: bit-level Huffman and LZW file codecs
//!
//! This library provides two independent compressors built on a shared
//! MSB-first bit stream:
//! - a static Huffman coder whose artifact carries its own frequency table
//! - an adaptive LZW coder with fixed-width codes and a reseeding dictionary
//!
//! # Architecture
//!
//! - `bitio`: bit reading/writing over `std::io` streams
//! - `huffman`: frequency table, arena tree, code table, stream codec
//! - `lzw`: dictionary trie, streaming encoder/decoder
//! - `codec`: file-level facade (`encode`, `decode`, `compression_ratio`)
//! - `stats`: per-call statistics
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Call-scoped state**: trees, dictionaries and file handles live only
//!   for one encode/decode call
//! - **Deterministic**: identical input produces identical artifacts

pub mod bitio;
pub mod codec;
pub mod error;
pub mod huffman;
pub mod lzw;
pub mod stats;

// Re-export commonly used types
pub use codec::{ArtifactPaths, FileCodec, HuffmanCodec, LzwCodec};
pub use error::{Error, Result};
pub use lzw::CodeWidth;
pub use stats::CodecStats;
