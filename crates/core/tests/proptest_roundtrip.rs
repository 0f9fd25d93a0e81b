//! Property-based tests for the Huffman and LZW codecs.
//!
//! These tests verify that codec properties hold across a wide range of inputs:
//! - Both codecs reproduce arbitrary input exactly
//! - LZW encoder and decoder finish with identical dictionaries
//! - No LZW code ever reaches the width ceiling
//! - Huffman tables rebuilt from the header match the encoder's
//!
//! Run with: cargo test --test proptest_roundtrip

use proptest::prelude::*;

use squeeze_core::bitio::BitReader;
use squeeze_core::huffman::{self, FrequencyTable, HuffmanTree};
use squeeze_core::lzw::{self, CodeWidth, LzwDecoder, LzwEncoder};

/// Strategy for LZW code widths, biased toward small dictionaries that overflow.
fn width_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![Just(8u32), Just(9), Just(10), Just(12), Just(16), 8u32..=20]
}

/// Strategy for inputs drawn from a small alphabet, so that sequences repeat.
fn low_entropy_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcd".to_vec()), 0..4096)
}

/// Strategy for arbitrary bytes.
fn bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4096)
}

fn any_input() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![bytes_strategy(), low_entropy_strategy()]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    /// Property: Huffman decode(encode(x)) == x.
    #[test]
    fn prop_huffman_roundtrip(data in any_input()) {
        let compressed = huffman::compress(&data).unwrap();
        let decoded = huffman::decompress(&compressed).unwrap();
        prop_assert_eq!(decoded, data);
    }

    /// Property: the Huffman artifact is header plus exactly the coded bits.
    #[test]
    fn prop_huffman_artifact_size(data in any_input()) {
        let freqs = FrequencyTable::from_bytes(&data);
        let table = HuffmanTree::from_frequencies(&freqs).code_table().unwrap();
        let payload_bits = table.encoded_bits(&freqs);

        let compressed = huffman::compress(&data).unwrap();
        prop_assert_eq!(
            compressed.len() as u64,
            huffman::HEADER_BYTES + payload_bits.div_ceil(8)
        );
    }

    /// Property: the decoder's table, rebuilt from the header, equals the encoder's.
    #[test]
    fn prop_huffman_header_reproduces_table(data in any_input()) {
        let freqs = FrequencyTable::from_bytes(&data);
        let compressed = huffman::compress(&data).unwrap();

        let mut reader = BitReader::new(compressed.as_slice());
        let reread = FrequencyTable::read_header(&mut reader).unwrap();
        prop_assert_eq!(&reread, &freqs);

        let ours = HuffmanTree::from_frequencies(&freqs).code_table().unwrap();
        let theirs = HuffmanTree::from_frequencies(&reread).code_table().unwrap();
        prop_assert_eq!(ours, theirs);
    }

    /// Property: LZW decode(encode(x)) == x for every width.
    #[test]
    fn prop_lzw_roundtrip(data in any_input(), bits in width_strategy()) {
        let width = CodeWidth::new(bits).unwrap();
        let compressed = lzw::compress(&data, width).unwrap();
        let decoded = lzw::decompress(&compressed, width).unwrap();
        prop_assert_eq!(decoded, data);
    }

    /// Property: encoder and decoder build the same dictionary and never pass the ceiling.
    #[test]
    fn prop_lzw_dictionaries_agree(data in low_entropy_strategy(), bits in 9u32..=11) {
        let width = CodeWidth::new(bits).unwrap();

        let mut encoder = LzwEncoder::new(Vec::new(), width);
        encoder.push_all(&data).unwrap();
        let (compressed, enc_dict, enc_stats) = encoder.finish().unwrap();

        let mut decoder = LzwDecoder::new(compressed.as_slice(), width);
        let mut decoded = Vec::new();
        let mut max_code = 0u64;
        while decoder.decode_next(&mut decoded).unwrap() {}

        let mut reader = BitReader::new(compressed.as_slice());
        while let Some(code) = reader.read_bits(bits as usize).unwrap() {
            max_code = max_code.max(code);
        }

        prop_assert_eq!(&decoded, &data);
        prop_assert_eq!(decoder.dictionary(), &enc_dict);
        prop_assert_eq!(decoder.stats().dictionary_resets, enc_stats.dictionary_resets);
        prop_assert!(max_code < width.max_code());
        prop_assert!((enc_dict.len() as u64) < width.max_code() + 1);
    }
}
