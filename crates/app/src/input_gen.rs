//! Sample source generation.
//!
//! When no input file is given, the driver compresses a generated sample
//! whose sections stress the two codecs differently:
//! - runs of one byte (tiny Huffman alphabet, long LZW matches)
//! - English-like words (skewed frequencies, many repeated phrases)
//! - short repeating patterns (LZW dictionary fills and reseeds)
//! - uniform random bytes (incompressible for both)

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::path::{Path, PathBuf};

const WORDS: &[&str] = &[
    "the", "of", "and", "to", "in", "is", "was", "that", "for", "it", "with", "as", "his", "on",
    "be", "at", "by", "had", "not", "are", "but", "from", "or", "have", "an", "they", "which",
    "one", "you", "were", "her", "all", "she", "there", "would", "their", "we", "him", "been",
    "compression", "dictionary", "symbol", "frequency", "stream",
];

/// Generate `size_bytes` of sample data from `seed`.
pub fn generate_sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes);

    while data.len() < size_bytes {
        let section = (size_bytes - data.len()).min(rng.gen_range(2048..=16384));

        match rng.gen_range(0..10u8) {
            // 20% runs
            0..=1 => {
                let byte: u8 = rng.gen();
                data.extend(std::iter::repeat(byte).take(section));
            }

            // 40% prose
            2..=5 => {
                let end = data.len() + section;
                while data.len() < end {
                    let word = WORDS.choose(&mut rng).copied().unwrap_or("the");
                    data.extend_from_slice(word.as_bytes());
                    data.push(if rng.gen_ratio(1, 12) { b'\n' } else { b' ' });
                }
                data.truncate(end);
            }

            // 20% patterns
            6..=7 => {
                let pattern = generate_pattern(&mut rng);
                data.extend(pattern.iter().cycle().take(section));
            }

            // 20% noise
            _ => {
                data.extend((0..section).map(|_| rng.gen::<u8>()));
            }
        }
    }

    data.truncate(size_bytes);
    data
}

fn generate_pattern(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let pattern_len = rng.gen_range(4..=32);
    (0..pattern_len).map(|_| rng.gen()).collect()
}

/// Write a generated sample into `dir` and return its path.
pub fn write_sample_file(dir: &Path, seed: u64, size_bytes: usize) -> std::io::Result<PathBuf> {
    let path = dir.join(format!("squeeze-sample-{seed}.bin"));
    let data = generate_sample_data(seed, size_bytes);
    let mut file = std::fs::File::create(&path)?;
    file.write_all(&data)?;
    Ok(path)
}
