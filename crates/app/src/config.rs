//! Configuration for the squeeze driver.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including a sample input that is reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: it generates a sample file and
//! runs both codecs over the default range of LZW widths. All defaults are
//! printed on request so runs are reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use squeeze_core::lzw::{MAX_CODE_BITS, MIN_CODE_BITS};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Level;

/// Which codecs a run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecChoice {
    Huffman,
    Lzw,
    Both,
}

impl CodecChoice {
    fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "huffman" => Ok(Self::Huffman),
            "lzw" => Ok(Self::Lzw),
            "both" => Ok(Self::Both),
            other => Err(format!("invalid codec: {other} (expected huffman, lzw or both)")),
        }
    }

    pub fn huffman(self) -> bool {
        matches!(self, Self::Huffman | Self::Both)
    }

    pub fn lzw(self) -> bool {
        matches!(self, Self::Lzw | Self::Both)
    }
}

/// Complete configuration for a driver run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// Input file path (None = generate sample)
    pub input_file: Option<PathBuf>,

    /// Directory for the generated sample
    pub sample_dir: PathBuf,

    // === Sample ===
    /// Seed for the generated sample
    pub seed: u64,

    /// Size of the generated sample in bytes
    pub sample_bytes: usize,

    // === Codecs ===
    pub codec: CodecChoice,

    /// LZW code widths to run, one run per width
    pub lzw_bits: RangeInclusive<u32>,

    // === Behavior ===
    pub log_level: Level,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to dump raw per-run statistics after the summary
    pub print_stats: bool,

    /// Whether to check decoded files against their source
    pub verify: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no seed is given, one is derived from the clock and reported by
    /// `print` so the run can be repeated. `--help` is reported as
    /// `Ok(None)`.
    pub fn from_args(args: &[String]) -> Result<Option<Self>, String> {
        let mut input_file: Option<PathBuf> = None;
        let mut sample_dir: Option<PathBuf> = None;
        let mut seed: Option<u64> = None;
        let mut sample_bytes: Option<usize> = None;
        let mut codec = CodecChoice::Both;
        let mut bits: Option<u32> = None;
        let mut bits_from: Option<u32> = None;
        let mut bits_to: Option<u32> = None;
        let mut log_level = Level::WARN;
        let mut print_config = false;
        let mut print_stats = false;
        let mut verify = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--in" => {
                    input_file = Some(PathBuf::from(value(args, &mut i, "a path")?));
                }
                "--sample-dir" => {
                    sample_dir = Some(PathBuf::from(value(args, &mut i, "a path")?));
                }
                "--seed" => {
                    seed = Some(value(args, &mut i, "a number")?.parse().map_err(|_| "invalid seed")?);
                }
                "--sample-bytes" => {
                    sample_bytes = Some(
                        value(args, &mut i, "a number")?
                            .parse()
                            .map_err(|_| "invalid sample-bytes")?,
                    );
                }
                "--codec" => {
                    codec = CodecChoice::parse(value(args, &mut i, "a codec name")?)?;
                }
                "--bits" => {
                    bits = Some(value(args, &mut i, "a number")?.parse().map_err(|_| "invalid bits")?);
                }
                "--bits-from" => {
                    bits_from = Some(
                        value(args, &mut i, "a number")?
                            .parse()
                            .map_err(|_| "invalid bits-from")?,
                    );
                }
                "--bits-to" => {
                    bits_to = Some(
                        value(args, &mut i, "a number")?
                            .parse()
                            .map_err(|_| "invalid bits-to")?,
                    );
                }
                "--log-level" => {
                    log_level = parse_level(value(args, &mut i, "a level")?)?;
                }
                "--print-config" => {
                    print_config = true;
                }
                "--print-stats" => {
                    print_stats = true;
                }
                "--no-verify" => {
                    verify = false;
                }
                "--help" | "-h" => {
                    return Ok(None);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        let lzw_bits = match (bits, bits_from, bits_to) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err("--bits cannot be combined with --bits-from/--bits-to".to_string());
            }
            (Some(b), None, None) => b..=b,
            (None, from, to) => from.unwrap_or(DEFAULT_BITS_FROM)..=to.unwrap_or(DEFAULT_BITS_TO),
        };
        validate_bits(&lzw_bits)?;

        let seed = seed.unwrap_or_else(clock_seed);

        Ok(Some(Config {
            input_file,
            sample_dir: sample_dir.unwrap_or_else(std::env::temp_dir),
            seed,
            sample_bytes: sample_bytes.unwrap_or_else(|| default_sample_bytes(seed)),
            codec,
            lzw_bits,
            log_level,
            print_config,
            print_stats,
            verify,
        }))
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.input_file {
            Some(path) => println!("Input file:   {}", path.display()),
            None => {
                println!("Input file:   (generate sample)");
                println!("Sample dir:   {}", self.sample_dir.display());
                println!("Sample size:  {} bytes ({} KiB)", self.sample_bytes, self.sample_bytes / 1024);
            }
        }
        println!("Seed:         {}", self.seed);
        println!();
        println!("=== Codecs ===");
        println!("Huffman:      {}", if self.codec.huffman() { "yes" } else { "no" });
        if self.codec.lzw() {
            println!("LZW widths:   {}..={} bits", self.lzw_bits.start(), self.lzw_bits.end());
        } else {
            println!("LZW widths:   (skipped)");
        }
        println!("Verify:       {}", if self.verify { "crc32 + size" } else { "off" });
        println!("Log level:    {}", self.log_level);
        println!();
    }
}

const DEFAULT_BITS_FROM: u32 = 10;
const DEFAULT_BITS_TO: u32 = 12;

fn value<'a>(args: &'a [String], i: &mut usize, what: &str) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires {what}"))
}

fn parse_level(s: &str) -> Result<Level, String> {
    match s.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!("invalid log level: {other}")),
    }
}

fn validate_bits(range: &RangeInclusive<u32>) -> Result<(), String> {
    for bits in [*range.start(), *range.end()] {
        if !(MIN_CODE_BITS..=MAX_CODE_BITS).contains(&bits) {
            return Err(format!(
                "code width {bits} out of range {MIN_CODE_BITS}..={MAX_CODE_BITS}"
            ));
        }
    }
    if range.start() > range.end() {
        return Err(format!(
            "empty width range {}..={}",
            range.start(),
            range.end()
        ));
    }
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Between 64 KiB and 1 MiB, chosen by the seed.
fn default_sample_bytes(seed: u64) -> usize {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.gen_range(64..=1024) * 1024
}

pub fn print_help() {
    println!("squeeze: Huffman and LZW file compression");
    println!();
    println!("USAGE:");
    println!("    squeeze [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --in <PATH>             Input file (default: generate sample)");
    println!("    --sample-dir <PATH>     Where to write the sample (default: temp dir)");
    println!("    --seed <N>              Random seed for the sample");
    println!("    --sample-bytes <N>      Sample size (default: random 64 KiB - 1 MiB)");
    println!();
    println!("    --codec <NAME>          huffman, lzw or both (default: both)");
    println!("    --bits <N>              Single LZW code width");
    println!("    --bits-from <N>         First LZW code width (default: 10)");
    println!("    --bits-to <N>           Last LZW code width (default: 12)");
    println!();
    println!("    --log-level <LEVEL>     trace, debug, info, warn, error (default: warn)");
    println!("    --print-config          Print resolved configuration");
    println!("    --print-stats           Print raw statistics of every run");
    println!("    --no-verify             Skip the round-trip check");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    squeeze                                  # Sample file, both codecs");
    println!("    squeeze --seed 42                        # Deterministic sample");
    println!("    squeeze --in book.txt --codec lzw --bits-from 9 --bits-to 16");
    println!("    squeeze --in book.txt --codec huffman --log-level info");
    println!();
}
