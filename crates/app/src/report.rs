//! Round-trip verification and the run summary.
//!
//! Each codec run is checked by comparing the size and CRC32 of the decoded
//! file with the source, then reported as one row of the summary table.

use squeeze_core::{CodecStats, FileCodec};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Size and CRC32 of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub len: u64,
    pub crc32: u32,
}

impl Fingerprint {
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = [0u8; 8192];
        let mut len = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
            len += n as u64;
        }
        Ok(Self {
            len,
            crc32: hasher.finalize(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Skipped,
    Passed,
    SizeMismatch { expected: u64, actual: u64 },
    CrcMismatch { expected: u32, actual: u32 },
}

impl Verification {
    pub fn check(source: &Fingerprint, decoded: &Fingerprint) -> Self {
        if source.len != decoded.len {
            Self::SizeMismatch {
                expected: source.len,
                actual: decoded.len,
            }
        } else if source.crc32 != decoded.crc32 {
            Self::CrcMismatch {
                expected: source.crc32,
                actual: decoded.crc32,
            }
        } else {
            Self::Passed
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. } | Self::CrcMismatch { .. })
    }

    fn label(&self) -> String {
        match self {
            Self::Skipped => "-".to_string(),
            Self::Passed => "ok".to_string(),
            Self::SizeMismatch { expected, actual } => format!("size {actual} != {expected}"),
            Self::CrcMismatch { expected, actual } => format!("crc {actual:08x} != {expected:08x}"),
        }
    }
}

/// Outcome of one encode/decode run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed {
        encode: CodecStats,
        decode: CodecStats,
        ratio: f64,
        verification: Verification,
    },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub codec: String,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Build a report from a codec whose encode and decode both succeeded.
    pub fn completed(codec: &dyn FileCodec, verification: Verification) -> squeeze_core::Result<Self> {
        Ok(Self {
            codec: codec.name(),
            outcome: RunOutcome::Completed {
                encode: codec.last_encode().cloned().unwrap_or_default(),
                decode: codec.last_decode().cloned().unwrap_or_default(),
                ratio: codec.compression_ratio()?,
                verification,
            },
        })
    }

    pub fn failed(codec: &dyn FileCodec, error: &squeeze_core::Error) -> Self {
        Self {
            codec: codec.name(),
            outcome: RunOutcome::Failed(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            RunOutcome::Completed { verification, .. } => verification.is_failure(),
            RunOutcome::Failed(_) => true,
        }
    }

    fn row(&self) -> String {
        match &self.outcome {
            RunOutcome::Completed {
                encode,
                decode,
                ratio,
                verification,
            } => {
                let mean = if encode.codes > 0 {
                    format!("{:.3}", encode.mean_code_length())
                } else {
                    "-".to_string()
                };
                format!(
                    "{:<10} {:>12} {:>12} {:>8.2}% {:>9.3} {:>9} {:>7} {:>8} {:>8} {:>8.2}  {}",
                    self.codec,
                    encode.original_bytes,
                    encode.compressed_bytes,
                    ratio * 100.0,
                    encode.bits_per_symbol(),
                    mean,
                    encode.dictionary_resets,
                    encode.duration.as_millis(),
                    decode.duration.as_millis(),
                    encode.throughput_bps() / 1_000_000.0,
                    verification.label(),
                )
            }
            RunOutcome::Failed(error) => format!("{:<10} error: {error}", self.codec),
        }
    }
}

/// Print the summary table of all runs to stdout.
pub fn print_summary(source: &Path, reports: &[RunReport]) {
    println!("\n=== Compression Summary ===");
    println!("Source: {}", source.display());
    println!();
    println!(
        "{:<10} {:>12} {:>12} {:>9} {:>9} {:>9} {:>7} {:>8} {:>8} {:>8}  {}",
        "codec", "original", "encoded", "ratio", "bits/sym", "mean len", "resets", "enc ms", "dec ms", "enc MB/s", "verify"
    );
    for report in reports {
        println!("{}", report.row());
    }
    println!();
}

/// Raw encode and decode statistics of every completed run, as
/// `key=value` lines under a `[codec encode|decode]` heading.
pub fn stats_text(reports: &[RunReport]) -> String {
    let mut text = String::new();
    for report in reports {
        if let RunOutcome::Completed { encode, decode, .. } = &report.outcome {
            text.push_str(&format!("[{} encode]\n{}", report.codec, encode.export_text()));
            text.push_str(&format!("[{} decode]\n{}", report.codec, decode.export_text()));
        }
    }
    text
}

/// Print just the final result (pass/fail).
pub fn print_result(reports: &[RunReport]) {
    let failures = reports.iter().filter(|r| r.is_failure()).count();
    if failures == 0 {
        println!("✓ {} run(s) completed successfully", reports.len());
    } else {
        println!("✗ {failures} of {} run(s) failed", reports.len());
    }
}
