//! File-level codec facade.
//!
//! A codec is bound to one source file. `encode` writes
//! `encoded_<name>` next to the source and `decode` turns that artifact back
//! into `decoded_<name>`. Every file handle is scoped to the call that opens
//! it and is released on all exit paths.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::huffman;
use crate::lzw::{self, CodeWidth};
use crate::stats::{self, CodecStats};

/// Paths of the source file and the artifacts derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub source: PathBuf,
    pub encoded: PathBuf,
    pub decoded: PathBuf,
}

impl ArtifactPaths {
    /// Derive `encoded_<name>` and `decoded_<name>` in the source's
    /// directory (the current directory when it has none).
    pub fn for_source(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            encoded: dir.join(format!("encoded_{name}")),
            decoded: dir.join(format!("decoded_{name}")),
            source,
        }
    }
}

/// A compression algorithm bound to one source file.
pub trait FileCodec {
    /// Short algorithm name for reports.
    fn name(&self) -> String;

    fn paths(&self) -> &ArtifactPaths;

    /// Compress the source; returns the artifact path.
    ///
    /// On failure no artifact is left behind, so a later `decode` reports
    /// `Error::NotEncoded`.
    fn encode(&mut self) -> Result<PathBuf>;

    /// Decompress the artifact; returns the decoded file path.
    fn decode(&mut self) -> Result<PathBuf>;

    /// Stats of the most recent `encode`, if any.
    fn last_encode(&self) -> Option<&CodecStats>;

    /// Stats of the most recent `decode`, if any.
    fn last_decode(&self) -> Option<&CodecStats>;

    /// `1 - encoded_size / source_size`, from the files on disk.
    ///
    /// # Errors
    /// `Error::NotEncoded` if the artifact does not exist yet.
    fn compression_ratio(&self) -> Result<f64> {
        let paths = self.paths();
        let compressed = artifact_len(&paths.encoded)?;
        let original = fs::metadata(&paths.source)?.len();
        Ok(stats::compression_ratio(original, compressed))
    }
}

fn artifact_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotEncoded {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Run `encode` against a freshly created artifact, removing the artifact
/// again if encoding fails so no partial file is mistaken for output.
fn write_artifact<T>(path: &Path, encode: impl FnOnce(BufWriter<File>) -> Result<T>) -> Result<T> {
    let output = BufWriter::new(File::create(path)?);
    match encode(output) {
        Ok(value) => Ok(value),
        Err(e) => {
            debug!(artifact = %path.display(), error = %e, "encode failed, removing artifact");
            if let Err(remove) = fs::remove_file(path) {
                warn!(artifact = %path.display(), error = %remove, "failed to remove partial artifact");
            }
            Err(e)
        }
    }
}

fn open_artifact(path: &Path) -> Result<File> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotEncoded {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Static Huffman coding of one file.
#[derive(Debug, Clone)]
pub struct HuffmanCodec {
    paths: ArtifactPaths,
    last_encode: Option<CodecStats>,
    last_decode: Option<CodecStats>,
}

impl HuffmanCodec {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            paths: ArtifactPaths::for_source(source),
            last_encode: None,
            last_decode: None,
        }
    }
}

impl FileCodec for HuffmanCodec {
    fn name(&self) -> String {
        "huffman".to_string()
    }

    fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn encode(&mut self) -> Result<PathBuf> {
        debug!(source = %self.paths.source.display(), "huffman encode");
        let input = BufReader::new(File::open(&self.paths.source)?);
        let stats = write_artifact(&self.paths.encoded, |output| huffman::encode(input, output))?;
        info!(
            artifact = %self.paths.encoded.display(),
            original = stats.original_bytes,
            compressed = stats.compressed_bytes,
            "huffman encoded"
        );
        self.last_encode = Some(stats);
        Ok(self.paths.encoded.clone())
    }

    fn decode(&mut self) -> Result<PathBuf> {
        debug!(artifact = %self.paths.encoded.display(), "huffman decode");
        let input = BufReader::new(open_artifact(&self.paths.encoded)?);
        let output = BufWriter::new(File::create(&self.paths.decoded)?);
        let stats = huffman::decode(input, output)?;
        info!(
            output = %self.paths.decoded.display(),
            symbols = stats.original_bytes,
            "huffman decoded"
        );
        self.last_decode = Some(stats);
        Ok(self.paths.decoded.clone())
    }

    fn last_encode(&self) -> Option<&CodecStats> {
        self.last_encode.as_ref()
    }

    fn last_decode(&self) -> Option<&CodecStats> {
        self.last_decode.as_ref()
    }
}

/// LZW coding of one file with a fixed code width.
#[derive(Debug, Clone)]
pub struct LzwCodec {
    paths: ArtifactPaths,
    width: CodeWidth,
    last_encode: Option<CodecStats>,
    last_decode: Option<CodecStats>,
}

impl LzwCodec {
    /// # Errors
    /// `LzwError::InvalidCodeWidth` unless `8 <= bits <= 32`.
    pub fn new(source: impl Into<PathBuf>, bits: u32) -> Result<Self> {
        Ok(Self {
            paths: ArtifactPaths::for_source(source),
            width: CodeWidth::new(bits)?,
            last_encode: None,
            last_decode: None,
        })
    }

    pub fn width(&self) -> CodeWidth {
        self.width
    }
}

impl FileCodec for LzwCodec {
    fn name(&self) -> String {
        format!("lzw-{}", self.width.bits())
    }

    fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn encode(&mut self) -> Result<PathBuf> {
        debug!(source = %self.paths.source.display(), bits = self.width.bits(), "lzw encode");
        let input = BufReader::new(File::open(&self.paths.source)?);
        let width = self.width;
        let stats = write_artifact(&self.paths.encoded, |output| lzw::encode(input, output, width))?;
        info!(
            artifact = %self.paths.encoded.display(),
            original = stats.original_bytes,
            compressed = stats.compressed_bytes,
            codes = stats.codes,
            "lzw encoded"
        );
        self.last_encode = Some(stats);
        Ok(self.paths.encoded.clone())
    }

    fn decode(&mut self) -> Result<PathBuf> {
        debug!(artifact = %self.paths.encoded.display(), bits = self.width.bits(), "lzw decode");
        let input = BufReader::new(open_artifact(&self.paths.encoded)?);
        let output = BufWriter::new(File::create(&self.paths.decoded)?);
        let stats = lzw::decode(input, output, self.width)?;
        info!(
            output = %self.paths.decoded.display(),
            symbols = stats.original_bytes,
            "lzw decoded"
        );
        self.last_decode = Some(stats);
        Ok(self.paths.decoded.clone())
    }

    fn last_encode(&self) -> Option<&CodecStats> {
        self.last_encode.as_ref()
    }

    fn last_decode(&self) -> Option<&CodecStats> {
        self.last_decode.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LzwError;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_paths() {
        let paths = ArtifactPaths::for_source("/data/in/report.pdf");
        assert_eq!(paths.encoded, PathBuf::from("/data/in/encoded_report.pdf"));
        assert_eq!(paths.decoded, PathBuf::from("/data/in/decoded_report.pdf"));
    }

    #[test]
    fn test_artifact_paths_without_parent() {
        let paths = ArtifactPaths::for_source("notes.txt");
        assert_eq!(paths.encoded, PathBuf::from("./encoded_notes.txt"));
        assert_eq!(paths.decoded, PathBuf::from("./decoded_notes.txt"));
    }

    #[test]
    fn test_huffman_file_round_trip() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("text.txt");
        let data = b"it was the best of times, it was the worst of times".repeat(50);
        fs::write(&source, &data).unwrap();

        let mut codec = HuffmanCodec::new(&source);
        let encoded = codec.encode().unwrap();
        assert_eq!(encoded, dir.path().join("encoded_text.txt"));
        let decoded = codec.decode().unwrap();

        assert_eq!(fs::read(decoded).unwrap(), data);

        // The 992-byte header eats most of the saving on a small file
        let stats = codec.last_encode().unwrap();
        assert_eq!(stats.original_bytes, data.len() as u64);
        let encoded_len = huffman::HEADER_BYTES + stats.payload_bits.div_ceil(8);
        let expected = 1.0 - encoded_len as f64 / data.len() as f64;
        let ratio = codec.compression_ratio().unwrap();
        assert!(ratio > 0.0);
        assert!((ratio - expected).abs() < 1e-12);
    }

    #[test]
    fn test_lzw_file_round_trip() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("text.txt");
        let data = b"to be or not to be, that is the question. ".repeat(200);
        fs::write(&source, &data).unwrap();

        let mut codec = LzwCodec::new(&source, 12).unwrap();
        assert_eq!(codec.name(), "lzw-12");
        codec.encode().unwrap();
        let decoded = codec.decode().unwrap();

        assert_eq!(fs::read(decoded).unwrap(), data);
        let ratio = codec.compression_ratio().unwrap();
        let expected = codec.last_encode().unwrap().compression_ratio();
        assert!((ratio - expected).abs() < 1e-9);
    }

    #[test]
    fn test_decode_before_encode() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("missing-artifact.bin");
        fs::write(&source, b"abc").unwrap();

        let mut codec = HuffmanCodec::new(&source);
        assert!(matches!(codec.decode(), Err(Error::NotEncoded { .. })));
        assert!(matches!(codec.compression_ratio(), Err(Error::NotEncoded { .. })));
    }

    #[test]
    fn test_failed_encode_leaves_no_artifact() {
        // A directory opens fine but fails on the first read
        let dir = tempdir().unwrap();
        let source = dir.path().join("folder");
        fs::create_dir(&source).unwrap();

        let mut codecs: Vec<Box<dyn FileCodec>> = vec![
            Box::new(HuffmanCodec::new(&source)),
            Box::new(LzwCodec::new(&source, 12).unwrap()),
        ];
        for codec in codecs.iter_mut() {
            assert!(codec.encode().is_err(), "{}", codec.name());
            assert!(!codec.paths().encoded.exists(), "{}", codec.name());
            assert!(matches!(codec.decode(), Err(Error::NotEncoded { .. })));
        }
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = tempdir().unwrap();
        let mut codec = LzwCodec::new(dir.path().join("nope.bin"), 10).unwrap();
        assert!(matches!(codec.encode(), Err(Error::Io(_))));
    }

    #[test]
    fn test_invalid_width() {
        assert!(matches!(
            LzwCodec::new("x.bin", 4),
            Err(Error::Lzw(LzwError::InvalidCodeWidth { bits: 4, .. }))
        ));
    }

    #[test]
    fn test_empty_file_ratio() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty.bin");
        fs::write(&source, b"").unwrap();

        let mut codec = LzwCodec::new(&source, 9).unwrap();
        codec.encode().unwrap();
        codec.decode().unwrap();
        assert_eq!(codec.compression_ratio().unwrap(), 0.0);
        assert!(fs::read(&codec.paths().decoded).unwrap().is_empty());
    }
}
