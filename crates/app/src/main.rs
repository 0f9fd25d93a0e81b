//! squeeze: compress a file with Huffman and LZW, decode it back, and
//! report how each codec did.

mod config;
mod input_gen;
mod report;

use config::Config;
use report::{Fingerprint, RunReport, Verification};
use squeeze_core::{FileCodec, HuffmanCodec, LzwCodec};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => {
            config::print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("configuration error: {e}");
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: failed to set tracing subscriber: {e}");
    }

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run every configured codec; returns whether all runs passed.
fn run(config: &Config) -> squeeze_core::Result<bool> {
    let source = resolve_source(config)?;
    let fingerprint = if config.verify {
        Some(Fingerprint::of_file(&source)?)
    } else {
        None
    };

    let mut codecs: Vec<Box<dyn FileCodec>> = Vec::new();
    if config.codec.huffman() {
        codecs.push(Box::new(HuffmanCodec::new(&source)));
    }
    if config.codec.lzw() {
        for bits in config.lzw_bits.clone() {
            codecs.push(Box::new(LzwCodec::new(&source, bits)?));
        }
    }

    let reports: Vec<RunReport> = codecs
        .iter_mut()
        .map(|codec| run_codec(codec.as_mut(), fingerprint.as_ref()))
        .collect();

    report::print_summary(&source, &reports);
    if config.print_stats {
        print!("{}", report::stats_text(&reports));
    }
    report::print_result(&reports);

    Ok(reports.iter().all(|r| !r.is_failure()))
}

fn resolve_source(config: &Config) -> squeeze_core::Result<PathBuf> {
    match &config.input_file {
        Some(path) => Ok(path.clone()),
        None => {
            let path = input_gen::write_sample_file(&config.sample_dir, config.seed, config.sample_bytes)?;
            info!(
                path = %path.display(),
                seed = config.seed,
                bytes = config.sample_bytes,
                "generated sample"
            );
            Ok(path)
        }
    }
}

fn run_codec(codec: &mut dyn FileCodec, source: Option<&Fingerprint>) -> RunReport {
    match encode_decode_verify(codec, source) {
        Ok(report) => report,
        Err(e) => {
            error!(codec = %codec.name(), error = %e, "codec run failed");
            RunReport::failed(codec, &e)
        }
    }
}

fn encode_decode_verify(
    codec: &mut dyn FileCodec,
    source: Option<&Fingerprint>,
) -> squeeze_core::Result<RunReport> {
    codec.encode()?;
    let decoded = codec.decode()?;

    let verification = match source {
        Some(expected) => verify(expected, &decoded)?,
        None => Verification::Skipped,
    };
    if verification.is_failure() {
        error!(codec = %codec.name(), ?verification, "round trip mismatch");
    }
    RunReport::completed(codec, verification)
}

fn verify(expected: &Fingerprint, decoded: &Path) -> squeeze_core::Result<Verification> {
    let actual = Fingerprint::of_file(decoded)?;
    Ok(Verification::check(expected, &actual))
}
