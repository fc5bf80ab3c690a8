//! File readers for transcript records, chromosome sizes and reference
//! sequence.

pub mod bed;
pub mod chromsizes;
#[cfg(feature = "io-fasta")] pub mod fasta;

pub use bed::{read_transcripts, TranscriptLoad};
pub use chromsizes::read_chromsizes;
#[cfg(feature = "io-fasta")] pub use fasta::{FastaError, FastaSequenceProvider};

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Line reader over a plain or gzip-compressed (`.gz`) file.
pub(crate) fn open_lines<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(&path)?;
    if path.as_ref().to_string_lossy().ends_with(".gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Blank lines and `#`, `track` or `browser` headers carry no records.
pub(crate) fn is_header_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("track")
        || trimmed.starts_with("browser")
}
