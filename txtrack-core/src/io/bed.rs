//! Transcript record files.

use log::{debug, warn};
use std::io::BufRead;
use std::path::Path;

use super::{is_header_line, open_lines};
use crate::error::{FormatError, TrackResult};
use crate::transcript::{Transcript, TranscriptFormatter};

/// Records read from one file; malformed lines are skipped, not fatal.
#[derive(Debug, Default)]
pub struct TranscriptLoad {
    pub transcripts: Vec<Transcript>,
    /// 1-based line number and the reason each skipped line was rejected
    pub skipped: Vec<(usize, FormatError)>,
}

pub fn read_transcripts<P: AsRef<Path>>(path: P) -> TrackResult<TranscriptLoad> {
    let reader = open_lines(&path)?;
    let load = parse_transcripts(reader)?;
    debug!(
        "Read {} transcripts from {} ({} skipped)",
        load.transcripts.len(),
        path.as_ref().display(),
        load.skipped.len()
    );
    Ok(load)
}

pub fn parse_transcripts<R: BufRead>(reader: R) -> TrackResult<TranscriptLoad> {
    let mut load = TranscriptLoad::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if is_header_line(&line) {
            continue;
        }
        match TranscriptFormatter::format_line(&line) {
            Ok(tx) => load.transcripts.push(tx),
            Err(e) => {
                warn!("Skipping line {}: {}", idx + 1, e);
                load.skipped.push((idx + 1, e));
            }
        }
    }

    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::tests::record;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample() -> String {
        [
            "# comment".to_string(),
            record("chr1", 101, 250, "A", '+', &[101], &[250], None),
            "chr1\tnot-a-record".to_string(),
            String::new(),
            record("chr1", 301, 450, "B", '-', &[301], &[450], Some((448, 301))),
        ]
        .join("\n")
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let load = parse_transcripts(sample().as_bytes()).unwrap();
        assert_eq!(load.transcripts.len(), 2);
        assert_eq!(load.skipped.len(), 1);
        assert_eq!(load.skipped[0].0, 3);
        assert!(matches!(load.skipped[0].1, FormatError::TooFewFields { .. }));
    }

    #[test]
    fn test_read_plain_and_gzip() {
        let mut plain = NamedTempFile::new().unwrap();
        writeln!(plain, "{}", sample()).unwrap();
        assert_eq!(read_transcripts(plain.path()).unwrap().transcripts.len(), 2);

        let gz = tempfile::Builder::new().suffix(".bed.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(gz.reopen().unwrap(), Compression::default());
        encoder.write_all(sample().as_bytes()).unwrap();
        encoder.finish().unwrap();

        let load = read_transcripts(gz.path()).unwrap();
        assert_eq!(load.transcripts[1].name, "B");
    }
}
