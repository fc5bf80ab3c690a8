//! Two-column chromosome sizes files (`name<TAB>length`).

use std::io::BufRead;
use std::path::Path;

use super::{is_header_line, open_lines};
use crate::error::{FormatError, TrackResult};
use crate::types::{GenomeInfo, GenomicPos};

pub fn read_chromsizes<P: AsRef<Path>>(path: P) -> TrackResult<GenomeInfo> {
    parse_chromsizes(open_lines(path)?)
}

/// Chromosomes keep file order on the absolute axis.
pub fn parse_chromsizes<R: BufRead>(reader: R) -> TrackResult<GenomeInfo> {
    let mut names = Vec::new();
    let mut sizes: Vec<GenomicPos> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if is_header_line(&line) {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(size)) = (fields.next(), fields.next()) else {
            return Err(FormatError::TooFewFields {
                found: 1,
                expected: 2,
            }
            .into());
        };
        let size = size.parse().map_err(|_| FormatError::InvalidNumber {
            field: "length",
            value: size.to_string(),
        })?;
        names.push(name.to_string());
        sizes.push(size);
    }

    Ok(GenomeInfo::from_chromsizes(&names, &sizes)?)
}
