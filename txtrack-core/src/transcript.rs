//! Transcript records and the fixed-column record formatter.
//!
//! Source records are BED12+-like, tab separated, with at least 16 columns:
//!
//! | Column | Content |
//! |--------|---------|
//! | 0 | chromosome |
//! | 1, 2 | transcript start (1-based) / end (inclusive, i.e. exclusive 0-based) |
//! | 3 | transcript name |
//! | 4 | score, used as label importance |
//! | 5 | strand |
//! | 7 | stable transcript database id |
//! | 8 | coding type (`protein_coding`, ...) |
//! | 12, 13 | comma-joined exon starts (1-based) / ends |
//! | 14, 15 | 1-based start / stop codon positions, `.` when absent |
//!
//! After formatting every coordinate is 0-based half-open.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{FormatError, FrameResolutionGap};
use crate::types::*;

pub const MIN_FIELDS: usize = 16;
pub const PROTEIN_CODING: &str = "protein_coding";

const CHROM: usize = 0;
const START: usize = 1;
const END: usize = 2;
const NAME: usize = 3;
const SCORE: usize = 4;
const STRAND: usize = 5;
const DB_ID: usize = 7;
const CODING_TYPE: usize = 8;
const EXON_STARTS: usize = 12;
const EXON_ENDS: usize = 13;
const START_CODON: usize = 14;
const STOP_CODON: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub name: String,
    pub chrom: String,
    pub tx_start: GenomicPos,
    pub tx_end: GenomicPos,
    pub strand: Strand,
    pub exon_starts: Vec<GenomicPos>,
    pub exon_ends: Vec<GenomicPos>,
    pub coding_type: String,
    pub start_codon_pos: Option<GenomicPos>,
    pub stop_codon_pos: Option<GenomicPos>,
    pub importance: f64,
    /// Assigned by the row packer; `None` until then.
    pub display_row: Option<usize>,
}

impl Transcript {
    pub fn span(&self) -> GenomicInterval {
        GenomicInterval::new(self.tx_start, self.tx_end)
    }

    pub fn exon_count(&self) -> usize {
        self.exon_starts.len()
    }

    pub fn exon(&self, i: usize) -> GenomicInterval {
        GenomicInterval::new(self.exon_starts[i], self.exon_ends[i])
    }

    pub fn exons(&self) -> impl Iterator<Item = GenomicInterval> + '_ {
        self.exon_starts
            .iter()
            .zip(&self.exon_ends)
            .map(|(&s, &e)| GenomicInterval::new(s, e))
    }

    pub fn is_protein_coding(&self) -> bool {
        self.coding_type == PROTEIN_CODING
    }

    /// Chromosome-local CDS interval, stop codon included.
    ///
    /// On `+` the stop position already points past the stop codon; on `-`
    /// both codon positions are the lowest base of their codon, so the start
    /// codon contributes three bases above `start_codon_pos`.
    pub fn cds_interval(&self) -> Result<GenomicInterval, FrameResolutionGap> {
        let (start, stop) = match (self.start_codon_pos, self.stop_codon_pos) {
            (Some(start), Some(stop)) => (start, stop),
            _ => {
                return Err(FrameResolutionGap::new(
                    &self.id,
                    "coding transcript without start/stop codon positions",
                ))
            }
        };

        let cds = match self.strand {
            Strand::Forward => GenomicInterval::new(start, stop),
            Strand::Reverse => GenomicInterval::new(stop, start + 3),
        };

        if cds.is_empty() {
            return Err(FrameResolutionGap::new(
                &self.id,
                format!("stop codon {} is not downstream of start codon {}", stop, start),
            ));
        }
        Ok(cds)
    }

    /// Whether any exon intersects a chromosome-local window.
    pub fn exons_intersect(&self, window: &GenomicInterval) -> bool {
        self.exons().any(|exon| exon.overlaps(window))
    }
}

impl FromStr for Transcript {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        TranscriptFormatter::format_line(line)
    }
}

/// Turns raw fixed-column records into [`Transcript`]s.
pub struct TranscriptFormatter;

impl TranscriptFormatter {
    /// Stable composite key `dbId_chrom_start_end`, taken from the raw fields.
    pub fn transcript_id(fields: &[&str]) -> Result<String, FormatError> {
        if fields.len() <= DB_ID {
            return Err(FormatError::TooFewFields {
                found: fields.len(),
                expected: MIN_FIELDS,
            });
        }
        Ok(format!(
            "{}_{}_{}_{}",
            fields[DB_ID].trim(),
            fields[CHROM].trim(),
            fields[START].trim(),
            fields[END].trim()
        ))
    }

    pub fn format_line(line: &str) -> Result<Transcript, FormatError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split('\t').collect();
        Self::format_fields(&fields)
    }

    pub fn format_fields(fields: &[&str]) -> Result<Transcript, FormatError> {
        if fields.len() < MIN_FIELDS {
            return Err(FormatError::TooFewFields {
                found: fields.len(),
                expected: MIN_FIELDS,
            });
        }

        let chrom = fields[CHROM].trim();
        if chrom.is_empty() {
            return Err(FormatError::EmptyField("chrom"));
        }

        let strand: Strand = fields[STRAND].parse()?;

        let tx_start = one_based_to_zero(parse_pos("txStart", fields[START])?, "txStart")?;
        let tx_end = parse_pos("txEnd", fields[END])?;
        if tx_start >= tx_end {
            return Err(FormatError::InvalidSpan {
                start: tx_start,
                end: tx_end,
            });
        }

        let exon_starts = parse_pos_list("exonStarts", fields[EXON_STARTS])?
            .into_iter()
            .map(|s| one_based_to_zero(s, "exonStarts"))
            .collect::<Result<Vec<_>, _>>()?;
        let exon_ends = parse_pos_list("exonEnds", fields[EXON_ENDS])?;
        validate_exons(&exon_starts, &exon_ends)?;

        let start_codon_pos = parse_optional_pos("startCodon", fields[START_CODON])?
            .map(|pos| one_based_to_zero(pos, "startCodon"))
            .transpose()?;
        let stop_codon_pos = parse_optional_pos("stopCodon", fields[STOP_CODON])?
            .map(|pos| match strand {
                Strand::Forward => Ok(pos + 2),
                Strand::Reverse => one_based_to_zero(pos, "stopCodon"),
            })
            .transpose()?;

        let importance = match fields[SCORE].trim() {
            "." | "" => 0.0,
            score => score.parse::<f64>().map_err(|_| FormatError::InvalidNumber {
                field: "score",
                value: score.to_string(),
            })?,
        };
        if !importance.is_finite() {
            return Err(FormatError::InvalidNumber {
                field: "score",
                value: fields[SCORE].to_string(),
            });
        }

        Ok(Transcript {
            id: Self::transcript_id(fields)?,
            name: fields[NAME].trim().to_string(),
            chrom: chrom.to_string(),
            tx_start,
            tx_end,
            strand,
            exon_starts,
            exon_ends,
            coding_type: fields[CODING_TYPE].trim().to_string(),
            start_codon_pos,
            stop_codon_pos,
            importance,
            display_row: None,
        })
    }
}

fn parse_pos(field: &'static str, value: &str) -> Result<GenomicPos, FormatError> {
    let value = value.trim();
    value.parse().map_err(|_| FormatError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_optional_pos(field: &'static str, value: &str) -> Result<Option<GenomicPos>, FormatError> {
    match value.trim() {
        "." | "" => Ok(None),
        v => parse_pos(field, v).map(Some),
    }
}

fn parse_pos_list(field: &'static str, value: &str) -> Result<Vec<GenomicPos>, FormatError> {
    value
        .trim()
        .trim_end_matches(',')
        .split(',')
        .map(|v| parse_pos(field, v))
        .collect()
}

fn one_based_to_zero(pos: GenomicPos, field: &'static str) -> Result<GenomicPos, FormatError> {
    pos.checked_sub(1).ok_or(FormatError::InvalidNumber {
        field,
        value: pos.to_string(),
    })
}

fn validate_exons(starts: &[GenomicPos], ends: &[GenomicPos]) -> Result<(), FormatError> {
    if starts.len() != ends.len() {
        return Err(FormatError::LengthMismatch {
            what: "exon list",
            left: starts.len(),
            right: ends.len(),
        });
    }

    for (index, (&start, &end)) in starts.iter().zip(ends).enumerate() {
        if start >= end {
            return Err(FormatError::InvalidExon { index, start, end });
        }
        if index > 0 && ends[index - 1] > start {
            return Err(FormatError::UnsortedExons {
                index: index - 1,
                next: index,
            });
        }
    }
    Ok(())
}
