//! Error types for transcript layout and translation.
//!
//! Every error here is scoped to a single transcript or tile; callers skip
//! the offending item and keep going.

use thiserror::Error;

use crate::types::{GenomicPos, TileIndex, ZoomLevel};

/// Result type for track operations
pub type TrackResult<T> = Result<T, TrackError>;

/// A transcript record (or companion file) that could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("Record has only {found} fields, expected at least {expected}")]
    TooFewFields { found: usize, expected: usize },

    #[error("Invalid number in field '{field}': '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid strand: '{0}', expected '+' or '-'")]
    InvalidStrand(String),

    #[error("{what} length mismatch: {left} vs {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Invalid exon {index}: start {start} >= end {end}")]
    InvalidExon {
        index: usize,
        start: GenomicPos,
        end: GenomicPos,
    },

    #[error("Exons {index} and {next} overlap or are out of order")]
    UnsortedExons { index: usize, next: usize },

    #[error("Invalid transcript coordinates: start {start} >= end {end}")]
    InvalidSpan { start: GenomicPos, end: GenomicPos },

    #[error("Duplicate chromosome: {0}")]
    DuplicateChrom(String),

    #[error("Empty field: {0}")]
    EmptyField(&'static str),
}

/// The sequence provider failed for a tile.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Sequence fetch failed for tile {zoom}.{tile_index}: {message}")]
pub struct SequenceFetchError {
    pub zoom: ZoomLevel,
    pub tile_index: TileIndex,
    pub message: String,
}

impl SequenceFetchError {
    pub fn new<S: Into<String>>(zoom: ZoomLevel, tile_index: TileIndex, message: S) -> Self {
        Self {
            zoom,
            tile_index,
            message: message.into(),
        }
    }
}

/// Exon/codon data that does not allow a reading frame to be derived.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot resolve reading frame for {transcript_id}: {reason}")]
pub struct FrameResolutionGap {
    pub transcript_id: String,
    pub reason: String,
}

impl FrameResolutionGap {
    pub fn new<S: Into<String>, R: Into<String>>(transcript_id: S, reason: R) -> Self {
        Self {
            transcript_id: transcript_id.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error(transparent)]
    SequenceFetch(#[from] SequenceFetchError),

    #[error(transparent)]
    FrameResolution(#[from] FrameResolutionGap),

    #[error("Unknown chromosome: {0}")]
    UnknownChrom(String),

    #[error("Unsupported genetic code: {0}")]
    UnknownGeneticCode(u8),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
