use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FormatError;

pub type GenomicPos = u64;
pub type TileIndex = u64;
pub type ZoomLevel = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicCoord {
    pub chrom_id: u32,
    pub position: GenomicPos,
}

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomicInterval {
    pub start: GenomicPos,
    pub end: GenomicPos,
}

impl GenomicInterval {
    pub fn new(start: GenomicPos, end: GenomicPos) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> GenomicPos {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, pos: GenomicPos) -> bool {
        self.start <= pos && pos < self.end
    }

    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersect(&self, other: &GenomicInterval) -> Option<GenomicInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(GenomicInterval { start, end })
    }

    pub fn shift(&self, offset: GenomicPos) -> GenomicInterval {
        GenomicInterval {
            start: self.start.saturating_add(offset),
            end: self.end.saturating_add(offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromInfo {
    pub id: u32,
    pub name: String,
    pub length: GenomicPos,
    pub offset: GenomicPos, // Absolute coordinate of the first base
}

/// Chromosome sizes laid end to end on one absolute axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenomeInfo {
    pub chroms: Vec<ChromInfo>,
    pub total_length: GenomicPos,
    pub chrom_map: HashMap<String, u32>,
}

impl GenomeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cumulative layout from parallel name/size lists, in order.
    pub fn from_chromsizes<S: AsRef<str>>(
        names: &[S],
        sizes: &[GenomicPos],
    ) -> Result<Self, FormatError> {
        if names.len() != sizes.len() {
            return Err(FormatError::LengthMismatch {
                what: "chromsizes",
                left: names.len(),
                right: sizes.len(),
            });
        }

        let mut genome = Self::new();
        for (name, &size) in names.iter().zip(sizes) {
            let name = name.as_ref();
            if genome.chrom_map.contains_key(name) {
                return Err(FormatError::DuplicateChrom(name.to_string()));
            }
            genome.add_chrom(name.to_string(), size);
        }
        Ok(genome)
    }

    pub fn add_chrom(&mut self, name: String, length: GenomicPos) -> u32 {
        let id = self.chroms.len() as u32;
        let offset = self.total_length;

        self.chroms.push(ChromInfo {
            id,
            name: name.clone(),
            length,
            offset,
        });

        self.chrom_map.insert(name, id);
        self.total_length += length;
        id
    }

    pub fn get_chrom(&self, id: u32) -> Option<&ChromInfo> {
        self.chroms.get(id as usize)
    }

    pub fn get_chrom_by_name(&self, name: &str) -> Option<&ChromInfo> {
        self.chrom_map.get(name).and_then(|&id| self.get_chrom(id))
    }

    pub fn chrom_offset(&self, name: &str) -> Option<GenomicPos> {
        self.get_chrom_by_name(name).map(|c| c.offset)
    }

    /// Cumulative start of every chromosome, in order.
    pub fn cumulative_positions(&self) -> Vec<GenomicPos> {
        self.chroms.iter().map(|c| c.offset).collect()
    }

    pub fn absolute_to_local(&self, absolute: GenomicPos) -> Option<GenomicCoord> {
        if absolute >= self.total_length {
            return None;
        }

        // offsets are strictly increasing for non-empty chromosomes
        let idx = self
            .chroms
            .partition_point(|c| c.offset <= absolute)
            .checked_sub(1)?;
        let chrom = &self.chroms[idx];
        let position = absolute - chrom.offset;

        (position < chrom.length).then_some(GenomicCoord {
            chrom_id: chrom.id,
            position,
        })
    }

    pub fn local_to_absolute(&self, coord: GenomicCoord) -> Option<GenomicPos> {
        self.get_chrom(coord.chrom_id).and_then(|chrom| {
            if coord.position < chrom.length {
                Some(chrom.offset.saturating_add(coord.position))
            } else {
                None
            }
        })
    }
}

/// Strand of a transcript, doubling as its orientation on the genomic axis.
///
/// All strand-dependent walking goes through these helpers so the reverse
/// strand is expressed once: "downstream" means the direction of
/// transcription, which is increasing coordinates on `Forward` and
/// decreasing coordinates on `Reverse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    /// Move `n` bases downstream of `pos`.
    pub fn advance(self, pos: GenomicPos, n: GenomicPos) -> GenomicPos {
        match self {
            Strand::Forward => pos.saturating_add(n),
            Strand::Reverse => pos.saturating_sub(n),
        }
    }

    /// Move `n` bases upstream of `pos`.
    pub fn reverse_advance(self, pos: GenomicPos, n: GenomicPos) -> GenomicPos {
        self.flip().advance(pos, n)
    }

    /// True when `a` is transcribed before `b`.
    pub fn is_upstream_of(self, a: GenomicPos, b: GenomicPos) -> bool {
        match self {
            Strand::Forward => a < b,
            Strand::Reverse => a > b,
        }
    }

    /// Bases from `from` downstream to `to`; zero when `to` is upstream.
    pub fn distance(self, from: GenomicPos, to: GenomicPos) -> GenomicPos {
        match self {
            Strand::Forward => to.saturating_sub(from),
            Strand::Reverse => from.saturating_sub(to),
        }
    }

    /// First transcribed base of a non-empty half-open interval.
    pub fn leading_base(self, interval: &GenomicInterval) -> GenomicPos {
        match self {
            Strand::Forward => interval.start,
            Strand::Reverse => interval.end - 1,
        }
    }

    /// Indices `0..n` of an ascending array, in transcription order.
    pub fn transcription_order(self, n: usize) -> Vec<usize> {
        match self {
            Strand::Forward => (0..n).collect(),
            Strand::Reverse => (0..n).rev().collect(),
        }
    }

    pub fn flip(self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

impl FromStr for Strand {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(FormatError::InvalidStrand(other.to_string())),
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}
