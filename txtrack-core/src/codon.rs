//! Triplet walking and amino-acid translation of stitched sequences.

use log::{debug, trace};
use serde::Serialize;

use crate::error::{TrackError, TrackResult};
use crate::frame::FrameResolver;
use crate::genetic_code::{complement, AminoAcid, GeneticCode};
use crate::stitch::{SequenceStitcher, StitchedBase, StitchedSequence, TileSequence};
use crate::transcript::Transcript;
use crate::types::*;

/// A translated codon on the absolute axis.
///
/// `positions` are its three bases, ascending; they are adjacent unless the
/// codon is spliced across an intron. `pos_start` and `pos_end` are the first
/// and last of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Codon {
    pub pos_start: GenomicPos,
    pub pos_end: GenomicPos,
    pub positions: [GenomicPos; 3],
    pub amino_acid: AminoAcid,
    pub label: &'static str,
    pub letter: char,
    pub transcript_id: String,
}

impl Codon {
    fn new(mut positions: [GenomicPos; 3], amino_acid: AminoAcid, transcript_id: &str) -> Self {
        positions.sort_unstable();
        Self {
            pos_start: positions[0],
            pos_end: positions[2],
            positions,
            amino_acid,
            label: amino_acid.three_letter(),
            letter: amino_acid.one_letter(),
            transcript_id: transcript_id.to_string(),
        }
    }

    pub fn is_spliced(&self) -> bool {
        self.pos_end - self.pos_start != 2
    }
}

pub struct CodonTranslator {
    code: GeneticCode,
}

impl CodonTranslator {
    pub fn new(code: GeneticCode) -> Self {
        Self { code }
    }

    pub fn genetic_code(&self) -> &GeneticCode {
        &self.code
    }

    /// Translate a plain coding string from `offset`, dropping a short tail.
    pub fn translate_frame(&self, sequence: &str, offset: usize) -> Vec<Option<AminoAcid>> {
        sequence
            .as_bytes()
            .get(offset..)
            .unwrap_or_default()
            .chunks_exact(3)
            .map(|c| self.code.translate([c[0], c[1], c[2]]))
            .collect()
    }

    /// Codons of a stitched sequence whose highest base lies in `owned`,
    /// ascending by genomic position.
    pub fn translate(&self, stitched: &StitchedSequence, owned: &GenomicInterval) -> Vec<Codon> {
        let start = (stitched.frame_offset as usize).min(stitched.bases.len());
        let mut codons: Vec<Codon> = stitched.bases[start..]
            .chunks_exact(3)
            .filter_map(|triplet| self.translate_triplet(stitched, triplet, owned))
            .collect();

        if stitched.strand == Strand::Reverse {
            codons.reverse();
        }
        codons
    }

    fn translate_triplet(
        &self,
        stitched: &StitchedSequence,
        triplet: &[StitchedBase],
        owned: &GenomicInterval,
    ) -> Option<Codon> {
        let high = triplet.iter().map(|b| b.pos).max()?;
        if !owned.contains(high) {
            return None;
        }

        let mut bases = [0u8; 3];
        let mut positions = [0; 3];
        for ((slot, pos), b) in bases.iter_mut().zip(positions.iter_mut()).zip(triplet) {
            let base = b.base?;
            *slot = match stitched.strand {
                Strand::Forward => base,
                Strand::Reverse => complement(base),
            };
            *pos = b.pos;
        }

        let aa = self.code.translate(bases);
        if aa.is_none() {
            trace!("{}: untranslatable codon at {:?}", stitched.transcript_id, positions);
        }
        aa.map(|aa| Codon::new(positions, aa, &stitched.transcript_id))
    }

    /// Frame resolution, stitching and translation of one transcript in one tile.
    pub fn tile_codons(
        &self,
        tx: &Transcript,
        genome: &GenomeInfo,
        tile: &TileSequence,
    ) -> TrackResult<Vec<Codon>> {
        let Some(frame) = FrameResolver::resolve(tx)? else {
            return Ok(Vec::new());
        };
        let chrom_offset = genome
            .chrom_offset(&tx.chrom)
            .ok_or_else(|| TrackError::UnknownChrom(tx.chrom.clone()))?;

        let codons = match SequenceStitcher::stitch(tx, &frame, chrom_offset, tile) {
            Some(stitched) => self.translate(&stitched, &tile.window),
            None => Vec::new(),
        };
        debug!(
            "Tile {}.{}: {} codons for {}",
            tile.zoom,
            tile.tile_index,
            codons.len(),
            tx.id
        );
        Ok(codons)
    }
}

impl Default for CodonTranslator {
    fn default() -> Self {
        Self::new(GeneticCode::standard())
    }
}
