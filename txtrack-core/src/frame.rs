//! Reading-frame resolution and CDS/UTR classification.
//!
//! Both strands go through one walk over the exons in transcription order:
//! for every exon we count the coding bases transcribed before it, and the
//! frame offset is whatever is still missing to complete the codon begun
//! upstream. On `+` that walk is left to right from the start codon; on `-`
//! it is right to left from the top of the start codon.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::FrameResolutionGap;
use crate::transcript::Transcript;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Cds,
    Utr,
    /// Exon of a transcript that is not protein coding
    Exon,
}

/// A maximal exonic sub-range with a single classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExonSegment {
    pub exon_index: usize,
    pub start: GenomicPos,
    pub end: GenomicPos,
    pub kind: SegmentKind,
}

/// Coding part of one exon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingPart {
    pub exon_index: usize,
    pub interval: GenomicInterval,
    /// Coding bases transcribed before this part
    pub upstream: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub transcript_id: String,
    pub strand: Strand,
    /// Chromosome-local CDS, stop codon included
    pub cds: GenomicInterval,
    /// Parallel to the transcript's exons, each in 0..=2
    pub offsets: Vec<u8>,
    /// Coding parts in transcription order
    parts: Vec<CodingPart>,
    cds_len: u64,
}

impl FrameInfo {
    pub fn cds_len(&self) -> u64 {
        self.cds_len
    }

    pub fn coding_parts(&self) -> &[CodingPart] {
        &self.parts
    }

    fn part_containing(&self, pos: GenomicPos) -> Option<&CodingPart> {
        self.parts.iter().find(|p| p.interval.contains(pos))
    }

    /// Index of a coding base within its codon, `None` outside the CDS.
    pub fn phase_at(&self, pos: GenomicPos) -> Option<u8> {
        let part = self.part_containing(pos)?;
        let within = self.strand.distance(self.strand.leading_base(&part.interval), pos);
        Some(((part.upstream + within) % 3) as u8)
    }

    /// First coding base at `pos` or downstream of it in transcription order.
    pub fn first_coding_from(&self, pos: GenomicPos) -> Option<GenomicPos> {
        self.parts.iter().find_map(|part| {
            let iv = part.interval;
            match self.strand {
                Strand::Forward => (iv.end > pos).then(|| iv.start.max(pos)),
                Strand::Reverse => (iv.start <= pos).then(|| (iv.end - 1).min(pos)),
            }
        })
    }

    /// The `n` coding positions closest below `pos`, ascending. These are
    /// the bases a codon ending at or after `pos` may have spliced in from
    /// upstream exons.
    pub fn coding_before(&self, pos: GenomicPos, n: usize) -> Vec<GenomicPos> {
        let mut ascending: Vec<&CodingPart> = self.parts.iter().collect();
        ascending.sort_by_key(|p| p.interval.start);

        let mut found = Vec::with_capacity(n);
        for part in ascending.into_iter().rev() {
            let iv = part.interval;
            if iv.start >= pos {
                continue;
            }
            found.extend((iv.start..iv.end.min(pos)).rev().take(n - found.len()));
            if found.len() == n {
                break;
            }
        }
        found.reverse();
        found
    }

    /// Bases to skip, starting at the first coding base reached from
    /// `leading`, before a whole codon begins. `leading` is the first base of
    /// the tile in transcription order; when it falls in an intron or UTR the
    /// next downstream coding exon decides.
    pub fn tile_frame_offset(&self, leading: GenomicPos) -> Option<u8> {
        let first = self.first_coding_from(leading)?;
        let phase = self.phase_at(first)?;
        Some((3 - phase) % 3)
    }
}

/// Derives [`FrameInfo`] and exon segments from a transcript.
pub struct FrameResolver;

impl FrameResolver {
    /// `Ok(None)` for transcripts that are not protein coding.
    pub fn resolve(tx: &Transcript) -> Result<Option<FrameInfo>, FrameResolutionGap> {
        if !tx.is_protein_coding() {
            return Ok(None);
        }

        let cds = tx.cds_interval()?;
        let first = cds.start;
        let last = cds.end - 1;
        if !tx.exons().any(|e| e.contains(first)) || !tx.exons().any(|e| e.contains(last)) {
            return Err(FrameResolutionGap::new(
                &tx.id,
                format!("CDS [{}, {}) does not start and end inside exons", cds.start, cds.end),
            ));
        }

        let mut offsets = vec![0u8; tx.exon_count()];
        let mut parts = Vec::new();
        let mut upstream = 0u64;

        for i in tx.strand.transcription_order(tx.exon_count()) {
            offsets[i] = ((3 - upstream % 3) % 3) as u8;
            if let Some(interval) = tx.exon(i).intersect(&cds) {
                parts.push(CodingPart {
                    exon_index: i,
                    interval,
                    upstream,
                });
                upstream += interval.len();
            }
        }

        trace!("{}: cds_len={} offsets={:?}", tx.id, upstream, offsets);

        Ok(Some(FrameInfo {
            transcript_id: tx.id.clone(),
            strand: tx.strand,
            cds,
            offsets,
            parts,
            cds_len: upstream,
        }))
    }

    /// Split every exon at the CDS bounds, ascending by position.
    pub fn segments(tx: &Transcript) -> Result<Vec<ExonSegment>, FrameResolutionGap> {
        let cds = match Self::resolve(tx)? {
            Some(frame) => frame.cds,
            None => {
                return Ok(tx
                    .exons()
                    .enumerate()
                    .map(|(exon_index, e)| ExonSegment {
                        exon_index,
                        start: e.start,
                        end: e.end,
                        kind: SegmentKind::Exon,
                    })
                    .collect())
            }
        };

        let mut segments = Vec::new();
        for (exon_index, exon) in tx.exons().enumerate() {
            let mut cuts = vec![exon.start, exon.end];
            for bound in [cds.start, cds.end] {
                if exon.start < bound && bound < exon.end {
                    cuts.push(bound);
                }
            }
            cuts.sort_unstable();

            for w in cuts.windows(2) {
                let kind = if cds.start <= w[0] && w[1] <= cds.end {
                    SegmentKind::Cds
                } else {
                    SegmentKind::Utr
                };
                segments.push(ExonSegment {
                    exon_index,
                    start: w[0],
                    end: w[1],
                    kind,
                });
            }
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::tests::record;

    fn forward_tx() -> Transcript {
        record("chr1", 101, 250, "FWD", '+', &[101, 201], &[150, 250], Some((121, 228)))
            .parse()
            .unwrap()
    }

    fn reverse_tx() -> Transcript {
        record("chr1", 101, 250, "REV", '-', &[101, 201], &[150, 250], Some((226, 121)))
            .parse()
            .unwrap()
    }

    fn seg(exon_index: usize, start: u64, end: u64, kind: SegmentKind) -> ExonSegment {
        ExonSegment {
            exon_index,
            start,
            end,
            kind,
        }
    }

    #[test]
    fn test_forward_segments() {
        let segments = FrameResolver::segments(&forward_tx()).unwrap();
        assert_eq!(
            segments,
            vec![
                seg(0, 100, 120, SegmentKind::Utr),
                seg(0, 120, 150, SegmentKind::Cds),
                seg(1, 200, 230, SegmentKind::Cds),
                seg(1, 230, 250, SegmentKind::Utr),
            ]
        );
    }

    #[test]
    fn test_forward_offsets() {
        let frame = FrameResolver::resolve(&forward_tx()).unwrap().unwrap();
        // 30 coding bases in exon 0, so exon 1 starts on a codon boundary
        assert_eq!(frame.offsets, vec![0, 0]);
        assert_eq!(frame.cds_len(), 60);

        let tx: Transcript = record("chr1", 101, 250, "F2", '+', &[101, 201], &[150, 250], Some((111, 228)))
            .parse()
            .unwrap();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        // 40 coding bases: one base carried, two still needed
        assert_eq!(frame.offsets, vec![0, 2]);
        assert_eq!(frame.phase_at(149), Some(0));
        assert_eq!(frame.phase_at(200), Some(1));
        assert_eq!(frame.phase_at(202), Some(0));
        assert_eq!(frame.phase_at(160), None);
    }

    #[test]
    fn test_reverse_offsets() {
        let tx = reverse_tx();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        assert_eq!(frame.cds, GenomicInterval::new(120, 228));
        // 28 coding bases in exon 1 (transcribed first)
        assert_eq!(frame.offsets, vec![2, 0]);
        assert_eq!(frame.phase_at(227), Some(0));
        assert_eq!(frame.phase_at(225), Some(2));
        assert_eq!(frame.phase_at(149), Some(1));
        assert_eq!(frame.phase_at(147), Some(0));

        let segments = FrameResolver::segments(&tx).unwrap();
        assert_eq!(
            segments,
            vec![
                seg(0, 100, 120, SegmentKind::Utr),
                seg(0, 120, 150, SegmentKind::Cds),
                seg(1, 200, 228, SegmentKind::Cds),
                seg(1, 228, 250, SegmentKind::Utr),
            ]
        );
    }

    #[test]
    fn test_tile_frame_offset() {
        let tx: Transcript = record("chr1", 101, 250, "F2", '+', &[101, 201], &[150, 250], Some((111, 228)))
            .parse()
            .unwrap();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        assert_eq!(frame.tile_frame_offset(110), Some(0));
        assert_eq!(frame.tile_frame_offset(111), Some(2));
        // tile starting in the intron uses the next exon
        assert_eq!(frame.tile_frame_offset(170), Some(2));
        assert_eq!(frame.tile_frame_offset(240), None);

        let frame = FrameResolver::resolve(&reverse_tx()).unwrap().unwrap();
        assert_eq!(frame.tile_frame_offset(249), Some(0));
        assert_eq!(frame.tile_frame_offset(175), Some(2));
        assert_eq!(frame.first_coding_from(175), Some(149));
    }

    #[test]
    fn test_coding_before_crosses_introns() {
        let tx: Transcript = record("chr1", 101, 250, "F2", '+', &[101, 201], &[150, 250], Some((111, 228)))
            .parse()
            .unwrap();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        assert_eq!(frame.coding_before(202, 2), vec![200, 201]);
        assert_eq!(frame.coding_before(201, 2), vec![149, 200]);
        assert_eq!(frame.coding_before(180, 2), vec![148, 149]);
        assert_eq!(frame.coding_before(111, 2), vec![110]);
        assert!(frame.coding_before(110, 2).is_empty());

        let frame = FrameResolver::resolve(&reverse_tx()).unwrap().unwrap();
        assert_eq!(frame.coding_before(200, 2), vec![148, 149]);
    }

    #[test]
    fn test_non_coding_has_no_frame() {
        let tx: Transcript = record("chr1", 101, 250, "NC", '+', &[101, 201], &[150, 250], None)
            .parse()
            .unwrap();
        assert!(FrameResolver::resolve(&tx).unwrap().is_none());
        let segments = FrameResolver::segments(&tx).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.kind == SegmentKind::Exon));
    }

    #[test]
    fn test_cds_outside_exons_is_a_gap() {
        let tx: Transcript = record("chr1", 101, 250, "GAP", '+', &[101, 201], &[150, 250], Some((161, 228)))
            .parse()
            .unwrap();
        let gap = FrameResolver::resolve(&tx).unwrap_err();
        assert!(gap.reason.contains("inside exons"));

        let mut tx = forward_tx();
        tx.stop_codon_pos = None;
        assert!(FrameResolver::resolve(&tx).is_err());
    }
}
