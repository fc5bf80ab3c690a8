//! Tile sequence fetching and per-transcript stitching.
//!
//! A tile's sequence covers its absolute window plus a short front overhang.
//! Codons are owned by the tile holding their highest genomic base, so a
//! tile also needs the up to two coding bases just below its window. When an
//! intron separates those from the window they lie outside the overhang and
//! are fetched from the tiles that hold them. With that rule adjacent tiles
//! neither drop nor repeat a codon, spliced or not.

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::SequenceFetchError;
use crate::frame::{FrameInfo, FrameResolver};
use crate::tiles::TilesetInfo;
use crate::transcript::Transcript;
use crate::types::*;

/// Source of reference nucleotides for a tile.
///
/// Implementations return the bases of
/// `[window.start - min(front_overhang, window.start), window.end)` on the
/// absolute axis. A response shorter than that is accepted; the missing
/// tail reads as masked.
#[async_trait]
pub trait SequenceProvider: Send + Sync {
    async fn get_tile(
        &self,
        zoom: ZoomLevel,
        tile_index: TileIndex,
        tileset: &TilesetInfo,
        front_overhang: u64,
    ) -> Result<String, SequenceFetchError>;
}

/// Fetched sequence of one tile, front overhang split off.
#[derive(Debug, Clone)]
pub struct TileSequence {
    pub zoom: ZoomLevel,
    pub tile_index: TileIndex,
    /// Absolute window the tile owns
    pub window: GenomicInterval,
    front_excess: usize,
    bases: Vec<u8>,
    /// Coding bases below the fetched range, keyed by absolute position
    upstream: BTreeMap<GenomicPos, u8>,
}

impl TileSequence {
    pub fn new(
        zoom: ZoomLevel,
        tile_index: TileIndex,
        window: GenomicInterval,
        front_overhang: u64,
        sequence: &str,
    ) -> Self {
        let front_excess = front_overhang.min(window.start) as usize;
        let bases = sequence.as_bytes().to_vec();

        let expected = window.len() as usize + front_excess;
        if bases.len() < expected {
            debug!(
                "Tile {}.{}: provider returned {} of {} bases",
                zoom,
                tile_index,
                bases.len(),
                expected
            );
        }

        Self {
            zoom,
            tile_index,
            window,
            front_excess,
            bases,
            upstream: BTreeMap::new(),
        }
    }

    pub async fn fetch<P: SequenceProvider + ?Sized>(
        provider: &P,
        zoom: ZoomLevel,
        tile_index: TileIndex,
        tileset: &TilesetInfo,
        front_overhang: u64,
    ) -> Result<Self, SequenceFetchError> {
        let window = tileset.tile_window(zoom, tile_index);
        let sequence = provider
            .get_tile(zoom, tile_index, tileset, front_overhang)
            .await?;
        Ok(Self::new(zoom, tile_index, window, front_overhang, &sequence))
    }

    /// Absolute range actually requested: window plus overhang.
    pub fn fetched_range(&self) -> GenomicInterval {
        GenomicInterval::new(self.window.start - self.front_excess as u64, self.window.end)
    }

    pub fn front_excess(&self) -> &[u8] {
        &self.bases[..self.front_excess.min(self.bases.len())]
    }

    /// Base at an absolute position, `None` when neither the fetched range
    /// nor the upstream bases hold it, or past the end of a short response.
    pub fn base_at(&self, pos: GenomicPos) -> Option<u8> {
        let range = self.fetched_range();
        if !range.contains(pos) {
            return self.upstream.get(&pos).copied();
        }
        self.bases.get((pos - range.start) as usize).copied()
    }

    pub fn insert_upstream(&mut self, pos: GenomicPos, base: u8) {
        self.upstream.insert(pos, base);
    }

    /// Fetch the upstream coding bases `transcripts` need from this tile and
    /// the tiles holding them. Returns how many were filled in; bases whose
    /// tile cannot be fetched stay masked.
    pub async fn complete_upstream<P: SequenceProvider + ?Sized>(
        &mut self,
        provider: &P,
        tileset: &TilesetInfo,
        transcripts: &[Transcript],
        genome: &GenomeInfo,
    ) -> usize {
        let needed = SequenceStitcher::upstream_needed(transcripts, genome, self);
        if needed.is_empty() {
            return 0;
        }

        let mut by_tile: BTreeMap<TileIndex, Vec<GenomicPos>> = BTreeMap::new();
        for pos in needed {
            by_tile
                .entry(tileset.tile_index_of(self.zoom, pos))
                .or_default()
                .push(pos);
        }

        let mut filled = 0;
        for (tile_index, positions) in by_tile {
            let window = tileset.tile_window(self.zoom, tile_index);
            let sequence = match provider.get_tile(self.zoom, tile_index, tileset, 0).await {
                Ok(sequence) => sequence,
                Err(e) => {
                    debug!(
                        "Tile {}.{}: upstream bases unavailable: {}",
                        self.zoom, self.tile_index, e
                    );
                    continue;
                }
            };
            for pos in positions {
                let Some(&base) = sequence.as_bytes().get((pos - window.start) as usize) else {
                    continue;
                };
                self.upstream.insert(pos, base);
                filled += 1;
            }
        }
        trace!(
            "Tile {}.{}: {} upstream bases fetched",
            self.zoom,
            self.tile_index,
            filled
        );
        filled
    }
}

/// One coding position of a stitched transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchedBase {
    /// Absolute position
    pub pos: GenomicPos,
    /// `None` when the provider had nothing for this position
    pub base: Option<u8>,
}

/// Coding bases of a tile for one transcript, in transcription order.
#[derive(Debug, Clone)]
pub struct StitchedSequence {
    pub transcript_id: String,
    pub strand: Strand,
    /// Bases to skip before the first whole codon
    pub frame_offset: u8,
    pub bases: Vec<StitchedBase>,
    /// Fetched positions that carry no usable coding base
    pub masked: usize,
}

pub struct SequenceStitcher;

impl SequenceStitcher {
    /// Stitch the coding bases of `tx` that codons owned by `tile` are made
    /// of: those inside the window plus the two closest below it.
    ///
    /// `None` when no coding base of the transcript falls in the window.
    pub fn stitch(
        tx: &Transcript,
        frame: &FrameInfo,
        chrom_offset: GenomicPos,
        tile: &TileSequence,
    ) -> Option<StitchedSequence> {
        let local = Self::local_window(chrom_offset, tile)?;

        let mut in_window = Vec::new();
        for part in frame.coding_parts() {
            let Some(iv) = part.interval.intersect(&local) else {
                continue;
            };
            match tx.strand {
                Strand::Forward => in_window.extend(iv.start..iv.end),
                Strand::Reverse => in_window.extend((iv.start..iv.end).rev()),
            }
        }
        if in_window.is_empty() {
            return None;
        }

        let upstream = frame.coding_before(local.start, 2);
        let positions: Vec<GenomicPos> = match tx.strand {
            Strand::Forward => upstream.into_iter().chain(in_window).collect(),
            Strand::Reverse => in_window.into_iter().chain(upstream.into_iter().rev()).collect(),
        };
        let frame_offset = frame.tile_frame_offset(positions[0])?;

        let bases: Vec<StitchedBase> = positions
            .into_iter()
            .map(|p| {
                let pos = p + chrom_offset;
                StitchedBase {
                    pos,
                    base: tile.base_at(pos),
                }
            })
            .collect();

        let fetched = tile.fetched_range();
        let usable = bases
            .iter()
            .filter(|b| fetched.contains(b.pos) && b.base.is_some())
            .count();

        Some(StitchedSequence {
            transcript_id: tx.id.clone(),
            strand: tx.strand,
            frame_offset,
            bases,
            masked: (fetched.len() as usize).saturating_sub(usable),
        })
    }

    /// Absolute coding positions below the window of `tile` that codons it
    /// owns need and that its fetched range does not hold.
    pub fn upstream_positions(
        frame: &FrameInfo,
        chrom_offset: GenomicPos,
        tile: &TileSequence,
    ) -> Vec<GenomicPos> {
        let Some(local) = Self::local_window(chrom_offset, tile) else {
            return Vec::new();
        };
        if !frame.coding_parts().iter().any(|p| p.interval.overlaps(&local)) {
            return Vec::new();
        }

        let fetched = tile.fetched_range();
        frame
            .coding_before(local.start, 2)
            .into_iter()
            .map(|p| p + chrom_offset)
            .filter(|&pos| !fetched.contains(pos))
            .collect()
    }

    /// [`upstream_positions`](Self::upstream_positions) over every coding
    /// transcript. Transcripts that fail to resolve are left to translation
    /// to report.
    pub fn upstream_needed(
        transcripts: &[Transcript],
        genome: &GenomeInfo,
        tile: &TileSequence,
    ) -> BTreeSet<GenomicPos> {
        let mut needed = BTreeSet::new();
        for tx in transcripts {
            let Ok(Some(frame)) = FrameResolver::resolve(tx) else {
                continue;
            };
            let Some(chrom_offset) = genome.chrom_offset(&tx.chrom) else {
                continue;
            };
            needed.extend(Self::upstream_positions(&frame, chrom_offset, tile));
        }
        needed
    }

    /// Chromosome-local part of the tile window, `None` when empty.
    fn local_window(chrom_offset: GenomicPos, tile: &TileSequence) -> Option<GenomicInterval> {
        let local = GenomicInterval::new(
            tile.window.start.saturating_sub(chrom_offset),
            tile.window.end.saturating_sub(chrom_offset),
        );
        (!local.is_empty()).then_some(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::tests::record;
    use async_trait::async_trait;

    fn tile(start: u64, end: u64, overhang: u64, seq: &str) -> TileSequence {
        TileSequence::new(0, 0, GenomicInterval::new(start, end), overhang, seq)
    }

    #[test]
    fn test_front_excess_split() {
        let t = tile(10, 20, 3, "xyzABCDEFGHIJ");
        assert_eq!(t.front_excess(), b"xyz");
        assert_eq!(t.fetched_range(), GenomicInterval::new(7, 20));
        assert_eq!(t.base_at(7), Some(b'x'));
        assert_eq!(t.base_at(10), Some(b'A'));
        assert_eq!(t.base_at(20), None);

        let t = tile(1, 5, 3, "aBCDE");
        assert_eq!(t.front_excess(), b"a");

        let short = tile(10, 20, 3, "xyzABC");
        assert_eq!(short.base_at(12), Some(b'C'));
        assert_eq!(short.base_at(13), None);
    }

    #[test]
    fn test_stitch_skips_intron_and_utr() {
        // exons [0,10) [20,30), CDS [4, 26)
        let tx: Transcript = record("chr1", 1, 30, "T", '+', &[1, 21], &[10, 30], Some((5, 24)))
            .parse()
            .unwrap();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        let seq: String = "0123456789abcdefghijKLMNOPQRST".to_string();
        let t = tile(0, 30, 3, &seq);

        let stitched = SequenceStitcher::stitch(&tx, &frame, 0, &t).unwrap();
        let text: String = stitched
            .bases
            .iter()
            .map(|b| b.base.unwrap() as char)
            .collect();
        assert_eq!(text, "456789KLMNOP");
        assert_eq!(stitched.frame_offset, 0);
        assert_eq!(stitched.masked, 30 - 12);
    }

    #[test]
    fn test_stitch_reverse_order_and_offset() {
        let tx: Transcript = record("chr1", 1, 30, "R", '-', &[1, 21], &[10, 30], Some((24, 5)))
            .parse()
            .unwrap();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        assert_eq!(frame.cds, GenomicInterval::new(4, 26));

        // window [0, 8) fetched from 0; first coding base downstream is 7
        let t = tile(0, 8, 3, "ABCDEFGH");
        let stitched = SequenceStitcher::stitch(&tx, &frame, 0, &t).unwrap();
        let positions: Vec<u64> = stitched.bases.iter().map(|b| b.pos).collect();
        assert_eq!(positions, vec![7, 6, 5, 4]);
        // 6 coding bases in the upper exon: a codon starts at 9, 7 ends it
        assert_eq!(stitched.frame_offset, 1);
    }

    fn split_codon_tx() -> Transcript {
        // exons [0,10) [20,30), CDS [5,26): five coding bases before the
        // intron, so the codon (8, 9, 20) is spliced
        record("chr1", 1, 30, "S", '+', &[1, 21], &[10, 30], Some((6, 24)))
            .parse()
            .unwrap()
    }

    #[test]
    fn test_stitch_takes_upstream_bases_across_intron() {
        let tx = split_codon_tx();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        let seq = "0123456789abcdefghijKLMNOPQRST";
        let mut t = tile(20, 30, 3, &seq[17..]);

        assert_eq!(SequenceStitcher::upstream_positions(&frame, 0, &t), vec![8, 9]);
        let stitched = SequenceStitcher::stitch(&tx, &frame, 0, &t).unwrap();
        let positions: Vec<u64> = stitched.bases.iter().map(|b| b.pos).collect();
        assert_eq!(positions, vec![8, 9, 20, 21, 22, 23, 24, 25]);
        assert_eq!(stitched.bases[0].base, None);
        assert_eq!(stitched.frame_offset, 0);
        assert_eq!(stitched.masked, 13 - 6);

        t.insert_upstream(8, b'8');
        t.insert_upstream(9, b'9');
        let stitched = SequenceStitcher::stitch(&tx, &frame, 0, &t).unwrap();
        let text: String = stitched
            .bases
            .iter()
            .map(|b| b.base.unwrap() as char)
            .collect();
        assert_eq!(text, "89KLMNOP");
    }

    #[test]
    fn test_upstream_inside_overhang_needs_no_fetch() {
        let tx = split_codon_tx();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        // coding bases 20 and 21 sit in the overhang of a tile starting at 22
        let t = tile(22, 30, 3, "jKLMNOPQRST");
        assert!(SequenceStitcher::upstream_positions(&frame, 0, &t).is_empty());
        // no coding base in the window
        let t = tile(12, 18, 3, "xxxxxxxxx");
        assert!(SequenceStitcher::upstream_positions(&frame, 0, &t).is_empty());
    }

    struct SliceProvider(&'static [u8]);

    #[async_trait]
    impl SequenceProvider for SliceProvider {
        async fn get_tile(
            &self,
            zoom: ZoomLevel,
            tile_index: TileIndex,
            tileset: &TilesetInfo,
            front_overhang: u64,
        ) -> Result<String, SequenceFetchError> {
            let window = tileset.tile_window(zoom, tile_index);
            let start = (window.start - front_overhang.min(window.start)) as usize;
            self.0
                .get(start..window.end as usize)
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .ok_or_else(|| SequenceFetchError::new(zoom, tile_index, "out of range"))
        }
    }

    #[tokio::test]
    async fn test_complete_upstream_fetches_previous_tile() {
        let provider = SliceProvider(b"0123456789abcdefghijKLMNOPQRSTUV");
        let genome = GenomeInfo::from_chromsizes(&["chr1"], &[32]).unwrap();
        let tileset = TilesetInfo::for_genome(&genome, 8);
        let tx = split_codon_tx();

        // window [16, 24); bases 8 and 9 live in tile 1
        let mut t = TileSequence::fetch(&provider, tileset.max_zoom, 2, &tileset, 3)
            .await
            .unwrap();
        assert_eq!(t.base_at(8), None);
        let filled = t
            .complete_upstream(&provider, &tileset, std::slice::from_ref(&tx), &genome)
            .await;
        assert_eq!(filled, 2);
        assert_eq!(t.base_at(8), Some(b'8'));
        assert_eq!(t.base_at(9), Some(b'9'));
        assert_eq!(t.base_at(10), None);
    }

    #[test]
    fn test_stitch_outside_cds_is_none() {
        let tx: Transcript = record("chr1", 1, 30, "T", '+', &[1, 21], &[10, 30], Some((5, 24)))
            .parse()
            .unwrap();
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        assert!(SequenceStitcher::stitch(&tx, &frame, 0, &tile(13, 19, 3, "xxxxxxxxx")).is_none());
        // on another chromosome further down the axis
        assert!(SequenceStitcher::stitch(&tx, &frame, 1000, &tile(0, 30, 3, "x")).is_none());
    }
}
