//! Property-based tests for row packing, frame resolution and tile stitching.

use proptest::prelude::*;
use txtrack_core::genetic_code::complement;
use txtrack_core::layout::intervals_collide;
use txtrack_core::{
    AminoAcid, CodonTranslator, FrameResolver, GenomeInfo, GenomicInterval, RowPacker,
    SequenceStitcher, Strand, TileSequence, Transcript,
};

// =============================================================================
// Strategies
// =============================================================================

/// `(start, end)` pairs with `start < end`.
fn intervals() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((0..500u64, 1..80u64), 1..40)
        .prop_map(|v| v.into_iter().map(|(s, len)| (s, s + len)).collect())
}

/// Exon lengths and the intron before each; CDS picked by exonic offsets.
fn coding_transcript() -> impl Strategy<Value = Transcript> {
    (
        prop::collection::vec((1..20u64, 1..30u64), 1..6),
        any::<prop::sample::Index>(),
        any::<prop::sample::Index>(),
        any::<bool>(),
    )
        .prop_map(|(exons, a, b, forward)| {
            let mut starts = Vec::new();
            let mut ends = Vec::new();
            let mut pos = 100;
            for (gap, len) in exons {
                pos += gap;
                starts.push(pos);
                ends.push(pos + len);
                pos += len;
            }

            // exonic coordinate -> genomic coordinate
            let exonic: Vec<u64> = starts
                .iter()
                .zip(&ends)
                .flat_map(|(&s, &e)| s..e)
                .collect();
            let i = a.index(exonic.len());
            let j = b.index(exonic.len());
            let (lo, hi) = (i.min(j), i.max(j));
            let cds = GenomicInterval::new(exonic[lo], exonic[hi] + 1);

            let strand = if forward { Strand::Forward } else { Strand::Reverse };
            let (start_codon_pos, stop_codon_pos) = match strand {
                Strand::Forward => (cds.start, cds.end),
                Strand::Reverse => (cds.end - 3, cds.start),
            };

            Transcript {
                id: "tx".to_string(),
                name: "tx".to_string(),
                chrom: "chr1".to_string(),
                tx_start: starts[0],
                tx_end: *ends.last().unwrap(),
                strand,
                exon_starts: starts,
                exon_ends: ends,
                coding_type: "protein_coding".to_string(),
                start_codon_pos: Some(start_codon_pos),
                stop_codon_pos: Some(stop_codon_pos),
                importance: 0.0,
                display_row: None,
            }
        })
}

fn nucleotides(len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just('A'), Just('C'), Just('G'), Just('T'), Just('N')], len)
        .prop_map(|v| v.into_iter().collect())
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn packed_rows_never_collide(mut spans in intervals()) {
        spans.sort_by_key(|&(s, _)| s);
        let mut packer = RowPacker::new();
        let rows: Vec<usize> = spans
            .iter()
            .enumerate()
            .map(|(i, &(s, e))| packer.place(s, e, &i.to_string()))
            .collect();

        for i in 0..spans.len() {
            for j in (i + 1)..spans.len() {
                if rows[i] == rows[j] {
                    let (a, b) = (spans[i], spans[j]);
                    prop_assert!(!intervals_collide(a.0, a.1, b.0, b.1));
                }
            }
            // greedy: every lower row was blocked by an earlier interval
            for lower in 0..rows[i] {
                prop_assert!((0..i).any(|k| rows[k] == lower
                    && intervals_collide(spans[k].0, spans[k].1, spans[i].0, spans[i].1)));
            }
        }
        prop_assert!(packer.num_rows() <= spans.len());
    }

    #[test]
    fn frame_offsets_complete_codons(tx in coding_transcript()) {
        let frame = FrameResolver::resolve(&tx).unwrap().unwrap();
        prop_assert_eq!(frame.offsets.len(), tx.exon_count());
        prop_assert!(frame.offsets.iter().all(|&o| o < 3));

        for part in frame.coding_parts() {
            let offset = frame.offsets[part.exon_index] as u64;
            prop_assert_eq!((part.upstream + offset) % 3, 0);
        }

        if frame.cds_len() % 3 == 0 {
            let last = frame.coding_parts().last().unwrap();
            let offset = frame.offsets[last.exon_index] as u64;
            prop_assert_eq!((last.interval.len() + 3 - offset) % 3, 0);
        }
    }

    #[test]
    fn tiles_reproduce_whole_cds_translation(
        tx in coding_transcript(),
        seq in nucleotides(400),
        tile_size in 3..64u64,
    ) {
        let genome = GenomeInfo::from_chromsizes(&["chr1"], &[400]).unwrap();
        let translator = CodonTranslator::default();
        let reverse = tx.strand == Strand::Reverse;

        // exon ∩ CDS bases in transcription order, read in one pass
        let cds = tx.cds_interval().unwrap();
        let mut coding: Vec<u64> = tx
            .exons()
            .filter_map(|e| e.intersect(&cds))
            .flat_map(|iv| iv.start..iv.end)
            .collect();
        if reverse {
            coding.reverse();
        }
        let transcribed: String = coding
            .iter()
            .map(|&p| {
                let base = seq.as_bytes()[p as usize];
                if reverse { complement(base) as char } else { base as char }
            })
            .collect();
        let mut expected: Vec<([u64; 3], AminoAcid)> = translator
            .translate_frame(&transcribed, 0)
            .into_iter()
            .zip(coding.chunks_exact(3))
            .filter_map(|(aa, triplet)| {
                let mut positions = [triplet[0], triplet[1], triplet[2]];
                positions.sort_unstable();
                aa.map(|aa| (positions, aa))
            })
            .collect();
        expected.sort_by_key(|(positions, _)| positions[0]);

        let mut stitched = Vec::new();
        let mut start = 0;
        let mut index = 0;
        while start < 400 {
            let end = (start + tile_size).min(400);
            let fetch_from = start - start.min(3);
            let mut tile = TileSequence::new(
                1,
                index,
                GenomicInterval::new(start, end),
                3,
                &seq[fetch_from as usize..end as usize],
            );
            for pos in SequenceStitcher::upstream_needed(std::slice::from_ref(&tx), &genome, &tile) {
                tile.insert_upstream(pos, seq.as_bytes()[pos as usize]);
            }
            stitched.extend(translator.tile_codons(&tx, &genome, &tile).unwrap());
            start = end;
            index += 1;
        }

        let stitched: Vec<([u64; 3], AminoAcid)> =
            stitched.iter().map(|c| (c.positions, c.amino_acid)).collect();
        prop_assert_eq!(stitched, expected);
    }
}
