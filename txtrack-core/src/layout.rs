//! Row packing and the published layout snapshot.
//!
//! Transcripts are laid out on the absolute genomic axis (chromosome offset
//! plus local position) so records from different chromosomes never share
//! a slot by accident. Each pass builds a fresh [`LayoutSnapshot`]; readers
//! keep whatever `Arc` they cloned and never observe a half-built registry.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use crate::options::TrackOptions;
use crate::transcript::Transcript;
use crate::types::*;

/// One occupied slot on a display row, in absolute coordinates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowEntry {
    pub start: GenomicPos,
    pub end: GenomicPos,
    pub id: String,
}

/// Closed-interval overlap: touching ends count as a collision.
pub fn intervals_collide(a_start: GenomicPos, a_end: GenomicPos, b_start: GenomicPos, b_end: GenomicPos) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Greedy lowest-free-row interval packer.
#[derive(Debug, Default, Clone)]
pub struct RowPacker {
    rows: Vec<BTreeSet<RowEntry>>,
}

impl RowPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an interval on the smallest row it does not collide with.
    pub fn place(&mut self, start: GenomicPos, end: GenomicPos, id: &str) -> usize {
        let row = (0..self.rows.len())
            .find(|&r| !self.row_collides(r, start, end))
            .unwrap_or_else(|| {
                self.rows.push(BTreeSet::new());
                self.rows.len() - 1
            });

        self.rows[row].insert(RowEntry {
            start,
            end,
            id: id.to_string(),
        });
        row
    }

    fn row_collides(&self, row: usize, start: GenomicPos, end: GenomicPos) -> bool {
        // entries on a row are disjoint, so the last one starting at or
        // before `end` also has the largest end among them
        let upper = RowEntry {
            start: end.saturating_add(1),
            end: 0,
            id: String::new(),
        };
        self.rows[row]
            .range((Bound::Unbounded, Bound::Excluded(upper)))
            .next_back()
            .map_or(false, |e| intervals_collide(e.start, e.end, start, end))
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn into_rows(self) -> Vec<BTreeSet<RowEntry>> {
        self.rows
    }
}

/// Immutable result of one layout pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutSnapshot {
    pub version: u64,
    /// Sorted by absolute start; every entry has `display_row` set.
    pub transcripts: Vec<Transcript>,
    /// Absolute span of each transcript, parallel to `transcripts`.
    pub spans: Vec<GenomicInterval>,
    pub rows: Vec<BTreeSet<RowEntry>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LayoutSnapshot {
    /// Pack `transcripts` (already deduplicated) into rows.
    pub fn build(version: u64, transcripts: Vec<Transcript>, genome: &GenomeInfo) -> Self {
        let mut placed: Vec<(GenomicInterval, Transcript)> = transcripts
            .into_iter()
            .filter_map(|tx| match genome.chrom_offset(&tx.chrom) {
                Some(offset) => Some((tx.span().shift(offset), tx)),
                None => {
                    warn!("Skipping transcript {}: unknown chromosome {}", tx.id, tx.chrom);
                    None
                }
            })
            .collect();

        // stable: equal starts keep input order
        placed.sort_by_key(|(span, _)| span.start);

        let mut packer = RowPacker::new();
        let mut spans = Vec::with_capacity(placed.len());
        let mut sorted = Vec::with_capacity(placed.len());
        let mut index = HashMap::with_capacity(placed.len());

        for (span, mut tx) in placed {
            tx.display_row = Some(packer.place(span.start, span.end, &tx.id));
            index.insert(tx.id.clone(), sorted.len());
            spans.push(span);
            sorted.push(tx);
        }

        debug!(
            "Layout v{}: {} transcripts in {} rows",
            version,
            sorted.len(),
            packer.num_rows()
        );

        Self {
            version,
            transcripts: sorted,
            spans,
            rows: packer.into_rows(),
            index,
        }
    }

    pub fn num_transcript_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, id: &str) -> Option<&Transcript> {
        self.index.get(id).map(|&i| &self.transcripts[i])
    }

    pub fn span_of(&self, id: &str) -> Option<GenomicInterval> {
        self.index.get(id).map(|&i| self.spans[i])
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.get(id).and_then(|tx| tx.display_row)
    }

    /// Transcript drawn on `row` at absolute position `pos`, if any.
    pub fn transcript_at(&self, pos: GenomicPos, row: usize) -> Option<&Transcript> {
        let upper = RowEntry {
            start: pos.saturating_add(1),
            end: 0,
            id: String::new(),
        };
        let entry = self
            .rows
            .get(row)?
            .range((Bound::Unbounded, Bound::Excluded(upper)))
            .next_back()?;
        (pos < entry.end).then(|| self.get(&entry.id)).flatten()
    }

    /// Vertical centre of a display row in pixels.
    pub fn row_center_y(row: usize, opts: &TrackOptions) -> f64 {
        row as f64 * opts.row_height()
            + opts.toggle_offset()
            + opts.gene_annotation_height / 2.0
            + opts.gene_strand_spacing / 2.0
    }
}

/// Plain-text hover description: name, then location and strand.
pub fn describe(tx: &Transcript) -> String {
    format!(
        "{}\n{}:{}-{} Strand: {}",
        tx.name, tx.chrom, tx.tx_start, tx.tx_end, tx.strand
    )
}

/// Owner of the current layout snapshot and the track height it implies.
#[derive(Debug, Default)]
pub struct TrackLayout {
    current: Arc<LayoutSnapshot>,
    next_version: u64,
    track_height: f64,
}

impl TrackLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<LayoutSnapshot> {
        Arc::clone(&self.current)
    }

    /// Rebuild the registry from the transcripts of every visible tile.
    ///
    /// A transcript present in several tiles is kept once (first occurrence).
    pub fn update_transcript_info<I>(&mut self, tiles: I, genome: &GenomeInfo) -> Arc<LayoutSnapshot>
    where
        I: IntoIterator,
        I::Item: IntoIterator<Item = Transcript>,
    {
        let mut seen = HashSet::new();
        let visible: Vec<Transcript> = tiles
            .into_iter()
            .flatten()
            .filter(|tx| seen.insert(tx.id.clone()))
            .collect();

        self.next_version += 1;
        self.current = Arc::new(LayoutSnapshot::build(self.next_version, visible, genome));
        self.snapshot()
    }

    pub fn compute_track_height(&self, opts: &TrackOptions) -> f64 {
        if opts.transcripts_hidden {
            opts.toggle_button_height + opts.track_margin
        } else {
            self.current.num_transcript_rows() as f64 * opts.row_height()
                + opts.toggle_offset()
                + opts.track_margin
        }
    }

    /// Recompute the height; `true` when it changed and the host must resize.
    pub fn adjust_track_height(&mut self, opts: &TrackOptions) -> bool {
        let height = self.compute_track_height(opts);
        let changed = height != self.track_height;
        self.track_height = height;
        changed
    }

    pub fn track_height(&self) -> f64 {
        self.track_height
    }
}
