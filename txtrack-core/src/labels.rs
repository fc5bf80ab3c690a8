//! Label placement and overlap suppression.

use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::layout::LayoutSnapshot;
use crate::options::TrackOptions;
use crate::transcript::Transcript;
use crate::types::*;

/// How colliding labels are thinned out. One policy per track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Per row, left to right: hide a label that runs into a visible label
    /// of a transcript ending before this one starts.
    LeftNeighbor { margin: f64 },
    /// Of two intersecting labels, hide the less important one.
    #[default]
    Importance,
}

/// Label rectangle in pixels; `y` is the row centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelBox {
    pub transcript_id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub importance: f64,
    pub row: usize,
    /// Absolute transcript span
    pub tx_start: GenomicPos,
    pub tx_end: GenomicPos,
}

impl LabelBox {
    pub fn intersects(&self, other: &LabelBox) -> bool {
        let (top, bottom) = (self.y - self.height / 2.0, self.y + self.height / 2.0);
        let (other_top, other_bottom) = (other.y - other.height / 2.0, other.y + other.height / 2.0);
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && top < other_bottom
            && other_top < bottom
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelDecision {
    pub label: LabelBox,
    pub visible: bool,
}

/// Linear map from absolute genomic positions to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl XScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, pos: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span == 0.0 {
            return self.range.0;
        }
        self.range.0 + (pos - self.domain.0) * (self.range.1 - self.range.0) / span
    }
}

/// Computes label boxes for placed transcripts.
pub struct LabelPlacer<'a> {
    scale: XScale,
    opts: &'a TrackOptions,
}

impl<'a> LabelPlacer<'a> {
    pub fn new(scale: XScale, opts: &'a TrackOptions) -> Self {
        Self { scale, opts }
    }

    /// Label just left of the transcript start, pulled inside the view and
    /// kept clear of the transcript end. `None` until the transcript has a row.
    pub fn place(&self, tx: &Transcript, span: GenomicInterval, text_width: f64) -> Option<LabelBox> {
        let row = tx.display_row?;
        let m = self.opts.label_margin;
        let h = self.opts.gene_annotation_height;

        let view_left = self.scale.apply(self.scale.domain.0);
        let mut x = (view_left + m).max(self.scale.apply(span.start as f64) - text_width - 2.0 * m);
        x = x.min(self.scale.apply(span.end as f64) - text_width - h / 2.0 - 2.0 * m);

        Some(LabelBox {
            transcript_id: tx.id.clone(),
            x: x - m,
            y: LayoutSnapshot::row_center_y(row, self.opts),
            width: text_width + 2.0 * m,
            height: h,
            importance: tx.importance,
            row,
            tx_start: span.start,
            tx_end: span.end,
        })
    }
}

/// The `max_texts` most important transcripts of a tile, most important first.
pub fn select_labelled<'t>(transcripts: &'t [Transcript], max_texts: usize) -> Vec<&'t Transcript> {
    let mut ranked: Vec<&Transcript> = transcripts.iter().collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(max_texts);
    ranked
}

pub struct LabelOverlapResolver {
    policy: LabelPolicy,
}

impl LabelOverlapResolver {
    pub fn new(policy: LabelPolicy) -> Self {
        Self { policy }
    }

    /// Visibility for each label, parallel to `labels`.
    pub fn resolve(&self, labels: &[LabelBox]) -> Vec<bool> {
        match self.policy {
            LabelPolicy::LeftNeighbor { margin } => left_neighbor(labels, margin),
            LabelPolicy::Importance => by_importance(labels),
        }
    }
}

fn left_neighbor(labels: &[LabelBox], margin: f64) -> Vec<bool> {
    let mut visible = vec![true; labels.len()];
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by_key(|&i| (labels[i].row, labels[i].tx_start));

    for (pos, &i) in order.iter().enumerate() {
        let cur = &labels[i];
        let blocked = order[..pos].iter().any(|&j| {
            let prev = &labels[j];
            visible[j]
                && prev.row == cur.row
                && prev.tx_end < cur.tx_start
                && prev.x + prev.width + margin > cur.x
        });
        if blocked {
            trace!("Hiding label {} behind its left neighbour", cur.transcript_id);
            visible[i] = false;
        }
    }
    visible
}

fn by_importance(labels: &[LabelBox]) -> Vec<bool> {
    let mut visible = vec![true; labels.len()];
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            if !labels[i].intersects(&labels[j]) {
                continue;
            }
            if labels[i].importance > labels[j].importance {
                visible[j] = false;
            } else {
                visible[i] = false;
            }
        }
    }
    visible
}

/// Place and resolve the labels of every visible tile.
///
/// `tiles` lists the transcripts of each tile; a transcript shown by several
/// tiles gets one label. `text_width` stands in for text measurement.
pub fn label_pass<F>(
    snapshot: &LayoutSnapshot,
    tiles: &[Vec<Transcript>],
    scale: XScale,
    opts: &TrackOptions,
    text_width: F,
) -> Vec<LabelDecision>
where
    F: Fn(&str) -> f64,
{
    let placer = LabelPlacer::new(scale, opts);
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for tile in tiles {
        for tx in select_labelled(tile, opts.max_texts) {
            if !seen.insert(tx.id.as_str()) {
                continue;
            }
            // rows and absolute spans come from the current snapshot
            let (Some(placed), Some(span)) = (snapshot.get(&tx.id), snapshot.span_of(&tx.id)) else {
                continue;
            };
            if let Some(label) = placer.place(placed, span, text_width(&placed.name)) {
                labels.push(label);
            }
        }
    }

    let visible = if opts.transcripts_hidden {
        vec![false; labels.len()]
    } else {
        LabelOverlapResolver::new(opts.label_policy).resolve(&labels)
    };

    labels
        .into_iter()
        .zip(visible)
        .map(|(label, visible)| LabelDecision { label, visible })
        .collect()
}
