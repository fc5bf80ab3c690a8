//! Layout command - pack transcripts into rows and resolve their labels

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use txtrack_core::{
    describe, label_pass, ExonSegment, FrameResolver, GenomeInfo, GenomicInterval, LabelDecision,
    Strand, TilesetInfo, TrackLayout, Transcript, XScale, ZoomLevel,
};

use super::{load_chromsizes, load_transcripts, local_window, parse_region, text_width};
use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct LayoutReport {
    pub version: u64,
    pub track_height: f64,
    pub zoom: ZoomLevel,
    pub region: GenomicInterval,
    pub rows: usize,
    pub transcripts: Vec<PlacedTranscript>,
    pub labels: Vec<LabelDecision>,
}

#[derive(Debug, Serialize)]
pub struct PlacedTranscript {
    pub id: String,
    pub name: String,
    pub chrom: String,
    pub strand: Strand,
    pub row: usize,
    /// Absolute span
    pub start: u64,
    pub end: u64,
    pub description: String,
    pub segments: Vec<ExonSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_offsets: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_error: Option<String>,
}

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    transcripts: PathBuf,
    chromsizes: Option<PathBuf>,
    reference: Option<PathBuf>,
    region: Option<String>,
    zoom: Option<ZoomLevel>,
    width: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    log::info!("Starting transcript layout");
    log::info!("Transcripts: {}", transcripts.display());

    let genome = load_genome(chromsizes, reference)?;
    let records = load_transcripts(&transcripts)?;
    let region = parse_region(region.as_deref(), &genome)?;
    let tileset = config.tiles.tileset(&genome);
    let zoom = zoom.unwrap_or_else(|| zoom_for_region(&tileset, &region));
    log::info!("Region {}-{} at zoom {}", region.start, region.end, zoom);

    let report = build_report(config, &genome, &tileset, records, region, zoom, width);
    log::info!(
        "{} transcripts in {} rows, {} of {} labels visible",
        report.transcripts.len(),
        report.rows,
        report.labels.iter().filter(|d| d.visible).count(),
        report.labels.len()
    );

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writer.flush()?;
            log::info!("Layout written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}

fn load_genome(chromsizes: Option<PathBuf>, reference: Option<PathBuf>) -> Result<GenomeInfo> {
    if let Some(path) = chromsizes {
        return load_chromsizes(&path);
    }
    #[cfg(feature = "translate")]
    if let Some(path) = reference {
        let (genome, _) = super::translate::load_reference(&path)?;
        return Ok(genome);
    }
    #[cfg(not(feature = "translate"))]
    let _ = reference;

    Err(anyhow!("either --chromsizes or --reference is required"))
}

/// Deepest zoom at which one tile still covers the region.
pub fn zoom_for_region(tileset: &TilesetInfo, region: &GenomicInterval) -> ZoomLevel {
    (0..=tileset.max_zoom)
        .rev()
        .find(|&z| tileset.tile_width(z) >= region.len())
        .unwrap_or(0)
}

/// Transcripts of each tile at `zoom` that overlap the region.
pub fn tile_transcripts(
    genome: &GenomeInfo,
    tileset: &TilesetInfo,
    transcripts: &[Transcript],
    region: &GenomicInterval,
    zoom: ZoomLevel,
) -> Vec<Vec<Transcript>> {
    tileset
        .tiles_for_range(zoom, region)
        .into_iter()
        .filter_map(|index| tileset.tile_window(zoom, index).intersect(region))
        .map(|window| {
            transcripts
                .iter()
                .filter(|tx| {
                    local_window(genome, &tx.chrom, &window)
                        .is_some_and(|local| tx.span().overlaps(&local))
                })
                .cloned()
                .collect()
        })
        .collect()
}

pub fn build_report(
    config: &Config,
    genome: &GenomeInfo,
    tileset: &TilesetInfo,
    transcripts: Vec<Transcript>,
    region: GenomicInterval,
    zoom: ZoomLevel,
    width: f64,
) -> LayoutReport {
    let opts = &config.track;
    let tiles = tile_transcripts(genome, tileset, &transcripts, &region, zoom);

    let mut layout = TrackLayout::new();
    let snapshot = layout.update_transcript_info(tiles.iter().cloned(), genome);
    layout.adjust_track_height(opts);

    let scale = XScale::new((region.start as f64, region.end as f64), (0.0, width));
    let labels = label_pass(&snapshot, &tiles, scale, opts, |text| {
        text_width(text, opts.font_size)
    });

    let placed = snapshot
        .transcripts
        .iter()
        .zip(&snapshot.spans)
        .map(|(tx, span)| place(tx, span))
        .collect();

    LayoutReport {
        version: snapshot.version,
        track_height: layout.track_height(),
        zoom,
        region,
        rows: snapshot.num_transcript_rows(),
        transcripts: placed,
        labels,
    }
}

fn place(tx: &Transcript, span: &GenomicInterval) -> PlacedTranscript {
    let (segments, frame_offsets, frame_error) = match (
        FrameResolver::segments(tx),
        FrameResolver::resolve(tx),
    ) {
        (Ok(segments), Ok(frame)) => (segments, frame.map(|f| f.offsets), None),
        (Err(gap), _) | (_, Err(gap)) => {
            log::warn!("{}", gap);
            (Vec::new(), None, Some(gap.reason))
        }
    };

    PlacedTranscript {
        id: tx.id.clone(),
        name: tx.name.clone(),
        chrom: tx.chrom.clone(),
        strand: tx.strand,
        row: tx.display_row.unwrap_or_default(),
        start: span.start,
        end: span.end,
        description: describe(tx),
        segments,
        frame_offsets,
        frame_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txtrack_core::{SegmentKind, TranscriptFormatter};

    fn record(name: &str, start: u64, end: u64, exons: &[(u64, u64)], cds: Option<(u64, u64)>) -> Transcript {
        let starts: Vec<String> = exons.iter().map(|e| (e.0 + 1).to_string()).collect();
        let ends: Vec<String> = exons.iter().map(|e| e.1.to_string()).collect();
        let (coding_type, codons) = match cds {
            Some((a, b)) => ("protein_coding", format!("{}\t{}", a + 1, b - 2)),
            None => ("lncRNA", ".\t.".to_string()),
        };
        let line = format!(
            "chr1\t{}\t{}\t{}\t0\t+\t{}\t{}\t{}\t.\t{}\t{}\t{},\t{},\t{}",
            start + 1,
            end,
            name,
            name,
            name,
            coding_type,
            name,
            exons.len(),
            starts.join(","),
            ends.join(","),
            codons
        );
        TranscriptFormatter::format_line(&line).unwrap()
    }

    fn genome() -> GenomeInfo {
        GenomeInfo::from_chromsizes(&["chr1"], &[4000]).unwrap()
    }

    #[test]
    fn test_zoom_for_region() {
        let tileset = TilesetInfo::for_genome(&genome(), 1024);
        assert_eq!(tileset.max_zoom, 2);
        assert_eq!(zoom_for_region(&tileset, &GenomicInterval::new(0, 4000)), 0);
        assert_eq!(zoom_for_region(&tileset, &GenomicInterval::new(0, 2000)), 1);
        assert_eq!(zoom_for_region(&tileset, &GenomicInterval::new(0, 100)), 2);
    }

    #[test]
    fn test_build_report() {
        let genome = genome();
        let config = Config::default();
        let tileset = config.tiles.tileset(&genome);
        let transcripts = vec![
            record("A", 100, 1100, &[(100, 400), (800, 1100)], Some((150, 900))),
            record("B", 1110, 1300, &[(1110, 1300)], None),
            record("C", 200, 300, &[(200, 300)], None),
        ];

        let region = GenomicInterval::new(0, 4000);
        let report = build_report(&config, &genome, &tileset, transcripts, region, 0, 4000.0);

        assert_eq!(report.rows, 2);
        assert_eq!(report.track_height, 2.0 * 16.0 + 26.0 + 10.0);
        let rows: Vec<(&str, usize)> = report
            .transcripts
            .iter()
            .map(|t| (t.name.as_str(), t.row))
            .collect();
        assert_eq!(rows, vec![("A", 0), ("C", 1), ("B", 0)]);

        let a = &report.transcripts[0];
        assert_eq!(a.frame_offsets, Some(vec![0, 2]));
        assert_eq!(a.segments.first().map(|s| s.kind), Some(SegmentKind::Utr));
        assert_eq!(report.labels.len(), 3);
    }

    #[test]
    fn test_region_limits_transcripts() {
        let genome = genome();
        let config = Config::default();
        let tileset = config.tiles.tileset(&genome);
        let transcripts = vec![
            record("A", 100, 200, &[(100, 200)], None),
            record("B", 3000, 3500, &[(3000, 3500)], None),
        ];

        let region = GenomicInterval::new(2500, 4000);
        let zoom = zoom_for_region(&tileset, &region);
        let report = build_report(&config, &genome, &tileset, transcripts, region, zoom, 800.0);
        let names: Vec<&str> = report.transcripts.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
    }
}
