//! Translate command - amino-acid codons of every coding transcript, tile by tile

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use txtrack_core::io::fasta::{genome_from_records, read_records, sequences_from_records};
use txtrack_core::io::FastaSequenceProvider;
use txtrack_core::{
    Codon, CodonTranslator, GenomeInfo, GenomicInterval, SequenceProvider, TileKey, TileTasks,
    TilesetInfo, TrackOptions, Transcript, ZoomLevel,
};

use super::{ensure_exists, load_chromsizes, load_transcripts, local_window, parse_region};
use crate::config::Config;
use crate::error::CliError;
use crate::OutputFormat;

/// One output line; `start`/`end` are chromosome-local, 0-based half-open.
/// A spliced codon spans its intron.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodonRecord {
    pub transcript_id: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub amino_acid: &'static str,
    pub letter: char,
}

#[derive(Debug, Default)]
pub struct TranslationSummary {
    pub tiles: usize,
    pub fetch_failures: usize,
    pub failed_transcripts: usize,
}

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    transcripts: PathBuf,
    reference: PathBuf,
    chromsizes: Option<PathBuf>,
    region: Option<String>,
    zoom: Option<ZoomLevel>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    log::info!("Starting codon translation");
    log::info!("Transcripts: {}", transcripts.display());
    log::info!("Reference: {}", reference.display());

    let (fasta_genome, records) = load_reference(&reference)?;
    let genome = match chromsizes {
        Some(path) => load_chromsizes(&path)?,
        None => fasta_genome,
    };
    let genome = Arc::new(genome);
    let transcripts = load_transcripts(&transcripts)?;
    let region = parse_region(region.as_deref(), &genome)?;
    let tileset = config.tiles.tileset(&genome);
    let zoom = zoom.unwrap_or(tileset.max_zoom);
    if !tileset.is_max_zoom(zoom) {
        log::warn!(
            "Codons are only computed at the deepest zoom level ({}); zoom {} yields none",
            tileset.max_zoom,
            zoom
        );
    }

    let translator = CodonTranslator::new(config.track.resolve_genetic_code()?);
    log::info!("Genetic code: {}", translator.genetic_code().name);

    let provider: Arc<dyn SequenceProvider> = Arc::new(FastaSequenceProvider::new(
        Arc::clone(&genome),
        sequences_from_records(records),
    ));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.general.threads.max(1))
        .enable_all()
        .build()
        .context("Failed to start the translation runtime")?;

    let (codons, summary) = runtime.block_on(translate_region(
        provider,
        Arc::clone(&genome),
        tileset,
        translator,
        &config.track,
        transcripts,
        region,
        zoom,
    ));

    log::info!(
        "{} codons from {} tiles ({} fetch failures, {} transcripts failed)",
        codons.len(),
        summary.tiles,
        summary.fetch_failures,
        summary.failed_transcripts
    );
    if summary.tiles > 0 && summary.fetch_failures == summary.tiles {
        return Err(CliError::translation("no tile sequence could be fetched").into());
    }

    let records = to_records(&codons, &genome);
    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_records(&mut writer, &records, format)?;
            writer.flush()?;
            log::info!("Codons written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_records(&mut stdout.lock(), &records, format)?;
        }
    }

    Ok(())
}

/// Reference records together with the genome they describe.
pub fn load_reference(path: &Path) -> Result<(GenomeInfo, Vec<(String, Vec<u8>)>)> {
    ensure_exists(path)?;
    let records = read_records(path)
        .with_context(|| format!("Failed to read reference: {}", path.display()))?;
    let genome = genome_from_records(&records);
    log::info!(
        "Reference genome: {} sequences, {} bp",
        genome.chroms.len(),
        genome.total_length
    );
    Ok((genome, records))
}

/// Run the codon task of every tile covering `region` and gather the codons
/// that overlap it, ordered by transcript and position.
#[allow(clippy::too_many_arguments)]
pub async fn translate_region(
    provider: Arc<dyn SequenceProvider>,
    genome: Arc<GenomeInfo>,
    tileset: TilesetInfo,
    translator: CodonTranslator,
    opts: &TrackOptions,
    transcripts: Vec<Transcript>,
    region: GenomicInterval,
    zoom: ZoomLevel,
) -> (Vec<Codon>, TranslationSummary) {
    let keys: Vec<TileKey> = tileset
        .tiles_for_range(zoom, &region)
        .into_iter()
        .map(|index| (zoom, index))
        .collect();

    let mut tasks = TileTasks::new(
        provider,
        tileset,
        Arc::clone(&genome),
        translator,
        opts.front_overhang,
    );

    let mut spawned = 0;
    for &key in &keys {
        tasks.init_tile(key);
        let window = tasks.tileset().tile_window(key.0, key.1);
        let in_tile: Vec<Transcript> = transcripts
            .iter()
            .filter(|tx| {
                local_window(&genome, &tx.chrom, &window)
                    .is_some_and(|local| tx.exons_intersect(&local))
            })
            .cloned()
            .collect();
        if in_tile.is_empty() {
            continue;
        }
        if tasks.spawn_codons(key, in_tile) {
            spawned += 1;
        }
    }
    log::debug!("Spawned {} of {} tile tasks", spawned, keys.len());

    tasks.join_all().await;
    tasks.collect_finished();

    let mut summary = TranslationSummary {
        tiles: spawned,
        ..Default::default()
    };
    let mut codons = Vec::new();
    for key in keys {
        let Some(tile) = tasks.codons(key) else {
            continue;
        };
        if tile.fetch_error.is_some() {
            summary.fetch_failures += 1;
        }
        summary.failed_transcripts += tile.failed.len();
        codons.extend(
            tile.transcripts
                .values()
                .flatten()
                .filter(|c| c.pos_start < region.end && c.pos_end >= region.start)
                .cloned(),
        );
    }

    codons.sort_by(|a, b| {
        a.transcript_id
            .cmp(&b.transcript_id)
            .then(a.pos_start.cmp(&b.pos_start))
    });
    (codons, summary)
}

pub fn to_records(codons: &[Codon], genome: &GenomeInfo) -> Vec<CodonRecord> {
    codons
        .iter()
        .filter_map(|codon| {
            let coord = genome.absolute_to_local(codon.pos_start)?;
            let chrom = genome.get_chrom(coord.chrom_id)?;
            Some(CodonRecord {
                transcript_id: codon.transcript_id.clone(),
                chrom: chrom.name.clone(),
                start: coord.position,
                end: coord.position + (codon.pos_end - codon.pos_start) + 1,
                amino_acid: codon.label,
                letter: codon.letter,
            })
        })
        .collect()
}

pub fn write_records<W: Write>(writer: &mut W, records: &[CodonRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, records)?;
            writeln!(writer)?;
        }
        OutputFormat::Tsv => {
            writeln!(writer, "transcript_id\tchrom\tstart\tend\tamino_acid\tletter")?;
            for r in records {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    r.transcript_id, r.chrom, r.start, r.end, r.amino_acid, r.letter
                )?;
            }
        }
    }
    Ok(())
}
