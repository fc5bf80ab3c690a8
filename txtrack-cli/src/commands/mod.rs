//! Command implementations for the txtrack CLI

#[cfg(feature = "layout")] pub mod layout;
#[cfg(feature = "translate")] pub mod translate;

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use txtrack_core::io::{read_chromsizes, read_transcripts};
use txtrack_core::{GenomeInfo, GenomicInterval, GenomicPos, Transcript};

use crate::error::{CliError, CliResult};

/// Approximate rendered width of a label in pixels.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.6
}

pub fn ensure_exists(path: &Path) -> CliResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CliError::file_not_found(path.to_path_buf()))
    }
}

/// Transcripts of a record file; malformed lines are logged and skipped.
pub fn load_transcripts(path: &Path) -> Result<Vec<Transcript>> {
    ensure_exists(path)?;
    let load = read_transcripts(path)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read transcripts: {}", path.display()))?;

    if !load.skipped.is_empty() {
        log::warn!(
            "{} malformed records skipped in {}",
            load.skipped.len(),
            path.display()
        );
    }
    log::info!("Loaded {} transcripts", load.transcripts.len());
    Ok(load.transcripts)
}

pub fn load_chromsizes(path: &Path) -> Result<GenomeInfo> {
    ensure_exists(path)?;
    let genome = read_chromsizes(path)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read chromosome sizes: {}", path.display()))?;
    log::info!(
        "Genome: {} chromosomes, {} bp",
        genome.chroms.len(),
        genome.total_length
    );
    Ok(genome)
}

/// Parse a position such as `1500`, `2.5K` or `1M`.
pub fn parse_genomic_position(pos: &str) -> CliResult<GenomicPos> {
    let upper = pos.trim().to_uppercase();
    let (number, scale) = match upper.chars().last() {
        Some('K') => (&upper[..upper.len() - 1], 1_000.0),
        Some('M') => (&upper[..upper.len() - 1], 1_000_000.0),
        Some('G') => (&upper[..upper.len() - 1], 1_000_000_000.0),
        _ => (upper.as_str(), 1.0),
    };

    if scale == 1.0 {
        return number
            .parse::<GenomicPos>()
            .map_err(|_| CliError::invalid_region(pos, "invalid number format"));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| CliError::invalid_region(pos, "invalid number format"))?;
    Ok((value * scale).round() as GenomicPos)
}

/// Absolute interval of a `chrom[:start-end]` region. `start` is 1-based and
/// `end` inclusive; `None` selects the whole genome.
pub fn parse_region(region: Option<&str>, genome: &GenomeInfo) -> CliResult<GenomicInterval> {
    let Some(region) = region else {
        return Ok(GenomicInterval::new(0, genome.total_length));
    };

    let re = Regex::new(r"^([^:\s]+)(?::([0-9.]+[KkMmGg]?)-([0-9.]+[KkMmGg]?))?$")
        .map_err(|e| CliError::invalid_region(region, e.to_string()))?;
    let caps = re
        .captures(region.trim())
        .ok_or_else(|| CliError::invalid_region(region, "expected chrom:start-end"))?;

    let name = &caps[1];
    let chrom = genome
        .get_chrom_by_name(name)
        .ok_or_else(|| CliError::UnknownChrom { name: name.to_string() })?;
    let offset = genome
        .chrom_offset(name)
        .ok_or_else(|| CliError::UnknownChrom { name: name.to_string() })?;

    let (start, end) = match (caps.get(2), caps.get(3)) {
        (Some(start), Some(end)) => {
            let start = parse_genomic_position(start.as_str())?;
            let end = parse_genomic_position(end.as_str())?;
            if start == 0 || start > end || start > chrom.length {
                return Err(CliError::invalid_region(
                    region,
                    format!(
                        "start ({}) must be between 1 and min(end, {}) ({})",
                        start, chrom.length, end
                    ),
                ));
            }
            (start - 1, end.min(chrom.length))
        }
        _ => (0, chrom.length),
    };

    Ok(GenomicInterval::new(offset + start, offset + end))
}

/// Chromosome-local part of an absolute window on `chrom`, if any.
pub fn local_window(genome: &GenomeInfo, chrom: &str, window: &GenomicInterval) -> Option<GenomicInterval> {
    let offset = genome.chrom_offset(chrom)?;
    let length = genome.get_chrom_by_name(chrom)?.length;
    let chrom_span = GenomicInterval::new(offset, offset + length);
    let clipped = chrom_span.intersect(window)?;
    Some(GenomicInterval::new(clipped.start - offset, clipped.end - offset))
}
