//! In-memory FASTA reference serving tile sequence on the absolute axis.
//!
//! Records are parsed with needletail; gzipped files are decoded through
//! flate2 first.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::error::SequenceFetchError;
use crate::stitch::SequenceProvider;
use crate::tiles::TilesetInfo;
use crate::types::*;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty file or no sequences found")]
    EmptyFile,
}

pub struct FastaSequenceProvider {
    genome: Arc<GenomeInfo>,
    sequences: HashMap<String, Vec<u8>>,
}

impl FastaSequenceProvider {
    pub fn new(genome: Arc<GenomeInfo>, sequences: HashMap<String, Vec<u8>>) -> Self {
        Self { genome, sequences }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, genome: Arc<GenomeInfo>) -> Result<Self, FastaError> {
        let records = read_records(path)?;
        Ok(Self::new(genome, sequences_from_records(records)))
    }

    pub fn genome(&self) -> &GenomeInfo {
        &self.genome
    }

    /// Bases of an absolute range; chromosomes without sequence, or shorter
    /// than their declared length, read as `N`. Stops at the end of the axis.
    pub fn fetch_range(&self, range: &GenomicInterval) -> Vec<u8> {
        let mut out = Vec::with_capacity(range.len() as usize);
        let mut pos = range.start;

        while pos < range.end {
            let Some(coord) = self.genome.absolute_to_local(pos) else {
                break;
            };
            let Some(chrom) = self.genome.get_chrom(coord.chrom_id) else {
                break;
            };
            let take = (range.end - pos).min(chrom.length - coord.position);
            let from = coord.position as usize;
            let to = (coord.position + take) as usize;

            match self.sequences.get(&chrom.name) {
                Some(seq) => {
                    let available = &seq[from.min(seq.len())..to.min(seq.len())];
                    out.extend_from_slice(available);
                    out.resize(out.len() + (take as usize - available.len()), b'N');
                }
                None => out.resize(out.len() + take as usize, b'N'),
            }
            pos += take;
        }
        out
    }
}

#[async_trait]
impl SequenceProvider for FastaSequenceProvider {
    async fn get_tile(
        &self,
        zoom: ZoomLevel,
        tile_index: TileIndex,
        tileset: &TilesetInfo,
        front_overhang: u64,
    ) -> Result<String, SequenceFetchError> {
        let window = tileset.tile_window(zoom, tile_index);
        if window.is_empty() {
            return Err(SequenceFetchError::new(zoom, tile_index, "tile lies beyond the end of the genome"));
        }
        let start = window.start - front_overhang.min(window.start);
        let bases = self.fetch_range(&GenomicInterval::new(start, window.end));
        debug!("Tile {}.{}: served {} bases", zoom, tile_index, bases.len());

        String::from_utf8(bases).map_err(|e| SequenceFetchError::new(zoom, tile_index, e.to_string()))
    }
}

/// `(name, sequence)` pairs in file order; the name is the header up to the
/// first whitespace.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<(String, Vec<u8>)>, FastaError> {
    let path = path.as_ref();
    let reader: Box<dyn FastxReader> = if path.to_string_lossy().ends_with(".gz") {
        let decoder = GzDecoder::new(File::open(path)?);
        parse_fastx_reader(BufReader::new(decoder)).map_err(|e| FastaError::Parse(e.to_string()))?
    } else {
        parse_fastx_file(path).map_err(|e| FastaError::Parse(e.to_string()))?
    };

    let records = collect_records(reader)?;
    info!("Loaded {} reference sequences from {}", records.len(), path.display());
    Ok(records)
}

fn collect_records(mut reader: Box<dyn FastxReader>) -> Result<Vec<(String, Vec<u8>)>, FastaError> {
    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| FastaError::Parse(e.to_string()))?;
        let header = String::from_utf8_lossy(record.id()).to_string();
        let name = header.split_whitespace().next().unwrap_or_default().to_string();
        records.push((name, record.seq().to_vec()));
    }

    if records.is_empty() {
        Err(FastaError::EmptyFile)
    } else {
        Ok(records)
    }
}

/// Chromosome layout taken from the FASTA itself, in record order.
pub fn genome_from_records(records: &[(String, Vec<u8>)]) -> GenomeInfo {
    let mut genome = GenomeInfo::new();
    for (name, seq) in records {
        if genome.get_chrom_by_name(name).is_none() {
            genome.add_chrom(name.clone(), seq.len() as GenomicPos);
        }
    }
    genome
}

/// Sequences by name. A repeated name keeps its first record, as
/// [`genome_from_records`] does, so lengths and bases always agree.
pub fn sequences_from_records(records: Vec<(String, Vec<u8>)>) -> HashMap<String, Vec<u8>> {
    let mut sequences = HashMap::with_capacity(records.len());
    for (name, seq) in records {
        match sequences.entry(name) {
            Entry::Occupied(e) => warn!("Duplicate reference sequence '{}' ignored", e.key()),
            Entry::Vacant(e) => {
                e.insert(seq);
            }
        }
    }
    sequences
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn provider() -> FastaSequenceProvider {
        let genome = GenomeInfo::from_chromsizes(&["chr1", "chr2", "chr3"], &[8, 6, 4]).unwrap();
        let mut seqs = HashMap::new();
        seqs.insert("chr1".to_string(), b"AAAACCCC".to_vec());
        seqs.insert("chr2".to_string(), b"GGGT".to_vec());
        FastaSequenceProvider::new(Arc::new(genome), seqs)
    }

    #[test]
    fn test_fetch_range_across_chromosomes() {
        let p = provider();
        assert_eq!(p.fetch_range(&GenomicInterval::new(6, 12)), b"CCGGGT".to_vec());
        // chr2 shorter than declared, chr3 absent
        assert_eq!(p.fetch_range(&GenomicInterval::new(12, 16)), b"NNNN".to_vec());
        assert_eq!(p.fetch_range(&GenomicInterval::new(16, 30)), b"NN".to_vec());
    }

    #[tokio::test]
    async fn test_get_tile_includes_overhang() {
        let p = provider();
        let tileset = TilesetInfo {
            min_pos: 0,
            max_pos: 18,
            max_width: 16,
            max_zoom: 2,
            tile_size: 4,
        };
        assert_eq!(p.get_tile(2, 0, &tileset, 3).await.unwrap(), "AAAA");
        assert_eq!(p.get_tile(2, 1, &tileset, 3).await.unwrap(), "AAACCCC");
        assert!(p.get_tile(2, 9, &tileset, 3).await.is_err());
    }

    #[test]
    fn test_read_records() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">chr1 primary assembly\nACGT\nAC\n>chr2\nGG").unwrap();

        let records = read_records(file.path()).unwrap();
        assert_eq!(records[0], ("chr1".to_string(), b"ACGTAC".to_vec()));
        assert_eq!(records[1].0, "chr2");

        let genome = genome_from_records(&records);
        assert_eq!(genome.total_length, 8);
        assert_eq!(genome.chrom_offset("chr2"), Some(6));
    }

    #[test]
    fn test_duplicate_names_keep_first_record() {
        let records = vec![
            ("chr1".to_string(), b"ACGT".to_vec()),
            ("chr2".to_string(), b"TT".to_vec()),
            ("chr1".to_string(), b"GGGGGGGG".to_vec()),
        ];
        let genome = Arc::new(genome_from_records(&records));
        assert_eq!(genome.total_length, 6);

        let sequences = sequences_from_records(records);
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences["chr1"], b"ACGT".to_vec());

        let p = FastaSequenceProvider::new(genome, sequences);
        assert_eq!(p.fetch_range(&GenomicInterval::new(0, 6)), b"ACGTTT".to_vec());
    }
}
