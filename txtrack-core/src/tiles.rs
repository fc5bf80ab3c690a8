//! Tile geometry and the per-tile codon task manager.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codon::{Codon, CodonTranslator};
use crate::error::{SequenceFetchError, TrackResult};
use crate::stitch::{SequenceProvider, TileSequence};
use crate::transcript::Transcript;
use crate::types::*;

pub const DEFAULT_TILE_SIZE: u64 = 1024;

/// Quadtree-style 1D tiling of the absolute axis.
///
/// At zoom `z` a tile spans `max_width >> z` positions; at `max_zoom` one
/// tile spans `tile_size` bases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetInfo {
    pub min_pos: GenomicPos,
    pub max_pos: GenomicPos,
    pub max_width: u64,
    pub max_zoom: ZoomLevel,
    pub tile_size: u64,
}

impl TilesetInfo {
    /// Smallest tiling covering the whole genome with `tile_size` bases per
    /// tile at the deepest zoom.
    pub fn for_genome(genome: &GenomeInfo, tile_size: u64) -> Self {
        let tile_size = tile_size.max(1);
        let mut max_zoom = 0;
        while (tile_size << max_zoom) < genome.total_length && max_zoom < 48 {
            max_zoom += 1;
        }

        Self {
            min_pos: 0,
            max_pos: genome.total_length,
            max_width: tile_size << max_zoom,
            max_zoom,
            tile_size,
        }
    }

    pub fn tile_width(&self, zoom: ZoomLevel) -> u64 {
        self.max_width.checked_shr(zoom).unwrap_or(0).max(1)
    }

    /// Absolute window of a tile, clipped to the end of the axis.
    pub fn tile_window(&self, zoom: ZoomLevel, tile_index: TileIndex) -> GenomicInterval {
        let width = self.tile_width(zoom);
        let start = self
            .min_pos
            .saturating_add(tile_index.saturating_mul(width))
            .min(self.max_pos);
        GenomicInterval::new(start, start.saturating_add(width).min(self.max_pos))
    }

    /// Tiles at `zoom` that intersect an absolute range.
    pub fn tiles_for_range(&self, zoom: ZoomLevel, range: &GenomicInterval) -> Vec<TileIndex> {
        let range = GenomicInterval::new(range.start.max(self.min_pos), range.end.min(self.max_pos));
        if range.is_empty() {
            return Vec::new();
        }
        let width = self.tile_width(zoom);
        let first = (range.start - self.min_pos) / width;
        let last = (range.end - 1 - self.min_pos) / width;
        (first..=last).collect()
    }

    /// Tile at `zoom` holding an absolute position.
    pub fn tile_index_of(&self, zoom: ZoomLevel, pos: GenomicPos) -> TileIndex {
        pos.saturating_sub(self.min_pos) / self.tile_width(zoom)
    }

    pub fn is_max_zoom(&self, zoom: ZoomLevel) -> bool {
        zoom >= self.max_zoom
    }
}

pub type TileKey = (ZoomLevel, TileIndex);

/// Codons of one tile, keyed by transcript id.
#[derive(Debug, Default)]
pub struct TileCodons {
    pub transcripts: HashMap<String, Vec<Codon>>,
    /// Transcripts whose translation failed, with the reason
    pub failed: HashMap<String, String>,
    pub fetch_error: Option<SequenceFetchError>,
}

type TranscriptOutcome = (String, TrackResult<Vec<Codon>>);

struct TileResult {
    key: TileKey,
    generation: u64,
    outcome: Result<Vec<TranscriptOutcome>, SequenceFetchError>,
}

struct TileState {
    generation: u64,
    handle: Option<JoinHandle<()>>,
    codons: Option<TileCodons>,
}

/// Cancellable, generation-versioned codon computation per tile.
///
/// A tile gets a fresh generation every time it is initialised; results
/// tagged with any other generation, or arriving after the tile was
/// destroyed, are dropped.
pub struct TileTasks {
    provider: Arc<dyn SequenceProvider>,
    tileset: Arc<TilesetInfo>,
    genome: Arc<GenomeInfo>,
    translator: Arc<CodonTranslator>,
    front_overhang: u64,

    tiles: HashMap<TileKey, TileState>,
    next_generation: u64,

    results_tx: mpsc::UnboundedSender<TileResult>,
    results_rx: mpsc::UnboundedReceiver<TileResult>,
}

impl TileTasks {
    pub fn new(
        provider: Arc<dyn SequenceProvider>,
        tileset: TilesetInfo,
        genome: Arc<GenomeInfo>,
        translator: CodonTranslator,
        front_overhang: u64,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            tileset: Arc::new(tileset),
            genome,
            translator: Arc::new(translator),
            front_overhang,
            tiles: HashMap::new(),
            next_generation: 0,
            results_tx,
            results_rx,
        }
    }

    pub fn tileset(&self) -> &TilesetInfo {
        &self.tileset
    }

    /// Register a tile and return its generation; re-initialising a live
    /// tile cancels its task and discards whatever it had.
    pub fn init_tile(&mut self, key: TileKey) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;

        let old = self.tiles.insert(
            key,
            TileState {
                generation,
                handle: None,
                codons: None,
            },
        );
        if let Some(handle) = old.and_then(|s| s.handle) {
            handle.abort();
        }
        generation
    }

    pub fn generation(&self, key: TileKey) -> Option<u64> {
        self.tiles.get(&key).map(|s| s.generation)
    }

    pub fn is_live(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    /// Start the codon task of an initialised tile. Only the deepest zoom
    /// carries sequence; elsewhere, or for an unknown tile, nothing runs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_codons(&mut self, key: TileKey, transcripts: Vec<Transcript>) -> bool {
        let (zoom, tile_index) = key;
        if !self.tileset.is_max_zoom(zoom) {
            debug!("Tile {}.{}: below max zoom, no codons", zoom, tile_index);
            return false;
        }
        let Some(state) = self.tiles.get_mut(&key) else {
            warn!("Tile {}.{} was not initialised", zoom, tile_index);
            return false;
        };

        let generation = state.generation;
        let provider = Arc::clone(&self.provider);
        let tileset = Arc::clone(&self.tileset);
        let genome = Arc::clone(&self.genome);
        let translator = Arc::clone(&self.translator);
        let front_overhang = self.front_overhang;
        let results_tx = self.results_tx.clone();

        let handle = tokio::spawn(async move {
            let fetched =
                TileSequence::fetch(provider.as_ref(), zoom, tile_index, &tileset, front_overhang).await;

            let outcome = match fetched {
                Ok(mut tile) => {
                    tile.complete_upstream(provider.as_ref(), &tileset, &transcripts, &genome)
                        .await;
                    Ok(transcripts
                        .iter()
                        .filter(|tx| tx.is_protein_coding())
                        .map(|tx| (tx.id.clone(), translator.tile_codons(tx, &genome, &tile)))
                        .collect::<Vec<_>>())
                }
                Err(e) => Err(e),
            };

            // receiver gone means the manager was dropped
            let _ = results_tx.send(TileResult {
                key,
                generation,
                outcome,
            });
        });

        if let Some(old) = state.handle.replace(handle) {
            old.abort();
        }
        true
    }

    /// Cancel a tile's task and forget the tile.
    pub fn destroy_tile(&mut self, key: TileKey) {
        if let Some(state) = self.tiles.remove(&key) {
            if let Some(handle) = state.handle {
                handle.abort();
            }
        }
    }

    /// Apply every finished result that still matches a live generation.
    /// Returns the number of tiles updated.
    pub fn collect_finished(&mut self) -> usize {
        let mut applied = 0;

        while let Ok(result) = self.results_rx.try_recv() {
            let (zoom, tile_index) = result.key;
            let Some(state) = self
                .tiles
                .get_mut(&result.key)
                .filter(|s| s.generation == result.generation)
            else {
                debug!(
                    "Dropping stale result for tile {}.{} (generation {})",
                    zoom, tile_index, result.generation
                );
                continue;
            };

            let mut codons = TileCodons::default();
            match result.outcome {
                Ok(outcomes) => {
                    for (id, outcome) in outcomes {
                        match outcome {
                            Ok(list) => {
                                codons.transcripts.insert(id, list);
                            }
                            Err(e) => {
                                warn!("Tile {}.{}: {}", zoom, tile_index, e);
                                codons.failed.insert(id, e.to_string());
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    codons.fetch_error = Some(e);
                }
            }

            state.codons = Some(codons);
            state.handle = None;
            applied += 1;
        }

        applied
    }

    pub fn codons(&self, key: TileKey) -> Option<&TileCodons> {
        self.tiles.get(&key).and_then(|s| s.codons.as_ref())
    }

    /// Wait for every outstanding task. Results are applied by the next
    /// [`collect_finished`](Self::collect_finished).
    pub async fn join_all(&mut self) {
        for (key, state) in self.tiles.iter_mut() {
            let Some(handle) = state.handle.take() else {
                continue;
            };
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Codon task for tile {}.{} failed: {}", key.0, key.1, e);
                }
            }
        }
    }
}
