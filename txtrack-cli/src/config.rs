//! Configuration handling for the txtrack CLI
//!
//! Supports loading configuration from txtrack.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use txtrack_core::{GenomeInfo, TilesetInfo, TrackOptions};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub track: TrackOptions,
    #[serde(default)]
    pub tiles: TilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Worker threads for the translation runtime
    #[serde(default = "default_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilesConfig {
    /// Bases per tile at the deepest zoom level
    #[serde(default = "default_tile_size")]
    pub tile_size: u64,

    /// Deepest zoom level; derived from the genome length when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u32>,
}

// Default value functions
fn default_threads() -> usize { num_cpus::get() }
fn default_tile_size() -> u64 { txtrack_core::tiles::DEFAULT_TILE_SIZE }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { threads: default_threads() }
    }
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            max_zoom: None,
        }
    }
}

impl TilesConfig {
    /// Tiling of `genome`. A configured `max_zoom` too shallow to cover the
    /// genome is ignored.
    pub fn tileset(&self, genome: &GenomeInfo) -> TilesetInfo {
        let derived = TilesetInfo::for_genome(genome, self.tile_size);
        match self.max_zoom {
            Some(zoom) if zoom >= derived.max_zoom && zoom < 48 => TilesetInfo {
                max_width: derived.tile_size << zoom,
                max_zoom: zoom,
                ..derived
            },
            Some(zoom) => {
                log::warn!(
                    "max_zoom {} cannot cover {} bases with {}-base tiles, using {}",
                    zoom,
                    genome.total_length,
                    derived.tile_size,
                    derived.max_zoom
                );
                derived
            }
            None => derived,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from("txtrack.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: txtrack.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        // fail early rather than on the first translated tile
        config.track.resolve_genetic_code()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use txtrack_core::LabelPolicy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tiles.tile_size, 1024);
        assert_eq!(config.track.max_texts, 20);
        assert_eq!(config.track.front_overhang, 3);
        assert!(config.general.threads >= 1);
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.track.label_policy = LabelPolicy::LeftNeighbor { margin: 5.0 };
        config.tiles.max_zoom = Some(12);
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded_config.track, config.track);
        assert_eq!(loaded_config.tiles.max_zoom, Some(12));
        assert_eq!(loaded_config.general.threads, config.general.threads);

        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let config: Config = toml::from_str("[track]\nmax_texts = 5\n")?;
        assert_eq!(config.track.max_texts, 5);
        assert_eq!(config.track.font_size, 10.0);
        assert_eq!(config.tiles.tile_size, 1024);
        Ok(())
    }

    #[test]
    fn test_unknown_genetic_code_rejected() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "[track]\ngenetic_code = 99\n")?;
        assert!(Config::load(Some(temp_file.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example_toml()?;
        assert!(example.contains("[general]"));
        assert!(example.contains("[track]"));
        assert!(example.contains("[tiles]"));
        Ok(())
    }

    #[test]
    fn test_tileset_respects_max_zoom() {
        let genome = GenomeInfo::from_chromsizes(&["chr1"], &[5000]).unwrap();
        let mut tiles = TilesConfig::default();
        assert_eq!(tiles.tileset(&genome).max_zoom, 3);

        tiles.max_zoom = Some(5);
        let tileset = tiles.tileset(&genome);
        assert_eq!(tileset.max_zoom, 5);
        assert_eq!(tileset.tile_width(5), 1024);

        tiles.max_zoom = Some(1);
        assert_eq!(tiles.tileset(&genome).max_zoom, 3);
    }
}
