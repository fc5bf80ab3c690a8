//! Track parameters shared by the layout, label and translation passes.

use serde::{Deserialize, Serialize};

use crate::error::{TrackError, TrackResult};
use crate::genetic_code::GeneticCode;
use crate::labels::LabelPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackOptions {
    pub font_size: f64,
    /// Height of a gene rectangle in pixels
    pub gene_annotation_height: f64,
    /// Vertical gap between rows
    pub gene_strand_spacing: f64,
    /// Labels drawn per tile, most important first
    pub max_texts: usize,
    pub show_toggle_transcripts_button: bool,
    pub toggle_button_height: f64,
    pub track_margin: f64,
    pub label_margin: f64,
    /// Bases fetched in front of each tile so codons can straddle the boundary
    pub front_overhang: u64,
    /// NCBI genetic code id
    pub genetic_code: u8,
    pub transcripts_hidden: bool,
    pub label_policy: LabelPolicy,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            gene_annotation_height: 12.0,
            gene_strand_spacing: 4.0,
            max_texts: 20,
            show_toggle_transcripts_button: true,
            toggle_button_height: 26.0,
            track_margin: 10.0,
            label_margin: 3.0,
            front_overhang: 3,
            genetic_code: 1,
            transcripts_hidden: false,
            label_policy: LabelPolicy::default(),
        }
    }
}

impl TrackOptions {
    /// Vertical space taken by the toggle button, zero when it is not shown.
    pub fn toggle_offset(&self) -> f64 {
        if self.show_toggle_transcripts_button {
            self.toggle_button_height
        } else {
            0.0
        }
    }

    pub fn row_height(&self) -> f64 {
        self.gene_annotation_height + self.gene_strand_spacing
    }

    pub fn resolve_genetic_code(&self) -> TrackResult<GeneticCode> {
        GeneticCode::by_id(self.genetic_code).ok_or(TrackError::UnknownGeneticCode(self.genetic_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = TrackOptions::default();
        assert_eq!(opts.max_texts, 20);
        assert_eq!(opts.toggle_offset(), 26.0);
        assert_eq!(opts.row_height(), 16.0);
        assert_eq!(opts.label_policy, LabelPolicy::Importance);
        assert_eq!(opts.resolve_genetic_code().unwrap().id, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let opts: TrackOptions =
            serde_json::from_str(r#"{"max_texts": 5, "show_toggle_transcripts_button": false}"#).unwrap();
        assert_eq!(opts.max_texts, 5);
        assert_eq!(opts.toggle_offset(), 0.0);
        assert_eq!(opts.font_size, 10.0);
    }

    #[test]
    fn test_unknown_genetic_code() {
        let opts = TrackOptions {
            genetic_code: 42,
            ..Default::default()
        };
        assert!(matches!(
            opts.resolve_genetic_code(),
            Err(TrackError::UnknownGeneticCode(42))
        ));
    }
}
