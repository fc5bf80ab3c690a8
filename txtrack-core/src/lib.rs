//! txtrack Core Library
//!
//! Row packing, reading-frame resolution, cross-tile codon assembly and
//! label overlap resolution for gene/transcript annotation tracks.

pub mod types;
pub mod error;
pub mod transcript;
pub mod options;
pub mod layout;
pub mod frame;
pub mod genetic_code;
pub mod stitch;
pub mod codon;
pub mod labels;
pub mod tiles;
pub mod io;

// Re-export commonly used types and functions
pub use types::{GenomeInfo, GenomicInterval, GenomicPos, Strand, TileIndex, ZoomLevel};
pub use error::{FormatError, FrameResolutionGap, SequenceFetchError, TrackError, TrackResult};
pub use transcript::{Transcript, TranscriptFormatter};
pub use options::TrackOptions;
pub use layout::{describe, LayoutSnapshot, RowPacker, TrackLayout};
pub use frame::{ExonSegment, FrameInfo, FrameResolver, SegmentKind};
pub use genetic_code::{AminoAcid, GeneticCode};
pub use stitch::{SequenceProvider, SequenceStitcher, StitchedSequence, TileSequence};
pub use codon::{Codon, CodonTranslator};
pub use labels::{label_pass, LabelBox, LabelDecision, LabelOverlapResolver, LabelPolicy, XScale};
pub use tiles::{TileCodons, TileKey, TileTasks, TilesetInfo};

/// Version information for the txtrack core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
