//! # fnirs-blocks
//!
//! Turns conditioned fNIRS hemoglobin recordings into block averages, a
//! detailed trial/channel × block pivot table, per-region tables and the
//! numeric grids behind region heatmaps.
//!
//! ```text
//! 20250624_MRSA_1.json ─┬─ trial::parse_trial_identity   → RecordingMetadata
//!                       ├─ recording::RecordingSource    → ChannelSeries + blocks
//!                       └─ blocks::extract_block_averages → Vec<BlockAverageRow>
//!                                   │  (all recordings, input order)
//!                                   ├─ pivot::build_detailed      → DetailedPivotTable
//!                                   └─ pivot::build_region_tables → RegionPivotTable per region
//!                                                                     └─ heatmap::HeatmapGrid
//! ```
//!
//! Signal conditioning (optical density, TDDR, band-pass, Beer-Lambert)
//! happens upstream; this crate starts from the exported concentrations.

pub mod blocks;
pub mod error;
pub mod export;
pub mod heatmap;
pub mod mapping;
pub mod pipeline;
pub mod pivot;
pub mod recording;
pub mod trial;
pub mod types;
pub mod warnings;

pub use error::{FnirsError, Result};
pub use heatmap::{HeatmapGrid, HeatmapRenderer};
pub use mapping::{region_slug, ChannelRegionMap, MappingEntry};
pub use pipeline::{run_batch, BatchOutput, PipelineConfig, ProcessedRecording};
pub use pivot::{DetailedPivotTable, RegionPivotTable, RegionSummary};
pub use recording::{HemoRecording, JsonRecordingSource, RecordingSource};
pub use trial::parse_trial_identity;
pub use types::*;
pub use warnings::{RunReport, Warning};
