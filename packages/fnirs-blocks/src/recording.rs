//! Hand-off point from the external signal chain.
//!
//! The chain (SNIRF loading, resampling, optical density, TDDR, band-pass,
//! Beer-Lambert) runs elsewhere and exports one JSON document per recording:
//!
//! ```json
//! {
//!   "sfreq": 5.0,
//!   "first_time": 0.0,
//!   "channels": ["S1_D1 hbo", "S1_D1 hbr"],
//!   "data": [[0.1, 0.2], [0.0, -0.1]],
//!   "annotations": [{"onset": 0.0, "duration": 30.0, "description": "Base"}]
//! }
//! ```
//!
//! `data` is `[channel][sample]`. Annotations mark block onsets.

use crate::error::{FnirsError, Result};
use crate::types::{BlockInterval, ChannelId, ChannelSeries, ChannelTrace, Chromophore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Block name used when a recording carries no annotations
pub const ENTIRE_RECORDING_BLOCK: &str = "Entire_Recording";

/// Event marker exported by the signal chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub onset: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub description: String,
}

/// A conditioned hemoglobin recording as exported by the signal chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HemoRecording {
    /// Sampling rate in Hz
    pub sfreq: f64,
    /// Timestamp of the first sample in seconds
    #[serde(default)]
    pub first_time: f64,
    pub channels: Vec<String>,
    pub data: Vec<Vec<f64>>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl HemoRecording {
    /// Check the structural invariants of the export
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.sfreq.is_finite() && self.sfreq > 0.0) {
            return Err(format!("sampling rate must be positive, got {}", self.sfreq));
        }
        if self.channels.len() != self.data.len() {
            return Err(format!(
                "{} channel names but {} data rows",
                self.channels.len(),
                self.data.len()
            ));
        }
        let n_samples = self.n_samples();
        if let Some(idx) = self.data.iter().position(|row| row.len() != n_samples) {
            return Err(format!(
                "data row {} ('{}') has {} samples, expected {}",
                idx,
                self.channels[idx],
                self.data[idx].len(),
                n_samples
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.channels.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(format!("duplicate channel name '{}'", dup));
        }
        Ok(())
    }

    pub fn n_samples(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// Timestamp of sample `i` is `first_time + i / sfreq`
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_samples())
            .map(|i| self.first_time + i as f64 / self.sfreq)
            .collect()
    }

    /// One sample period past the final sample
    pub fn end_time(&self) -> f64 {
        self.first_time + self.n_samples() as f64 / self.sfreq
    }

    /// Extract the channels of one chromophore in export order.
    ///
    /// Names without an `S#_D#` pair or chromophore suffix are skipped.
    pub fn channel_series(&self, chromophore: Chromophore) -> std::result::Result<ChannelSeries, String> {
        let mut traces = Vec::new();
        for (name, row) in self.channels.iter().zip(&self.data) {
            match (ChannelId::parse(name), Chromophore::from_channel_name(name)) {
                (Some(channel), Some(c)) if c == chromophore => traces.push(ChannelTrace {
                    channel,
                    values: row.clone(),
                }),
                (Some(_), Some(_)) => {}
                _ => log::debug!("Ignoring channel '{}': not an S#_D# hbo/hbr channel", name),
            }
        }
        ChannelSeries::new(chromophore, self.times(), traces)
    }

    /// Derive block intervals from the annotations.
    ///
    /// Annotations are ordered by onset; each block runs until the next onset
    /// and the last one until the end of the recording. Without annotations
    /// the whole recording is one block.
    pub fn block_definition(&self) -> Vec<BlockInterval> {
        let end = self.end_time();
        if self.annotations.is_empty() {
            return vec![BlockInterval::new(ENTIRE_RECORDING_BLOCK, self.first_time, end)];
        }

        let mut events: Vec<&Annotation> = self.annotations.iter().collect();
        events.sort_by(|a, b| a.onset.total_cmp(&b.onset));

        events
            .iter()
            .enumerate()
            .map(|(idx, event)| {
                let block_end = events.get(idx + 1).map_or(end, |next| next.onset);
                let name = if event.description.trim().is_empty() {
                    format!("Block_{}", idx)
                } else {
                    event.description.clone()
                };
                BlockInterval::new(name, event.onset, block_end)
            })
            .collect()
    }
}

/// Loads one recording produced by the signal chain.
///
/// Implementations must be shareable across the extraction worker pool.
pub trait RecordingSource: Sync {
    fn load(&self, path: &Path) -> Result<HemoRecording>;
}

/// Reads the JSON export format described in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordingSource;

impl RecordingSource for JsonRecordingSource {
    fn load(&self, path: &Path) -> Result<HemoRecording> {
        let invalid = |reason: String| FnirsError::InvalidRecording {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let recording: HemoRecording =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        recording.validate().map_err(invalid)?;

        log::debug!(
            "Loaded {}: {} channels, {} samples at {} Hz, {} annotations",
            path.display(),
            recording.channels.len(),
            recording.n_samples(),
            recording.sfreq,
            recording.annotations.len()
        );
        Ok(recording)
    }
}
