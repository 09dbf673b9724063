//! Run warnings and the accumulator that carries them through a batch.
//!
//! Nothing here is global: every stage that can warn takes a `&mut RunReport`,
//! and per-recording workers return their own results which are folded in
//! input order once extraction has finished.

use crate::types::ChannelId;
use serde::Serialize;
use std::fmt;

/// A recoverable condition surfaced to the user at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    MalformedFileName {
        file: String,
    },
    RecordingFailed {
        file: String,
        reason: String,
    },
    MappingFileNotFound {
        path: String,
    },
    DuplicateMappingKey {
        channel: ChannelId,
        previous: String,
        replacement: String,
    },
    /// One per trial, however many cells collided
    DuplicateTrial {
        trial: String,
        channels: usize,
        blocks: Vec<String>,
    },
    UnmappedChannels {
        channels: Vec<ChannelId>,
    },
    HeatmapFailed {
        region: String,
        reason: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedFileName { file } => write!(
                f,
                "Skipped '{}': file name does not match YYYYMMDD_TREATMENT_ID",
                file
            ),
            Warning::RecordingFailed { file, reason } => {
                write!(f, "Skipped '{}': {}", file, reason)
            }
            Warning::MappingFileNotFound { path } => write!(
                f,
                "Channel mapping file not found: {} (region tables and heatmaps skipped)",
                path
            ),
            Warning::DuplicateMappingKey {
                channel,
                previous,
                replacement,
            } => write!(
                f,
                "Channel {} mapped twice ('{}' then '{}'); keeping '{}'",
                channel, previous, replacement, replacement
            ),
            Warning::DuplicateTrial {
                trial,
                channels,
                blocks,
            } => write!(
                f,
                "Trial '{}' produced by more than one recording ({} channel(s), block(s): {}); later values kept",
                trial,
                channels,
                blocks.join(", ")
            ),
            Warning::UnmappedChannels { channels } => {
                let names: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
                write!(
                    f,
                    "{} channel(s) have no region mapping and are excluded from region tables: {}",
                    channels.len(),
                    names.join(", ")
                )
            }
            Warning::HeatmapFailed { region, reason } => {
                write!(f, "Heatmap for region '{}' failed: {}", region, reason)
            }
        }
    }
}

/// Accumulates warnings and recording counts for one invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub attempted: usize,
    pub processed: usize,
    warnings: Vec<Warning>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning for the end-of-run summary
    pub fn warn(&mut self, warning: Warning) {
        log::debug!("Warning recorded: {}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.processed)
    }

    /// Lines for the end-of-run summary block
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Recordings: {}/{} processed, {} skipped",
            self.processed,
            self.attempted,
            self.failed()
        )];
        if self.warnings.is_empty() {
            lines.push("No warnings".to_string());
        } else {
            lines.push(format!("{} warning(s):", self.warnings.len()));
            lines.extend(self.warnings.iter().map(|w| format!("  - {}", w)));
        }
        lines
    }
}
