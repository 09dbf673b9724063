use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trial identity derived from a recording's file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// `TREATMENT_ID`, the row key shared by every table
    pub trial_name: String,
    pub treatment: String,
    pub participant_id: String,
}

/// A source/detector optode pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    pub source: u32,
    pub detector: u32,
}

impl ChannelId {
    pub fn new(source: u32, detector: u32) -> Self {
        Self { source, detector }
    }

    /// Find the first `S<n>_D<m>` pair inside a channel name such as `"S1_D2 hbo"`.
    pub fn parse(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'S' {
                if let Some(found) = Self::parse_at(&name[i + 1..]) {
                    return Some(found);
                }
            }
            i += 1;
        }
        None
    }

    fn parse_at(rest: &str) -> Option<Self> {
        let source_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if source_len == 0 {
            return None;
        }
        let tail = rest[source_len..].strip_prefix("_D")?;
        let detector_len = tail.bytes().take_while(u8::is_ascii_digit).count();
        if detector_len == 0 {
            return None;
        }
        let source = rest[..source_len].parse().ok()?;
        let detector = tail[..detector_len].parse().ok()?;
        Some(Self::new(source, detector))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}_D{}", self.source, self.detector)
    }
}

/// Hemoglobin species carried by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chromophore {
    #[default]
    HbO,
    HbR,
}

impl Chromophore {
    /// Lowercase suffix used in channel names and output file prefixes
    pub fn suffix(&self) -> &'static str {
        match self {
            Chromophore::HbO => "hbo",
            Chromophore::HbR => "hbr",
        }
    }

    /// Detect the chromophore from a channel name like `"S1_D1 hbo"`.
    pub fn from_channel_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("hbo") {
            Some(Chromophore::HbO)
        } else if lower.contains("hbr") {
            Some(Chromophore::HbR)
        } else {
            None
        }
    }
}

impl fmt::Display for Chromophore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chromophore::HbO => write!(f, "HbO"),
            Chromophore::HbR => write!(f, "HbR"),
        }
    }
}

impl FromStr for Chromophore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hbo" => Ok(Chromophore::HbO),
            "hbr" => Ok(Chromophore::HbR),
            other => Err(format!(
                "Unknown chromophore '{}': expected 'hbo' or 'hbr'",
                other
            )),
        }
    }
}

/// One channel's concentration values, aligned with [`ChannelSeries::times`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrace {
    pub channel: ChannelId,
    pub values: Vec<f64>,
}

/// Per-recording hemoglobin series for a single chromophore.
///
/// All channels share one monotonically non-decreasing time axis, which is
/// how the signal chain hands data over (`[channel][sample]`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    pub chromophore: Chromophore,
    times: Vec<f64>,
    channels: Vec<ChannelTrace>,
}

impl ChannelSeries {
    pub fn new(
        chromophore: Chromophore,
        times: Vec<f64>,
        channels: Vec<ChannelTrace>,
    ) -> Result<Self, String> {
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err("timestamps must be non-decreasing".to_string());
        }
        if let Some(bad) = channels.iter().find(|c| c.values.len() != times.len()) {
            return Err(format!(
                "channel {} has {} samples, expected {}",
                bad.channel,
                bad.values.len(),
                times.len()
            ));
        }
        Ok(Self {
            chromophore,
            times,
            channels,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn channels(&self) -> &[ChannelTrace] {
        &self.channels
    }
}

/// A named `[start, end)` interval, one repetition of an experimental condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInterval {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

impl BlockInterval {
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// A table cell: a value, or the empty marker for combinations with no data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Cell {
    Present(f64),
    #[default]
    Absent,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Present(v) => Some(*v),
            Cell::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Absent, Cell::Present)
    }
}

/// Block reduction for one (recording, channel, block)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAverageRow {
    pub trial_name: String,
    pub channel: ChannelId,
    pub block_name: String,
    /// Arithmetic mean of the samples in the block window
    pub value: f64,
    /// Population standard deviation of the same samples
    pub std: f64,
    pub n_samples: usize,
    pub duration_s: f64,
}
