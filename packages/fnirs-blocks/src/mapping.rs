//! Channel → anatomical region lookup.
//!
//! The mapping file is a JSON array of `{"source", "detector", "region"}`
//! objects. It is optional: without one the run produces the detailed table
//! only.

use crate::error::{FnirsError, Result};
use crate::types::ChannelId;
use crate::warnings::{RunReport, Warning};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

/// One entry of the mapping file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source: u32,
    pub detector: u32,
    pub region: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelRegionMap {
    regions: HashMap<ChannelId, String>,
}

impl ChannelRegionMap {
    /// A mapper that maps nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from entries in file order. A repeated (source, detector) key
    /// replaces the earlier region and is reported.
    pub fn from_entries<I>(entries: I, report: &mut RunReport) -> Self
    where
        I: IntoIterator<Item = MappingEntry>,
    {
        let mut regions = HashMap::new();
        for entry in entries {
            let channel = ChannelId::new(entry.source, entry.detector);
            if let Some(previous) = regions.insert(channel, entry.region.clone()) {
                report.warn(Warning::DuplicateMappingKey {
                    channel,
                    previous,
                    replacement: entry.region,
                });
            }
        }
        Self { regions }
    }

    pub fn from_json_str(json: &str, report: &mut RunReport) -> Result<Self> {
        let entries: Vec<MappingEntry> =
            serde_json::from_str(json).map_err(|e| FnirsError::InvalidMapping(e.to_string()))?;
        Ok(Self::from_entries(entries, report))
    }

    /// Load the optional mapping file.
    ///
    /// `None` and a path that does not exist both give an empty mapper; the
    /// latter also records a warning. A file that exists but cannot be parsed
    /// is an error.
    pub fn load(path: Option<&Path>, report: &mut RunReport) -> Result<Self> {
        let Some(path) = path else {
            log::info!("No channel mapping provided; region tables disabled");
            return Ok(Self::empty());
        };

        if !path.exists() {
            report.warn(Warning::MappingFileNotFound {
                path: path.display().to_string(),
            });
            return Ok(Self::empty());
        }

        let json = std::fs::read_to_string(path)?;
        let map = Self::from_json_str(&json, report).map_err(|e| match e {
            FnirsError::InvalidMapping(reason) => {
                FnirsError::InvalidMapping(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;
        log::info!(
            "Loaded {} channel mapping(s) across {} region(s) from {}",
            map.len(),
            map.all_regions().len(),
            path.display()
        );
        Ok(map)
    }

    pub fn region_of(&self, channel: ChannelId) -> Option<&str> {
        self.regions.get(&channel).map(String::as_str)
    }

    /// Every distinct region label, sorted
    pub fn all_regions(&self) -> BTreeSet<&str> {
        self.regions.values().map(String::as_str).collect()
    }

    /// Channels mapped to `region`, sorted
    pub fn channels_in(&self, region: &str) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .regions
            .iter()
            .filter(|(_, r)| r.as_str() == region)
            .map(|(c, _)| *c)
            .collect();
        channels.sort();
        channels
    }

    /// Distinct channels from `channels` that have no region, in first-seen order
    pub fn unmapped<I>(&self, channels: I) -> Vec<ChannelId>
    where
        I: IntoIterator<Item = ChannelId>,
    {
        let mut seen = HashSet::new();
        channels
            .into_iter()
            .filter(|c| !self.regions.contains_key(c) && seen.insert(*c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// File-name form of a region label: lowercase, spaces and `/` become `_`.
pub fn region_slug(region: &str) -> String {
    region.to_lowercase().replace([' ', '/'], "_")
}
