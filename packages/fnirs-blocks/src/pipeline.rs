//! Batch orchestration.
//!
//! Recordings are extracted in parallel, each into its own result. The merge
//! starts only after every recording has finished or failed, and walks the
//! results in input order so the tables do not depend on scheduling.

use crate::blocks::extract_block_averages;
use crate::error::{FnirsError, Result};
use crate::mapping::ChannelRegionMap;
use crate::pivot::{build_detailed, build_region_tables, DetailedPivotTable, RegionPivotTable};
use crate::recording::RecordingSource;
use crate::trial::parse_trial_identity;
use crate::types::{BlockAverageRow, Chromophore, RecordingMetadata};
use crate::warnings::{RunReport, Warning};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Which hemoglobin species feeds the tables. Default: HbO.
    pub chromophore: Chromophore,
    /// Worker threads for extraction; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
}

/// Block averages of one successfully processed recording
#[derive(Debug, Clone)]
pub struct ProcessedRecording {
    pub path: PathBuf,
    pub metadata: RecordingMetadata,
    pub rows: Vec<BlockAverageRow>,
    pub n_channels: usize,
    pub n_blocks: usize,
    /// Declared block names in first-seen order, including blocks that
    /// held no samples
    pub block_names: Vec<String>,
}

/// Everything a batch produces
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub recordings: Vec<ProcessedRecording>,
    pub detailed: DetailedPivotTable,
    /// Empty when the mapper has no regions
    pub regions: Vec<RegionPivotTable>,
}

impl BatchOutput {
    /// All rows, concatenated in ingestion order
    pub fn rows(&self) -> Vec<BlockAverageRow> {
        self.recordings
            .iter()
            .flat_map(|r| r.rows.iter().cloned())
            .collect()
    }
}

/// Parse, load and block-average a single recording
pub fn process_recording<S: RecordingSource + ?Sized>(
    source: &S,
    path: &Path,
    chromophore: Chromophore,
) -> Result<ProcessedRecording> {
    let metadata = parse_trial_identity(path)?;
    let recording = source.load(path)?;

    let series = recording
        .channel_series(chromophore)
        .map_err(|reason| FnirsError::InvalidRecording {
            path: path.display().to_string(),
            reason,
        })?;
    if series.channels().is_empty() {
        return Err(FnirsError::InvalidRecording {
            path: path.display().to_string(),
            reason: format!("no {} channels", chromophore),
        });
    }

    let blocks = recording.block_definition();
    let rows = extract_block_averages(&metadata, &series, &blocks);
    let mut block_names: Vec<String> = Vec::new();
    for block in &blocks {
        if !block_names.contains(&block.name) {
            block_names.push(block.name.clone());
        }
    }

    log::info!(
        "Processed {} (trial {}): {} channels, {} blocks, {} averages",
        path.display(),
        metadata.trial_name,
        series.channels().len(),
        blocks.len(),
        rows.len()
    );

    Ok(ProcessedRecording {
        path: path.to_path_buf(),
        metadata,
        n_channels: series.channels().len(),
        n_blocks: blocks.len(),
        block_names,
        rows,
    })
}

/// Run extraction over every path, preserving input order in the result
pub fn extract_all<S: RecordingSource + ?Sized>(
    source: &S,
    paths: &[PathBuf],
    config: &PipelineConfig,
) -> Result<Vec<Result<ProcessedRecording>>> {
    let run = || -> Vec<Result<ProcessedRecording>> {
        paths
            .par_iter()
            .map(|path| process_recording(source, path, config.chromophore))
            .collect()
    };

    match config.jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| FnirsError::InvalidParameter(format!("thread pool: {}", e)))?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

/// Process a batch of recordings into the detailed and region tables.
///
/// Per-recording failures become warnings in `report`. Fails with
/// `NoRecordingsProcessed` when nothing succeeded.
pub fn run_batch<S: RecordingSource + ?Sized>(
    source: &S,
    paths: &[PathBuf],
    mapper: &ChannelRegionMap,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> Result<BatchOutput> {
    report.attempted += paths.len();

    let mut recordings = Vec::new();
    for (path, outcome) in paths.iter().zip(extract_all(source, paths, config)?) {
        match outcome {
            Ok(recording) => recordings.push(recording),
            Err(FnirsError::MalformedFileName(file)) => {
                report.warn(Warning::MalformedFileName { file })
            }
            Err(e) => report.warn(Warning::RecordingFailed {
                file: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
    report.processed += recordings.len();

    if recordings.is_empty() {
        return Err(FnirsError::NoRecordingsProcessed {
            attempted: paths.len(),
        });
    }

    let rows: Vec<BlockAverageRow> = recordings
        .iter()
        .flat_map(|r| r.rows.iter().cloned())
        .collect();

    let declared: Vec<String> = recordings
        .iter()
        .flat_map(|r| r.block_names.iter().cloned())
        .collect();

    let detailed = build_detailed(&rows, &declared, report);
    log::info!(
        "Detailed table: {} rows x {} blocks",
        detailed.rows.len(),
        detailed.blocks.len()
    );

    if mapper.is_empty() {
        log::info!("No regions mapped; skipping region tables");
        return Ok(BatchOutput {
            recordings,
            detailed,
            regions: Vec::new(),
        });
    }

    let unmapped = mapper.unmapped(rows.iter().map(|r| r.channel));
    if !unmapped.is_empty() {
        report.warn(Warning::UnmappedChannels { channels: unmapped });
    }

    let regions = build_region_tables(&rows, &declared, mapper);
    for table in &regions {
        log::info!(
            "Region '{}': {} trials x {} blocks from {} channel(s)",
            table.region,
            table.rows.len(),
            table.blocks.len(),
            table.channel_count
        );
    }

    Ok(BatchOutput {
        recordings,
        detailed,
        regions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::HemoRecording;
    use std::collections::HashMap;

    /// Serves recordings from memory, keyed by file name
    struct MemorySource(HashMap<String, HemoRecording>);

    impl RecordingSource for MemorySource {
        fn load(&self, path: &Path) -> Result<HemoRecording> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.0
                .get(&name)
                .cloned()
                .ok_or_else(|| FnirsError::InvalidRecording {
                    path: name,
                    reason: "not found".to_string(),
                })
        }
    }

    fn recording(level: f64) -> HemoRecording {
        HemoRecording {
            sfreq: 1.0,
            first_time: 0.0,
            channels: vec!["S1_D1 hbo".to_string(), "S1_D2 hbo".to_string()],
            data: vec![vec![level; 4], vec![level * 10.0; 4]],
            annotations: vec![],
        }
    }

    fn source() -> MemorySource {
        let mut map = HashMap::new();
        map.insert("20250624_MRSA_1.json".to_string(), recording(1.0));
        map.insert("20250625_N_2.json".to_string(), recording(2.0));
        MemorySource(map)
    }

    #[test]
    fn test_failures_are_contained() {
        let paths = vec![
            PathBuf::from("20250624_MRSA_1.json"),
            PathBuf::from("noise.json"),
            PathBuf::from("20250626_X_3.json"),
            PathBuf::from("20250625_N_2.json"),
        ];
        let mut report = RunReport::new();
        let out = run_batch(
            &source(),
            &paths,
            &ChannelRegionMap::empty(),
            &PipelineConfig::default(),
            &mut report,
        )
        .unwrap();

        assert_eq!(out.recordings.len(), 2);
        assert_eq!(out.detailed.rows.len(), 4);
        assert!(out.regions.is_empty());
        assert_eq!(report.attempted, 4);
        assert_eq!(report.processed, 2);
        assert!(matches!(report.warnings()[0], Warning::MalformedFileName { .. }));
        assert!(matches!(report.warnings()[1], Warning::RecordingFailed { .. }));
    }

    #[test]
    fn test_order_follows_input_not_completion() {
        let paths = vec![
            PathBuf::from("20250625_N_2.json"),
            PathBuf::from("20250624_MRSA_1.json"),
        ];
        let config = PipelineConfig {
            jobs: Some(2),
            ..PipelineConfig::default()
        };
        let out = run_batch(
            &source(),
            &paths,
            &ChannelRegionMap::empty(),
            &config,
            &mut RunReport::new(),
        )
        .unwrap();
        let trials: Vec<&str> = out.detailed.rows.iter().map(|r| r.trial.as_str()).collect();
        assert_eq!(trials, vec!["N_2", "N_2", "MRSA_1", "MRSA_1"]);
    }

    #[test]
    fn test_nothing_processed_is_fatal() {
        let mut report = RunReport::new();
        let err = run_batch(
            &source(),
            &[PathBuf::from("broken.json")],
            &ChannelRegionMap::empty(),
            &PipelineConfig::default(),
            &mut report,
        )
        .unwrap_err();
        assert!(matches!(err, FnirsError::NoRecordingsProcessed { attempted: 1 }));
        assert_eq!(report.warnings().len(), 1);

        let err = run_batch(
            &source(),
            &[],
            &ChannelRegionMap::empty(),
            &PipelineConfig::default(),
            &mut RunReport::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FnirsError::NoRecordingsProcessed { attempted: 0 }));
    }

    #[test]
    fn test_missing_chromophore_is_a_failure() {
        let paths = vec![PathBuf::from("20250624_MRSA_1.json")];
        let config = PipelineConfig {
            chromophore: Chromophore::HbR,
            ..PipelineConfig::default()
        };
        let mut report = RunReport::new();
        let err = run_batch(&source(), &paths, &ChannelRegionMap::empty(), &config, &mut report)
            .unwrap_err();
        assert!(matches!(err, FnirsError::NoRecordingsProcessed { .. }));
        assert!(report.warnings()[0].to_string().contains("no HbR channels"));
    }

    #[test]
    fn test_unmapped_channels_reported_once() {
        let paths = vec![
            PathBuf::from("20250624_MRSA_1.json"),
            PathBuf::from("20250625_N_2.json"),
        ];
        let mapper = ChannelRegionMap::from_json_str(
            r#"[{"source":1,"detector":1,"region":"RegionX"}]"#,
            &mut RunReport::new(),
        )
        .unwrap();
        let mut report = RunReport::new();
        let out = run_batch(&source(), &paths, &mapper, &PipelineConfig::default(), &mut report)
            .unwrap();

        assert_eq!(out.regions.len(), 1);
        assert_eq!(
            report.warnings(),
            &[Warning::UnmappedChannels {
                channels: vec![crate::types::ChannelId::new(1, 2)]
            }]
        );
    }
}
